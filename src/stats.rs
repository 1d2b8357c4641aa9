//! Counters describing one render pass.
//!
//! The counters are additive so that per-track results can be reduced in
//! parallel, and printable for a quick look at what a filter kept.

use std::{fmt, ops::*};

use serde::{Deserialize, Serialize};


/// Summary of a render pass.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    pub tracks: usize,           // tracks in the bundle
    pub tracks_drawn: usize,     // tracks with at least one drawn branch
    pub lines: usize,            // parent -> child segments
    pub escape_lines: usize,     // escaping ray segments
    pub points: usize,           // drawn bounces
    pub footprints: usize,       // offset footprint polygons
    pub undefined_values: usize, // points or footprints without a colour value
}

impl Add for RenderStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            tracks: self.tracks + other.tracks,
            tracks_drawn: self.tracks_drawn + other.tracks_drawn,
            lines: self.lines + other.lines,
            escape_lines: self.escape_lines + other.escape_lines,
            points: self.points + other.points,
            footprints: self.footprints + other.footprints,
            undefined_values: self.undefined_values + other.undefined_values,
        }
    }
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl fmt::Display for RenderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Render:")?;
        writeln!(f, "  Tracks:           {}", self.tracks)?;
        writeln!(f, "  Tracks drawn:     {}", self.tracks_drawn)?;
        writeln!(f, "  Lines:            {}", self.lines)?;
        writeln!(f, "  Escape lines:     {}", self.escape_lines)?;
        writeln!(f, "  Points:           {}", self.points)?;
        writeln!(f, "  Footprints:       {}", self.footprints)?;
        writeln!(f, "  Undefined values: {}", self.undefined_values)
    }
}
