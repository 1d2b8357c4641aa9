//! Colours for topology-based rendering.

use serde::{Deserialize, Serialize};


/// 8-bit RGB colour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Reserved colour of the launch point.
pub const SOURCE_COLOR: Rgb = Rgb::new(255, 255, 255);
/// Reserved colour of edge-diffraction points.
pub const DIFFRACTION_COLOR: Rgb = Rgb::new(255, 0, 255);

/// Ordered palette indexed by depth counter.
pub const DEPTH_PALETTE: [Rgb; 10] = [
    Rgb::new(128, 128, 128), // grey
    Rgb::new(255, 0, 0),     // red
    Rgb::new(255, 128, 0),   // orange
    Rgb::new(255, 255, 0),   // yellow
    Rgb::new(0, 255, 0),     // green
    Rgb::new(0, 255, 255),   // cyan
    Rgb::new(0, 0, 255),     // blue
    Rgb::new(128, 0, 255),   // violet
    Rgb::new(139, 69, 19),   // brown
    Rgb::new(0, 0, 0),       // black
];

/// Palette entry for a depth counter, clamped at the last entry.
pub fn depth_color(depth: u32) -> Rgb {
    let index = (depth as usize).min(DEPTH_PALETTE.len() - 1);
    DEPTH_PALETTE[index]
}
