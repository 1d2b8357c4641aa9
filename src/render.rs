//! Render data building.
//!
//! Walks every track of a filtered bundle and emits:
//! - line segments for drawn parent -> child edges and drawn escaping rays
//! - points for drawn bounces
//! - footprint polygons of drawn surface bounces, pushed off their
//!   surface along the normal
//!
//! Each element carries a colour from the [`ColorMode`] chosen when the
//! configuration is parsed.

use itertools::{Itertools, MinMaxResult};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bounce::{BounceStats, BounceType, FieldSide, RayBounce};
use crate::bundle::{RayBundle, Span};
use crate::error::{BounceError, Result};
use crate::field::{Component, Evaluator, FieldMode, FieldSpec, Quantity, Scale};
use crate::filter::{DrawFlags, FilterMask};
use crate::palette::{self, Rgb};
use crate::settings;
use crate::stats::RenderStats;
use crate::track::RayTrack;


/// How elements are coloured.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawColorMode", into = "RawColorMode")]
pub enum ColorMode {
    /// Palette indexed by composite depth.
    #[default]
    Depth,
    /// Palette indexed by the deepest reflection reached below a bounce.
    MaxReflDepth,
    /// Palette indexed by the deepest transmission reached below a bounce.
    MaxTransDepth,
    /// Scalar value from the field evaluator.
    Field(FieldMode),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModeName {
    Depth,
    MaxReflDepth,
    MaxTransDepth,
    Distance,
    Field,
}

/// Flat option set behind [`ColorMode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawColorMode {
    mode: ModeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quantity: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sources: Option<Vec<FieldSide>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    component: Option<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<Scale>,
}

impl TryFrom<RawColorMode> for ColorMode {
    type Error = BounceError;

    fn try_from(raw: RawColorMode) -> Result<Self> {
        let has_field_keys = raw.quantity.is_some()
            || raw.sources.is_some()
            || raw.component.is_some()
            || raw.scale.is_some();
        let topology = |mode: ColorMode| {
            if has_field_keys {
                Err(BounceError::config(format!(
                    "{:?} colouring takes no field options",
                    raw.mode
                )))
            } else {
                Ok(mode)
            }
        };

        match raw.mode {
            ModeName::Depth => topology(ColorMode::Depth),
            ModeName::MaxReflDepth => topology(ColorMode::MaxReflDepth),
            ModeName::MaxTransDepth => topology(ColorMode::MaxTransDepth),
            ModeName::Distance => {
                if raw.quantity.is_some() || raw.sources.is_some() || raw.component.is_some() {
                    return Err(BounceError::config("distance colouring takes only a scale"));
                }
                match raw.scale {
                    None | Some(Scale::Real) => Ok(ColorMode::Field(FieldMode::Distance)),
                    Some(other) => Err(BounceError::config(format!(
                        "distance colouring uses the real part, not {:?}",
                        other
                    ))),
                }
            }
            ModeName::Field => {
                let quantity = raw
                    .quantity
                    .ok_or_else(|| BounceError::config("field colouring needs a quantity"))?;
                let sources = raw.sources.unwrap_or_else(|| {
                    vec![
                        FieldSide::Incident,
                        FieldSide::Reflected,
                        FieldSide::Transmitted,
                    ]
                });
                let spec = FieldSpec::new(
                    quantity,
                    sources,
                    raw.component.unwrap_or(Component::Composite),
                    raw.scale.unwrap_or(Scale::Db),
                )?;
                Ok(ColorMode::Field(FieldMode::Field(spec)))
            }
        }
    }
}

impl From<ColorMode> for RawColorMode {
    fn from(mode: ColorMode) -> Self {
        let bare = |mode| RawColorMode {
            mode,
            quantity: None,
            sources: None,
            component: None,
            scale: None,
        };
        match mode {
            ColorMode::Depth => bare(ModeName::Depth),
            ColorMode::MaxReflDepth => bare(ModeName::MaxReflDepth),
            ColorMode::MaxTransDepth => bare(ModeName::MaxTransDepth),
            ColorMode::Field(FieldMode::Distance) => bare(ModeName::Distance),
            ColorMode::Field(FieldMode::Field(spec)) => RawColorMode {
                mode: ModeName::Field,
                quantity: Some(spec.quantity()),
                sources: Some(spec.sources().to_vec()),
                component: Some(spec.component()),
                scale: Some(spec.scale()),
            },
        }
    }
}

impl ColorMode {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BounceError::config(e.to_string()))
    }

    /// Palette counter of a bounce for topology modes. Field modes colour
    /// lines by composite depth.
    fn counter(&self, stats: &BounceStats) -> u32 {
        match self {
            ColorMode::MaxReflDepth => stats.max_r_depth,
            ColorMode::MaxTransDepth => stats.max_t_depth,
            ColorMode::Depth | ColorMode::Field(_) => stats.depth,
        }
    }

    /// Palette counter of an escaping ray leaving `bounce` on `side`.
    fn escape_counter(&self, bounce: &RayBounce, side: FieldSide) -> u32 {
        let s = &bounce.stats;
        match (self, side) {
            (ColorMode::MaxReflDepth, FieldSide::Reflected) => {
                s.r_depth + bounce.bounce_type.refl_step()
            }
            (ColorMode::MaxReflDepth, _) => s.r_depth,
            (ColorMode::MaxTransDepth, FieldSide::Transmitted) => s.t_depth + 1,
            (ColorMode::MaxTransDepth, _) => s.t_depth,
            (ColorMode::Depth | ColorMode::Field(_), _) => s.depth + 1,
        }
    }
}

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RenderConfig {
    pub color: ColorMode,
    /// Frequency used by field colouring.
    pub frequency_index: usize,
    /// Length of escaping ray segments, in model units.
    pub escape_length: f64,
    /// Base footprint offset along the surface normal, in model units.
    pub footprint_offset: f64,
    /// Signed factor in `[-1, 1]`: positive pushes later footprints
    /// further out, negative pushes earlier ones, zero is uniform.
    pub footprint_scale: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Depth,
            frequency_index: 0,
            escape_length: settings::DEFAULT_ESCAPE_LENGTH,
            footprint_offset: 0.0,
            footprint_scale: 0.0,
        }
    }
}

impl RenderConfig {
    /// Parses and validates a render configuration from a TOML table.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: RenderConfig =
            toml::from_str(text).map_err(|e| BounceError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.escape_length.is_finite() && self.escape_length > 0.0) {
            return Err(BounceError::config(format!(
                "escape length must be positive, got {}",
                self.escape_length
            )));
        }
        if !(self.footprint_offset.is_finite() && self.footprint_offset >= 0.0) {
            return Err(BounceError::config(format!(
                "footprint offset must be non-negative, got {}",
                self.footprint_offset
            )));
        }
        if !(-1.0..=1.0).contains(&self.footprint_scale) {
            return Err(BounceError::config(format!(
                "footprint scale must lie in [-1, 1], got {}",
                self.footprint_scale
            )));
        }
        Ok(())
    }
}

/// Footprint displacement `base + slope * distance`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FootprintOffset {
    pub base: f64,
    pub slope: f64,
}

impl FootprintOffset {
    /// Normalises the requested offset against the bundle-wide span of
    /// footprint distances. The earliest (or latest, for a negative
    /// scale) footprint gets `offset`, the other end `offset * (1 + |scale|)`.
    pub fn new(offset: f64, scale: f64, span: Option<Span>) -> Self {
        let span = match span {
            Some(span) if scale != 0.0 && span.width() > settings::DISTANCE_EPSILON => span,
            _ => {
                return Self {
                    base: offset,
                    slope: 0.0,
                }
            }
        };
        let slope = offset * scale / span.width();
        let base = if scale > 0.0 {
            offset - slope * span.min
        } else {
            offset - offset * scale - slope * span.min
        };
        Self { base, slope }
    }

    pub fn at(&self, distance: f64) -> f64 {
        self.base + self.slope * distance
    }
}

/// Colour attached to a point or footprint.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorValue {
    Rgb(Rgb),
    /// Colour-scale value; `None` when undefined for this bounce.
    Scalar(Option<f64>),
}

impl ColorValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, ColorValue::Scalar(None))
    }

    fn finite_scalar(&self) -> Option<f64> {
        match self {
            ColorValue::Scalar(Some(v)) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

/// A coloured line segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub track: usize,
    pub start: Point3<f64>,
    pub end: Point3<f64>,
    pub color: Rgb,
    pub escape: bool,
}

/// A coloured bounce point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitPoint {
    pub track: usize,
    pub position: Point3<f64>,
    pub bounce_type: BounceType,
    pub color: ColorValue,
}

/// A coloured, offset footprint polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintPolygon {
    pub track: usize,
    pub vertices: Vec<Point3<f64>>,
    pub offset: f64,
    pub color: ColorValue,
}

/// Render-ready output of one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderData {
    pub lines: Vec<Segment>,
    pub points: Vec<HitPoint>,
    pub footprints: Vec<FootprintPolygon>,
    /// Range of all defined, finite scalar colour values.
    pub scalar_range: Option<Span>,
    pub stats: RenderStats,
}

impl RenderData {
    /// Builds render data from an augmented bundle and a filter mask.
    pub fn build(bundle: &RayBundle, mask: &FilterMask, config: &RenderConfig) -> Result<Self> {
        bundle.ensure_augmented()?;
        config.validate()?;
        if !mask.matches(bundle) {
            return Err(BounceError::config("filter mask does not match the bundle"));
        }

        let evaluator = match &config.color {
            ColorMode::Field(mode) => Some(Evaluator::new(
                bundle,
                mode.clone(),
                config.frequency_index,
            )?),
            _ => None,
        };
        let builder = Builder {
            config,
            evaluator: evaluator.as_ref(),
            offset: FootprintOffset::new(
                config.footprint_offset,
                config.footprint_scale,
                bundle.footprint_span,
            ),
        };

        let fragments: Vec<RenderData> = bundle
            .tracks
            .par_iter()
            .enumerate()
            .map(|(index, track)| builder.track(index, track, mask.track(index)))
            .collect();

        let mut data = fragments
            .into_iter()
            .fold(RenderData::default(), |mut acc, part| {
                acc.lines.extend(part.lines);
                acc.points.extend(part.points);
                acc.footprints.extend(part.footprints);
                acc.stats += part.stats;
                acc
            });
        data.scalar_range = data.compute_scalar_range();

        log::info!(
            "built {} lines, {} points, {} footprints",
            data.lines.len(),
            data.points.len(),
            data.footprints.len()
        );
        if data.stats.undefined_values > 0 {
            log::debug!(
                "{} colour values undefined for the requested field",
                data.stats.undefined_values
            );
        }
        Ok(data)
    }

    fn compute_scalar_range(&self) -> Option<Span> {
        let values = self
            .points
            .iter()
            .map(|p| p.color)
            .chain(self.footprints.iter().map(|f| f.color))
            .filter_map(|c| c.finite_scalar());
        match values.minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Some(Span::new(v, v)),
            MinMaxResult::MinMax(min, max) => Some(Span::new(min, max)),
        }
    }
}

/// Per-pass state shared by every track.
struct Builder<'a> {
    config: &'a RenderConfig,
    evaluator: Option<&'a Evaluator>,
    offset: FootprintOffset,
}

impl Builder<'_> {
    fn point_color(&self, bounce: &RayBounce) -> ColorValue {
        let reserved = match bounce.bounce_type {
            BounceType::Source => Some(palette::SOURCE_COLOR),
            BounceType::UtdEdge => Some(palette::DIFFRACTION_COLOR),
            BounceType::Surface => None,
        };
        match (self.evaluator, reserved) {
            (Some(evaluator), _) if *evaluator.mode() == FieldMode::Distance => {
                ColorValue::Scalar(evaluator.value(bounce))
            }
            (_, Some(color)) => ColorValue::Rgb(color),
            (Some(evaluator), None) => ColorValue::Scalar(evaluator.value(bounce)),
            (None, None) => {
                ColorValue::Rgb(palette::depth_color(self.config.color.counter(&bounce.stats)))
            }
        }
    }

    fn escape_segment(
        &self,
        index: usize,
        bounce: &RayBounce,
        dir: &Vector3<f64>,
        side: FieldSide,
    ) -> Segment {
        Segment {
            track: index,
            start: bounce.position,
            end: bounce.position + dir * self.config.escape_length,
            color: palette::depth_color(self.config.color.escape_counter(bounce, side)),
            escape: true,
        }
    }

    fn track(&self, index: usize, track: &RayTrack, flags: &[DrawFlags]) -> RenderData {
        let mut data = RenderData::default();
        data.stats.tracks = 1;
        data.stats.tracks_drawn = flags.iter().any(|f| f.branch) as usize;

        for (id, bounce) in track.iter_preorder() {
            let f = flags[id.0];
            if !f.bounce {
                continue;
            }

            let color = self.point_color(bounce);
            data.points.push(HitPoint {
                track: index,
                position: bounce.position,
                bounce_type: bounce.bounce_type,
                color,
            });

            if let (true, Some(normal)) = (bounce.has_footprint(), bounce.normal) {
                let offset = self.offset.at(bounce.stats.distance);
                for polygon in bounce.footprint.iter().filter(|p| p.len() >= 3) {
                    data.footprints.push(FootprintPolygon {
                        track: index,
                        vertices: polygon.iter().map(|v| v + normal * offset).collect(),
                        offset,
                        color,
                    });
                }
            }

            for child_id in bounce.children() {
                if !flags[child_id.0].bounce {
                    continue;
                }
                let child = track.bounce(child_id);
                data.lines.push(Segment {
                    track: index,
                    start: bounce.position,
                    end: child.position,
                    color: palette::depth_color(self.config.color.counter(&child.stats)),
                    escape: false,
                });
            }

            if let (true, Some(dir)) = (f.refl_escape, bounce.refl_escape.as_ref()) {
                data.lines
                    .push(self.escape_segment(index, bounce, dir, FieldSide::Reflected));
                data.stats.escape_lines += 1;
            }
            if let (true, Some(dir)) = (f.trans_escape, bounce.trans_escape.as_ref()) {
                data.lines
                    .push(self.escape_segment(index, bounce, dir, FieldSide::Transmitted));
                data.stats.escape_lines += 1;
            }
        }

        data.stats.points = data.points.len();
        data.stats.footprints = data.footprints.len();
        data.stats.lines = data.lines.len() - data.stats.escape_lines;
        data.stats.undefined_values = data
            .points
            .iter()
            .map(|p| p.color)
            .chain(data.footprints.iter().map(|f| f.color))
            .filter(ColorValue::is_undefined)
            .count();
        data
    }
}
