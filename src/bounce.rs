//! Bounce tree nodes.
//!
//! A bounce is one point where a traced ray reflects, transmits or
//! diffracts. Bounces of a track live in an arena owned by the
//! [`RayTrack`](crate::track::RayTrack); children are referenced by
//! [`BounceId`] and the parent link is a non-owning id used only for
//! upward traversal.
//!
//! The node carries three groups of data:
//! - loaded data: geometry, children, escaping rays, field samples, footprint
//! - derived data ([`BounceStats`]): written once by the augmenter
//! - nothing filter-dependent: draw decisions live in a separate
//!   [`FilterMask`](crate::filter::FilterMask)

use nalgebra::{Complex, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::settings;


/// Complex 3-vector phasor.
pub type CVector3 = Vector3<Complex<f64>>;

/// Handle of a bounce inside its track's arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BounceId(pub usize);

/// What happened to the ray at a bounce.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BounceType {
    /// Synthetic launch point of a track.
    Source,
    /// Reflection and/or transmission at a surface.
    Surface,
    /// Diffraction at an edge (UTD).
    UtdEdge,
}

impl BounceType {
    /// Increment applied to the reflection depth across a reflected edge
    /// leaving a bounce of this type.
    pub fn refl_step(self) -> u32 {
        match self {
            BounceType::Surface => 1,
            BounceType::Source | BounceType::UtdEdge => 0,
        }
    }
}

/// Electromagnetic quantity of a stored sample.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldKind {
    E,
    H,
}

/// Side of the surface interaction a sample belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSide {
    Incident,
    Reflected,
    Transmitted,
}

/// Per-frequency field samples at a bounce. An empty vector means the
/// sample is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSamples {
    pub inc_e: Vec<CVector3>,
    pub refl_e: Vec<CVector3>,
    pub trans_e: Vec<CVector3>,
    pub inc_h: Vec<CVector3>,
    pub refl_h: Vec<CVector3>,
    pub trans_h: Vec<CVector3>,
}

impl FieldSamples {
    fn series(&self, kind: FieldKind, side: FieldSide) -> &[CVector3] {
        match (kind, side) {
            (FieldKind::E, FieldSide::Incident) => &self.inc_e,
            (FieldKind::E, FieldSide::Reflected) => &self.refl_e,
            (FieldKind::E, FieldSide::Transmitted) => &self.trans_e,
            (FieldKind::H, FieldSide::Incident) => &self.inc_h,
            (FieldKind::H, FieldSide::Reflected) => &self.refl_h,
            (FieldKind::H, FieldSide::Transmitted) => &self.trans_h,
        }
    }

    /// Returns the sample for a frequency index, if present.
    pub fn get(&self, kind: FieldKind, side: FieldSide, freq: usize) -> Option<CVector3> {
        self.series(kind, side).get(freq).copied()
    }
}

/// Structural data computed by the augmenter. Independent of any filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceStats {
    pub distance: f64,   // cumulative path distance from the launch point
    pub depth: u32,      // composite depth
    pub r_depth: u32,    // reflection depth
    pub t_depth: u32,    // transmission depth
    pub is_leaf: bool,
    pub max_depth: u32,
    pub max_r_depth: u32,
    pub max_t_depth: u32,
    pub branches: Vec<usize>, // indices into the track's leaf list
}

/// A node of the bounce tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayBounce {
    pub position: Point3<f64>,
    #[serde(default)]
    pub normal: Option<Vector3<f64>>, // surface bounces only
    pub bounce_type: BounceType,
    #[serde(default)]
    pub refl: Option<BounceId>,
    #[serde(default)]
    pub trans: Option<BounceId>,
    #[serde(default)]
    pub parent: Option<BounceId>,
    #[serde(default)]
    pub refl_escape: Option<Vector3<f64>>,
    #[serde(default)]
    pub trans_escape: Option<Vector3<f64>>,
    #[serde(default)]
    pub fields: FieldSamples,
    #[serde(default)]
    pub footprint: Vec<Vec<Point3<f64>>>,
    #[serde(default)]
    pub stats: BounceStats,
}

impl RayBounce {
    pub fn new(position: Point3<f64>, bounce_type: BounceType) -> Self {
        Self {
            position,
            normal: None,
            bounce_type,
            refl: None,
            trans: None,
            parent: None,
            refl_escape: None,
            trans_escape: None,
            fields: FieldSamples::default(),
            footprint: Vec::new(),
            stats: BounceStats::default(),
        }
    }

    /// A surface bounce with a unit normal.
    pub fn surface(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        let mut bounce = Self::new(position, BounceType::Surface);
        bounce.normal = Some(normal.normalize());
        bounce
    }

    pub fn with_refl_escape(mut self, dir: Vector3<f64>) -> Self {
        self.refl_escape = Some(dir.normalize());
        self
    }

    pub fn with_trans_escape(mut self, dir: Vector3<f64>) -> Self {
        self.trans_escape = Some(dir.normalize());
        self
    }

    /// Rescales the normal and escape directions to unit length. Vectors
    /// too short to carry a direction are left alone.
    pub fn normalize_directions(&mut self) {
        for v in [&mut self.normal, &mut self.refl_escape, &mut self.trans_escape]
            .into_iter()
            .flatten()
        {
            if let Some(unit) = v.try_normalize(settings::DISTANCE_EPSILON) {
                *v = unit;
            }
        }
    }

    pub fn with_footprint(mut self, polygon: Vec<Point3<f64>>) -> Self {
        self.footprint.push(polygon);
        self
    }

    pub fn has_refl_bounce(&self) -> bool {
        self.refl.is_some()
    }

    pub fn has_trans_bounce(&self) -> bool {
        self.trans.is_some()
    }

    pub fn has_refl_escape(&self) -> bool {
        self.refl_escape.is_some()
    }

    pub fn has_trans_escape(&self) -> bool {
        self.trans_escape.is_some()
    }

    pub fn has_escape(&self) -> bool {
        self.has_refl_escape() || self.has_trans_escape()
    }

    /// Child ids, reflected first.
    pub fn children(&self) -> impl Iterator<Item = BounceId> {
        self.refl.into_iter().chain(self.trans)
    }

    pub fn has_footprint(&self) -> bool {
        self.bounce_type == BounceType::Surface && self.footprint.iter().any(|p| p.len() >= 3)
    }
}
