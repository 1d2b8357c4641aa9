//! Ray tracks: the arena of bounces traced from one launched ray.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::bounce::{BounceId, BounceType, RayBounce};


/// Kind of traced ray.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    /// Specular / physical-optics ray.
    Specular,
    /// Ray launched from an edge diffraction point.
    EdgeDiffraction,
}

/// One traced ray's full branching history.
///
/// Bounces are stored in an arena. Before augmentation `first` points at
/// the first physical bounce and `root` is empty; the augmenter inserts
/// the synthetic source bounce (and, for edge-diffraction tracks, the
/// diffraction bounce) and sets `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayTrack {
    pub track_type: TrackType,
    #[serde(default)]
    pub sweep_index: Option<usize>,
    pub origin: Point3<f64>, // ray launch point
    #[serde(default)]
    pub diffraction_point: Option<Point3<f64>>, // edge-diffraction tracks only
    #[serde(default)]
    pub launch_offset: f64,
    #[serde(default)]
    pub bounces: Vec<RayBounce>,
    #[serde(default)]
    pub first: Option<BounceId>,
    #[serde(default)]
    pub root: Option<BounceId>,
    #[serde(default)]
    pub leaves: Vec<BounceId>,
    #[serde(default)]
    pub max_distance: f64,
}

impl RayTrack {
    pub fn new(track_type: TrackType, origin: Point3<f64>) -> Self {
        Self {
            track_type,
            sweep_index: None,
            origin,
            diffraction_point: None,
            launch_offset: 0.0,
            bounces: Vec::new(),
            first: None,
            root: None,
            leaves: Vec::new(),
            max_distance: 0.0,
        }
    }

    /// Sets the launch offset distance. Negative values are clamped to zero.
    pub fn with_launch_offset(mut self, offset: f64) -> Self {
        self.launch_offset = offset.max(0.0);
        self
    }

    pub fn with_sweep_index(mut self, index: usize) -> Self {
        self.sweep_index = Some(index);
        self
    }

    pub fn with_diffraction_point(mut self, point: Point3<f64>) -> Self {
        self.diffraction_point = Some(point);
        self
    }

    /// Adds a bounce to the arena and returns its handle.
    pub fn add_bounce(&mut self, bounce: RayBounce) -> BounceId {
        self.bounces.push(bounce);
        BounceId(self.bounces.len() - 1)
    }

    /// Marks the first physical bounce of the track.
    pub fn set_first(&mut self, id: BounceId) {
        self.first = Some(id);
    }

    pub fn attach_reflected(&mut self, parent: BounceId, child: BounceId) {
        self.bounces[parent.0].refl = Some(child);
    }

    pub fn attach_transmitted(&mut self, parent: BounceId, child: BounceId) {
        self.bounces[parent.0].trans = Some(child);
    }

    pub fn bounce(&self, id: BounceId) -> &RayBounce {
        &self.bounces[id.0]
    }

    pub fn bounce_mut(&mut self, id: BounceId) -> &mut RayBounce {
        &mut self.bounces[id.0]
    }

    pub fn len(&self) -> usize {
        self.bounces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounces.is_empty()
    }

    /// Iterates bounces reachable from the root in pre-order.
    /// Empty before augmentation.
    pub fn iter_preorder(&self) -> PreOrder<'_> {
        PreOrder {
            track: self,
            stack: self.root.into_iter().collect(),
        }
    }

    /// Iterates the root-to-bounce chain upwards, starting at `id`.
    pub fn ancestors(&self, id: BounceId) -> impl Iterator<Item = BounceId> + '_ {
        std::iter::successors(Some(id), move |&current| self.bounce(current).parent)
    }

    pub fn source(&self) -> Option<&RayBounce> {
        self.root.map(|id| self.bounce(id))
    }

    pub(crate) fn has_source(&self) -> bool {
        self.root
            .map(|id| id.0 < self.bounces.len() && self.bounces[id.0].bounce_type == BounceType::Source)
            .unwrap_or(false)
    }
}

/// Pre-order iterator over a track's tree, reflected child before transmitted.
pub struct PreOrder<'a> {
    track: &'a RayTrack,
    stack: Vec<BounceId>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (BounceId, &'a RayBounce);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let bounce = self.track.bounce(id);
        // push transmitted first so the reflected child is visited first
        self.stack.extend(bounce.trans);
        self.stack.extend(bounce.refl);
        Some((id, bounce))
    }
}
