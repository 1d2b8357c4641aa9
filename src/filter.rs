//! Track, branch and bounce level filtering.
//!
//! Filtering never mutates the bundle. [`FilterConfig::apply`] reads an
//! augmented [`RayBundle`] and returns a [`FilterMask`] holding the draw
//! decisions for every bounce, so several filter passes with different
//! configurations can share one bundle.
//!
//! Per track the decisions are made in two sweeps:
//! 1. every leaf whose path passes the branch-level ranges marks itself
//!    and all of its ancestors (`branch`)
//! 2. every marked bounce is checked against the bounce-level ranges
//!    (`bounce`), and its escaping rays against both (`refl_escape`,
//!    `trans_escape`)

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bounce::{BounceId, RayBounce};
use crate::bounds::Bounds;
use crate::bundle::{IncidenceAngle, RayBundle};
use crate::error::{BounceError, Result};
use crate::track::{RayTrack, TrackType};


/// Draw decisions for one bounce.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawFlags {
    pub bounce: bool,
    pub trans_escape: bool,
    pub refl_escape: bool,
    pub branch: bool,
}

/// Filter configuration. All ranges are inclusive and default to `[0, inf)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FilterConfig {
    /// Bounce-level composite depth.
    pub depth: Bounds,
    /// Bounce-level reflection depth.
    pub refl_depth: Bounds,
    /// Bounce-level transmission depth.
    pub trans_depth: Bounds,
    /// Branch-level total reflections along the path to a leaf.
    pub total_refl: Bounds,
    /// Branch-level total transmissions along the path to a leaf.
    pub total_trans: Bounds,
    pub track_types: Option<Vec<TrackType>>,
    pub sweep_indices: Option<Vec<usize>>,
    pub incidence_angles: Option<Vec<IncidenceAngle>>,
}

/// Per-track, per-bounce draw decisions produced by one filter pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterMask {
    tracks: Vec<Vec<DrawFlags>>,
}

impl FilterMask {
    pub fn track(&self, track: usize) -> &[DrawFlags] {
        &self.tracks[track]
    }

    pub fn get(&self, track: usize, id: BounceId) -> DrawFlags {
        self.tracks[track][id.0]
    }

    /// Whether this mask was produced for a bundle with the same shape.
    pub fn matches(&self, bundle: &RayBundle) -> bool {
        self.tracks.len() == bundle.tracks.len()
            && self
                .tracks
                .iter()
                .zip(&bundle.tracks)
                .all(|(flags, track)| flags.len() == track.len())
    }

    pub fn drawn_bounces(&self) -> usize {
        self.tracks.iter().flatten().filter(|f| f.bounce).count()
    }

    pub fn drawn_escapes(&self) -> usize {
        self.tracks
            .iter()
            .flatten()
            .map(|f| f.refl_escape as usize + f.trans_escape as usize)
            .sum()
    }

    /// Number of tracks with at least one drawn branch.
    pub fn drawn_tracks(&self) -> usize {
        self.tracks
            .iter()
            .filter(|flags| flags.iter().any(|f| f.branch))
            .count()
    }
}

impl FilterConfig {
    /// Parses a filter configuration from a TOML table.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BounceError::config(e.to_string()))
    }

    /// Whether every range of `self` contains the matching range of `other`.
    pub fn is_wider_than(&self, other: &FilterConfig) -> bool {
        self.depth.covers(&other.depth)
            && self.refl_depth.covers(&other.refl_depth)
            && self.trans_depth.covers(&other.trans_depth)
            && self.total_refl.covers(&other.total_refl)
            && self.total_trans.covers(&other.total_trans)
    }

    /// Runs the filter over an augmented bundle.
    pub fn apply(&self, bundle: &RayBundle) -> Result<FilterMask> {
        bundle.ensure_augmented()?;
        let sweeps = self.sweep_selection(bundle)?;

        let tracks: Vec<Vec<DrawFlags>> = bundle
            .tracks
            .par_iter()
            .map(|track| {
                if self.includes_track(bundle, track, sweeps.as_ref()) {
                    self.filter_track(track)
                } else {
                    vec![DrawFlags::default(); track.len()]
                }
            })
            .collect();

        let mask = FilterMask { tracks };
        let drawn = mask.drawn_tracks();
        if drawn == 0 && !bundle.tracks.is_empty() {
            log::warn!("filter excluded every track of the bundle");
        }
        log::info!(
            "filter kept {} of {} tracks, {} bounces and {} escapes drawn",
            drawn,
            bundle.tracks.len(),
            mask.drawn_bounces(),
            mask.drawn_escapes()
        );
        Ok(mask)
    }

    /// Sweep indices to keep, or `None` for all. Only meaningful for
    /// swept (plane-wave) bundles.
    fn sweep_selection(&self, bundle: &RayBundle) -> Result<Option<BTreeSet<usize>>> {
        if !bundle.is_swept() {
            if self.incidence_angles.is_some() {
                return Err(BounceError::config(
                    "incidence angles can only be selected for plane-wave bundles",
                ));
            }
            return Ok(None);
        }
        let mut selection: Option<BTreeSet<usize>> = None;
        if let Some(indices) = &self.sweep_indices {
            selection
                .get_or_insert_with(BTreeSet::new)
                .extend(indices.iter().copied());
        }
        if let Some(angles) = &self.incidence_angles {
            let resolved = bundle.sweep_indices_for(angles)?;
            selection.get_or_insert_with(BTreeSet::new).extend(resolved);
        }
        Ok(selection)
    }

    fn includes_track(
        &self,
        bundle: &RayBundle,
        track: &RayTrack,
        sweeps: Option<&BTreeSet<usize>>,
    ) -> bool {
        let type_ok = self
            .track_types
            .as_ref()
            .map_or(true, |types| types.contains(&track.track_type));
        let sweep_ok = match (bundle.is_swept(), sweeps, track.sweep_index) {
            (true, Some(selection), Some(index)) => selection.contains(&index),
            _ => true,
        };
        type_ok && sweep_ok
    }

    fn path_passes(&self, r_total: u32, t_total: u32) -> bool {
        self.total_refl.contains(r_total) && self.total_trans.contains(t_total)
    }

    /// Branch-level test for a leaf: the leaf's own path, or the path of
    /// any of its escaping rays.
    fn branch_passes(&self, leaf: &RayBounce) -> bool {
        let s = &leaf.stats;
        let step = leaf.bounce_type.refl_step();
        self.path_passes(s.r_depth, s.t_depth)
            || (leaf.has_refl_escape() && self.path_passes(s.r_depth + step, s.t_depth))
            || (leaf.has_trans_escape() && self.path_passes(s.r_depth, s.t_depth + 1))
    }

    fn bounce_passes(&self, bounce: &RayBounce) -> bool {
        let s = &bounce.stats;
        self.depth.contains(s.depth)
            && self.refl_depth.contains(s.r_depth)
            && self.trans_depth.contains(s.t_depth)
    }

    fn filter_track(&self, track: &RayTrack) -> Vec<DrawFlags> {
        let mut flags = vec![DrawFlags::default(); track.len()];

        for &leaf in &track.leaves {
            if !self.branch_passes(track.bounce(leaf)) {
                continue;
            }
            for id in track.ancestors(leaf) {
                if flags[id.0].branch {
                    break;
                }
                flags[id.0].branch = true;
            }
        }

        for (id, bounce) in track.iter_preorder() {
            let f = &mut flags[id.0];
            if !f.branch {
                continue;
            }
            f.bounce = self.bounce_passes(bounce);
            if !f.bounce {
                continue;
            }
            let s = &bounce.stats;
            let r_next = s.r_depth + bounce.bounce_type.refl_step();
            f.refl_escape = bounce.has_refl_escape()
                && self.refl_depth.contains(r_next)
                && self.path_passes(r_next, s.t_depth);
            f.trans_escape = bounce.has_trans_escape()
                && self.trans_depth.contains(s.t_depth + 1)
                && self.path_passes(s.r_depth, s.t_depth + 1);
        }
        flags
    }
}
