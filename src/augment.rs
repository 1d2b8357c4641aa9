//! Tree augmentation.
//!
//! One-time enrichment of a freshly loaded [`RayBundle`]:
//! - a synthetic source bounce per track (plus a diffraction bounce below
//!   it for edge-diffraction tracks)
//! - parent links and cumulative path distance (pre-order pass)
//! - leaf detection, max depth statistics and branch index lists
//!   (post-order pass)
//!
//! Depth counters are carried down the pre-order pass as an explicit
//! accumulator on the traversal stack; nothing here depends on a filter
//! configuration, so the result is reused by every later filter pass.

use rayon::prelude::*;

use crate::bounce::{BounceId, BounceStats, BounceType, RayBounce};
use crate::bundle::{RayBundle, Span};
use crate::error::{BounceError, Result};
use crate::track::{RayTrack, TrackType};


impl RayBundle {
    /// Augments every track of the bundle. Tracks are validated first, so
    /// a malformed track leaves the bundle untouched. A bundle that is
    /// already augmented is returned unchanged.
    pub fn augment(&mut self) -> Result<()> {
        if self.augmented {
            log::debug!("bundle already augmented, skipping");
            return Ok(());
        }

        for (index, track) in self.tracks.iter().enumerate() {
            validate_track(index, track)?;
        }

        self.tracks.par_iter_mut().for_each(augment_track);

        self.footprint_span = self
            .tracks
            .iter()
            .flat_map(|track| track.iter_preorder())
            .filter(|(_, bounce)| bounce.has_footprint())
            .fold(None, |span, (_, bounce)| Span::include(span, bounce.stats.distance));
        self.augmented = true;

        log::info!(
            "augmented {} tracks ({} bounces)",
            self.tracks.len(),
            self.num_bounces()
        );
        Ok(())
    }
}

fn malformed(track: usize, reason: impl Into<String>) -> BounceError {
    BounceError::MalformedTrack {
        track,
        reason: reason.into(),
    }
}

/// Checks that a track's arena forms a tree reachable from its entry point.
pub(crate) fn validate_track(index: usize, track: &RayTrack) -> Result<()> {
    let n = track.bounces.len();
    let in_range = |id: BounceId| id.0 < n;

    let entry = if track.has_source() {
        track.root
    } else {
        if track.root.is_some() {
            return Err(malformed(index, "root is not a source bounce"));
        }
        if track.track_type == TrackType::EdgeDiffraction && track.diffraction_point.is_none() {
            return Err(malformed(index, "edge-diffraction track has no diffraction point"));
        }
        track.first
    };

    let Some(entry) = entry else {
        return Ok(());
    };
    if !in_range(entry) {
        return Err(malformed(index, format!("entry bounce {} out of range", entry.0)));
    }

    let mut seen = vec![false; n];
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
        if seen[id.0] {
            return Err(malformed(index, format!("bounce {} is reachable twice", id.0)));
        }
        seen[id.0] = true;
        for child in track.bounce(id).children() {
            if !in_range(child) {
                return Err(malformed(
                    index,
                    format!("bounce {} has dangling child {}", id.0, child.0),
                ));
            }
            stack.push(child);
        }
    }
    Ok(())
}

/// Depth counters threaded down the pre-order pass.
#[derive(Debug, Copy, Clone)]
struct Descent {
    parent: Option<BounceId>,
    distance: f64,
    depth: u32,
    r_depth: u32,
    t_depth: u32,
}

/// Augments one validated track. Safe to repeat: every derived value is
/// recomputed from the structure.
pub(crate) fn augment_track(track: &mut RayTrack) {
    if !track.has_source() {
        insert_source(track);
    }
    let Some(root) = track.root else {
        return;
    };

    // pre-order: parent links, distance, depth counters
    let mut stack = vec![(
        root,
        Descent {
            parent: None,
            distance: track.launch_offset,
            depth: 0,
            r_depth: 0,
            t_depth: 0,
        },
    )];
    while let Some((id, acc)) = stack.pop() {
        let distance = match acc.parent {
            Some(parent) => {
                acc.distance + (track.bounce(id).position - track.bounce(parent).position).norm()
            }
            None => acc.distance,
        };
        let bounce = track.bounce_mut(id);
        bounce.parent = acc.parent;
        bounce.stats = BounceStats {
            distance,
            depth: acc.depth,
            r_depth: acc.r_depth,
            t_depth: acc.t_depth,
            ..BounceStats::default()
        };

        let step = bounce.bounce_type.refl_step();
        let here = Descent {
            parent: Some(id),
            distance,
            depth: acc.depth + 1,
            r_depth: acc.r_depth,
            t_depth: acc.t_depth,
        };
        if let Some(trans) = bounce.trans {
            stack.push((
                trans,
                Descent {
                    t_depth: acc.t_depth + 1,
                    ..here
                },
            ));
        }
        if let Some(refl) = bounce.refl {
            stack.push((
                refl,
                Descent {
                    r_depth: acc.r_depth + step,
                    ..here
                },
            ));
        }
    }

    // post-order: leaves, max depths, branch lists
    track.leaves.clear();
    track.max_distance = track.launch_offset;
    for id in post_order(track, root) {
        let bounce = track.bounce(id);
        let mut stats = bounce.stats.clone();
        stats.is_leaf = bounce.has_escape() || bounce.children().next().is_none();
        stats.max_depth = stats.depth;
        stats.max_r_depth = stats.r_depth;
        stats.max_t_depth = stats.t_depth;

        if bounce.has_refl_escape() {
            stats.max_depth = stats.max_depth.max(stats.depth + 1);
            stats.max_r_depth = stats
                .max_r_depth
                .max(stats.r_depth + bounce.bounce_type.refl_step());
        }
        if bounce.has_trans_escape() {
            stats.max_depth = stats.max_depth.max(stats.depth + 1);
            stats.max_t_depth = stats.max_t_depth.max(stats.t_depth + 1);
        }

        for child in bounce.children() {
            let child = &track.bounce(child).stats;
            stats.max_depth = stats.max_depth.max(child.max_depth);
            stats.max_r_depth = stats.max_r_depth.max(child.max_r_depth);
            stats.max_t_depth = stats.max_t_depth.max(child.max_t_depth);
            stats.branches.extend_from_slice(&child.branches);
        }

        if stats.is_leaf {
            track.leaves.push(id);
            stats.branches.push(track.leaves.len() - 1);
        }
        track.max_distance = track.max_distance.max(stats.distance);
        track.bounce_mut(id).stats = stats;
    }
}

/// Adds the synthetic source bounce (and the diffraction bounce where
/// the track type calls for one) above the first physical bounce.
fn insert_source(track: &mut RayTrack) {
    let source = track.add_bounce(RayBounce::new(track.origin, BounceType::Source));
    let below = match (track.track_type, track.diffraction_point) {
        (TrackType::EdgeDiffraction, Some(point)) => {
            let edge = track.add_bounce(RayBounce::new(point, BounceType::UtdEdge));
            track.bounce_mut(edge).refl = track.first;
            Some(edge)
        }
        _ => track.first,
    };
    track.bounce_mut(source).refl = below;
    track.root = Some(source);
}

/// Post-order ids below `root`, reflected subtree before transmitted.
fn post_order(track: &RayTrack, root: BounceId) -> Vec<BounceId> {
    let mut order = Vec::with_capacity(track.len());
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        stack.push((id, true));
        let bounce = track.bounce(id);
        stack.extend(bounce.trans.map(|c| (c, false)));
        stack.extend(bounce.refl.map(|c| (c, false)));
    }
    order
}
