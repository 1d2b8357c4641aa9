mod common;

use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use raybounce::bounce::RayBounce;
use raybounce::bounds::Bounds;
use raybounce::bundle::{RayBundle, SourceType};
use raybounce::filter::FilterConfig;
use raybounce::render::{RenderConfig, RenderData};
use raybounce::track::{RayTrack, TrackType};

const SEEDS: [u64; 4] = [1, 42, 1234, 98765];

#[test]
fn augmentation_is_idempotent() {
    for seed in SEEDS {
        let mut once = common::random_bundle(seed, 12);
        once.augment().unwrap();

        let mut twice = once.clone();
        twice.augment().unwrap();
        assert_eq!(once, twice);

        // forced re-run over already augmented tracks
        twice.augmented = false;
        twice.augment().unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn distance_never_decreases() {
    for seed in SEEDS {
        let mut bundle = common::random_bundle(seed, 12);
        bundle.augment().unwrap();
        for track in &bundle.tracks {
            for (_, bounce) in track.iter_preorder() {
                if let Some(parent) = bounce.parent {
                    assert!(bounce.stats.distance >= track.bounce(parent).stats.distance);
                }
            }
            let deepest = track
                .iter_preorder()
                .map(|(_, b)| b.stats.distance)
                .fold(0.0, f64::max);
            assert_eq!(track.max_distance, deepest);
        }
    }
}

#[test]
fn leaves_are_covered_once() {
    for seed in SEEDS {
        let mut bundle = common::random_bundle(seed, 12);
        bundle.augment().unwrap();
        for track in &bundle.tracks {
            let source = track.source().unwrap();
            let expected: Vec<usize> = (0..track.leaves.len()).collect();
            let mut branches = source.stats.branches.clone();
            branches.sort_unstable();
            assert_eq!(branches, expected);

            for (index, &leaf) in track.leaves.iter().enumerate() {
                let bounce = track.bounce(leaf);
                assert!(bounce.stats.is_leaf);
                assert_eq!(bounce.stats.branches, vec![index]);
                // every ancestor lists the leaf exactly once
                for id in track.ancestors(leaf) {
                    let count = track
                        .bounce(id)
                        .stats
                        .branches
                        .iter()
                        .filter(|&&b| b == index)
                        .count();
                    assert_eq!(count, 1);
                }
            }
        }
    }
}

#[test]
fn passing_branch_marks_shared_ancestor() {
    let mut bundle = RayBundle::new(SourceType::PointSource, vec![1e10]);
    let mut track = RayTrack::new(TrackType::Specular, Point3::origin());
    let a = track.add_bounce(RayBounce::surface(Point3::new(0.0, 0.0, 1.0), Vector3::z()));
    let b = track.add_bounce(RayBounce::surface(Point3::new(1.0, 0.0, 2.0), Vector3::z()));
    let c = track.add_bounce(RayBounce::surface(Point3::new(0.0, 0.0, 3.0), Vector3::z()));
    track.set_first(a);
    track.attach_reflected(a, b);
    track.attach_transmitted(a, c);
    bundle.tracks.push(track);
    bundle.augment().unwrap();

    // b: one reflection, c: one transmission
    let filter = FilterConfig::from_toml("total_trans = { max = 0 }").unwrap();
    let mask = filter.apply(&bundle).unwrap();
    assert!(mask.get(0, a).branch);
    assert!(mask.get(0, b).branch);
    assert!(!mask.get(0, c).branch);
    assert!(mask.get(0, a).bounce);
    assert!(!mask.get(0, c).bounce);

    let filter =
        FilterConfig::from_toml("total_refl = { max = 0 }\ntotal_trans = { max = 0 }").unwrap();
    let mask = filter.apply(&bundle).unwrap();
    assert!(!mask.get(0, a).branch);
    assert_eq!(mask.drawn_tracks(), 0);
}

fn random_bounds(rng: &mut StdRng) -> Bounds {
    let min = rng.random_range(0..3);
    let max = if rng.random_bool(0.3) {
        None
    } else {
        Some(min + rng.random_range(0..4))
    };
    Bounds::new(min, max).unwrap()
}

fn widen(bounds: Bounds, rng: &mut StdRng) -> Bounds {
    let min = bounds.min().saturating_sub(rng.random_range(0..2));
    let max = bounds.max().map(|m| m + rng.random_range(0..3));
    Bounds::new(min, max).unwrap()
}

#[test]
fn widening_never_hides_anything() {
    let mut rng = StdRng::seed_from_u64(2024);
    for seed in SEEDS {
        let mut bundle = common::random_bundle(seed, 16);
        bundle.augment().unwrap();

        for _ in 0..25 {
            let narrow = FilterConfig {
                depth: random_bounds(&mut rng),
                refl_depth: random_bounds(&mut rng),
                trans_depth: random_bounds(&mut rng),
                total_refl: random_bounds(&mut rng),
                total_trans: random_bounds(&mut rng),
                ..FilterConfig::default()
            };
            let wide = FilterConfig {
                depth: widen(narrow.depth, &mut rng),
                refl_depth: widen(narrow.refl_depth, &mut rng),
                trans_depth: widen(narrow.trans_depth, &mut rng),
                total_refl: widen(narrow.total_refl, &mut rng),
                total_trans: widen(narrow.total_trans, &mut rng),
                ..FilterConfig::default()
            };
            assert!(wide.is_wider_than(&narrow));

            let narrow_mask = narrow.apply(&bundle).unwrap();
            let wide_mask = wide.apply(&bundle).unwrap();
            for (index, track) in bundle.tracks.iter().enumerate() {
                for (id, _) in track.iter_preorder() {
                    let n = narrow_mask.get(index, id);
                    let w = wide_mask.get(index, id);
                    assert!(!n.branch || w.branch);
                    assert!(!n.bounce || w.bounce);
                    assert!(!n.refl_escape || w.refl_escape);
                    assert!(!n.trans_escape || w.trans_escape);
                }
            }

            let config = RenderConfig::default();
            let narrow_data = RenderData::build(&bundle, &narrow_mask, &config).unwrap();
            let wide_data = RenderData::build(&bundle, &wide_mask, &config).unwrap();
            assert!(wide_data.points.len() >= narrow_data.points.len());
            assert!(wide_data.footprints.len() >= narrow_data.footprints.len());
            assert!(wide_data.lines.len() >= narrow_data.lines.len());
        }
    }
}

#[test]
fn bundle_survives_json() {
    let mut bundle = common::random_bundle(5, 4);
    let text = serde_json::to_string(&bundle).unwrap();
    let mut back: RayBundle = serde_json::from_str(&text).unwrap();
    bundle.augment().unwrap();
    back.augment().unwrap();
    assert_eq!(bundle.num_bounces(), back.num_bounces());
    for (a, b) in bundle.tracks.iter().zip(&back.tracks) {
        assert_eq!(a.leaves, b.leaves);
        assert_eq!(a.len(), b.len());
    }
}
