#![allow(dead_code)]

use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use raybounce::bounce::{BounceId, RayBounce};
use raybounce::bundle::{RayBundle, SourceType};
use raybounce::track::{RayTrack, TrackType};

/// Source -> one surface reflection -> escaping ray.
pub fn two_bounce_bundle() -> RayBundle {
    let mut bundle = RayBundle::new(SourceType::PointSource, vec![1e10]);
    let mut track = RayTrack::new(TrackType::Specular, Point3::origin());
    let hit = track.add_bounce(
        RayBounce::surface(Point3::new(0.0, 0.0, 1.0), -Vector3::z())
            .with_refl_escape(Vector3::new(1.0, 0.0, -1.0).normalize()),
    );
    track.set_first(hit);
    bundle.tracks.push(track);
    bundle
}

/// One surface hit at `(0,0,1)` that reflects towards `(1,0,1)` and
/// transmits towards `(0,0,2)`. The reflected hit escapes on its
/// reflected side, the transmitted hit on its transmitted side.
pub fn branching_bundle() -> RayBundle {
    let mut bundle = RayBundle::new(SourceType::PointSource, vec![1e10]);
    let mut track = RayTrack::new(TrackType::Specular, Point3::origin());
    let hit = track.add_bounce(RayBounce::surface(Point3::new(0.0, 0.0, 1.0), -Vector3::z()));
    let refl = track.add_bounce(
        RayBounce::surface(Point3::new(1.0, 0.0, 1.0), -Vector3::x())
            .with_refl_escape(-Vector3::x()),
    );
    let trans = track.add_bounce(
        RayBounce::surface(Point3::new(0.0, 0.0, 2.0), -Vector3::z())
            .with_trans_escape(Vector3::z()),
    );
    track.set_first(hit);
    track.attach_reflected(hit, refl);
    track.attach_transmitted(hit, trans);
    bundle.tracks.push(track);
    bundle
}

/// A straight chain of `n` reflections at `(0,0,k)` for `k = 1..=n`; the
/// last one escapes.
pub fn chain_bundle(n: usize) -> RayBundle {
    let mut bundle = RayBundle::new(SourceType::PointSource, vec![1e10]);
    let mut track = RayTrack::new(TrackType::Specular, Point3::origin());
    let mut previous: Option<BounceId> = None;
    for k in 1..=n {
        let mut bounce = RayBounce::surface(Point3::new(0.0, 0.0, k as f64), -Vector3::z());
        if k == n {
            bounce = bounce.with_refl_escape(Vector3::z());
        }
        let id = track.add_bounce(bounce);
        match previous {
            Some(parent) => track.attach_reflected(parent, id),
            None => track.set_first(id),
        }
        previous = Some(id);
    }
    bundle.tracks.push(track);
    bundle
}

/// Unit square footprint centred on `centre`, perpendicular to `normal`.
pub fn square_footprint(centre: Point3<f64>, normal: &Vector3<f64>) -> Vec<Point3<f64>> {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = normal.cross(&helper).normalize() * 0.5;
    let v = normal.cross(&u).normalize() * 0.5;
    vec![
        centre - u - v,
        centre + u - v,
        centre + u + v,
        centre - u + v,
    ]
}

fn random_unit(rng: &mut StdRng) -> Vector3<f64> {
    loop {
        let v = Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        if v.norm() > 0.1 {
            return v.normalize();
        }
    }
}

fn random_bounce(rng: &mut StdRng) -> RayBounce {
    let position = Point3::new(
        rng.random_range(-5.0..5.0),
        rng.random_range(-5.0..5.0),
        rng.random_range(-5.0..5.0),
    );
    let normal = random_unit(rng);
    let mut bounce = RayBounce::surface(position, normal);
    if rng.random_bool(0.6) {
        bounce = bounce.with_footprint(square_footprint(position, &normal));
    }
    bounce
}

/// Random specular or edge-diffraction track of at most `max_nodes` bounces.
pub fn random_track(rng: &mut StdRng, max_nodes: usize) -> RayTrack {
    let track_type = if rng.random_bool(0.2) {
        TrackType::EdgeDiffraction
    } else {
        TrackType::Specular
    };
    let mut track = RayTrack::new(track_type, Point3::origin())
        .with_launch_offset(rng.random_range(0.0..0.5));
    if track_type == TrackType::EdgeDiffraction {
        track = track.with_diffraction_point(Point3::new(0.0, 0.0, 0.5));
    }

    let first = track.add_bounce(random_bounce(rng));
    track.set_first(first);

    let mut open: Vec<(BounceId, u32)> = vec![(first, 1)];
    while let Some((id, level)) = open.pop() {
        let grow = 0.8 / level as f64;
        if track.len() < max_nodes && rng.random_bool(grow.min(1.0)) {
            let child = track.add_bounce(random_bounce(rng));
            track.attach_reflected(id, child);
            open.push((child, level + 1));
        } else if rng.random_bool(0.5) {
            track.bounce_mut(id).refl_escape = Some(random_unit(rng));
        }
        if track.len() < max_nodes && rng.random_bool(grow.min(1.0) * 0.7) {
            let child = track.add_bounce(random_bounce(rng));
            track.attach_transmitted(id, child);
            open.push((child, level + 1));
        } else if rng.random_bool(0.4) {
            track.bounce_mut(id).trans_escape = Some(random_unit(rng));
        }
    }
    track
}

pub fn random_bundle(seed: u64, num_tracks: usize) -> RayBundle {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bundle = RayBundle::new(SourceType::PointSource, vec![1e9, 2e9]);
    for _ in 0..num_tracks {
        bundle.tracks.push(random_track(&mut rng, 24));
    }
    bundle
}
