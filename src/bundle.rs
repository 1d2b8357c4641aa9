//! Ray bundles: the top-level container handed over by the SBR loader.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bounce::RayBounce;
use crate::error::{self, BounceError};
use crate::settings;
use crate::track::RayTrack;


/// What launched the rays of a bundle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    PointSource,
    Antenna,
    /// Incident plane wave, possibly swept over several angles.
    PlaneWave,
}

/// Incidence direction of a plane-wave sweep point, in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncidenceAngle {
    pub theta: f64,
    pub phi: f64,
}

impl IncidenceAngle {
    pub fn new(theta: f64, phi: f64) -> Self {
        Self { theta, phi }
    }

    fn matches(&self, other: &IncidenceAngle) -> bool {
        (self.theta - other.theta).abs() < settings::ANGLE_TOLERANCE
            && (self.phi - other.phi).abs() < settings::ANGLE_TOLERANCE
    }
}

/// Minimum and maximum of a set of cumulative distances.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Widens the span to include `value`.
    pub fn include(span: Option<Span>, value: f64) -> Option<Span> {
        Some(match span {
            Some(s) => Span::new(s.min.min(value), s.max.max(value)),
            None => Span::new(value, value),
        })
    }
}

/// One ray bundle: every traced track plus bundle-wide metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayBundle {
    pub source_type: SourceType,
    #[serde(default)]
    pub frequencies: Vec<f64>,
    #[serde(default)]
    pub tracks: Vec<RayTrack>,
    #[serde(default)]
    pub incidence_angles: BTreeMap<usize, IncidenceAngle>, // plane waves only
    #[serde(skip_deserializing)]
    pub footprint_span: Option<Span>, // set by the augmenter
    /// Never read from input: a loaded bundle is validated and augmented
    /// again before any pass trusts its links.
    #[serde(skip_deserializing)]
    pub augmented: bool,
}

impl RayBundle {
    pub fn new(source_type: SourceType, frequencies: Vec<f64>) -> Self {
        Self {
            source_type,
            frequencies,
            tracks: Vec::new(),
            incidence_angles: BTreeMap::new(),
            footprint_span: None,
            augmented: false,
        }
    }

    /// Loads a bundle from a JSON file. Normals and escape directions are
    /// rescaled to unit length; the bundle still needs augmenting.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("could not open bundle file {}", path.display()))?;
        let mut bundle: RayBundle = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("could not parse bundle file {}", path.display()))?;
        bundle
            .tracks
            .iter_mut()
            .flat_map(|track| track.bounces.iter_mut())
            .for_each(RayBounce::normalize_directions);
        log::info!(
            "loaded bundle with {} tracks and {} frequencies from {}",
            bundle.tracks.len(),
            bundle.frequencies.len(),
            path.display()
        );
        Ok(bundle)
    }

    /// Returns a precondition error unless the augmenter has run.
    pub fn ensure_augmented(&self) -> error::Result<()> {
        if self.augmented {
            Ok(())
        } else {
            Err(BounceError::NotAugmented)
        }
    }

    pub fn is_swept(&self) -> bool {
        self.source_type == SourceType::PlaneWave
    }

    /// Index of the frequency closest to `frequency`.
    pub fn nearest_frequency_index(&self, frequency: f64) -> Option<usize> {
        self.frequencies
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - frequency)
                    .abs()
                    .partial_cmp(&(*b - frequency).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }

    /// Resolves incidence angles to sweep indices of this bundle.
    pub fn sweep_indices_for(&self, angles: &[IncidenceAngle]) -> error::Result<Vec<usize>> {
        if !self.is_swept() {
            return Err(BounceError::config(
                "incidence angles can only be selected for plane-wave bundles",
            ));
        }
        angles
            .iter()
            .map(|angle| {
                self.incidence_angles
                    .iter()
                    .find(|(_, candidate)| candidate.matches(angle))
                    .map(|(index, _)| *index)
                    .ok_or_else(|| {
                        BounceError::config(format!(
                            "no sweep point at theta={}, phi={}",
                            angle.theta, angle.phi
                        ))
                    })
            })
            .collect()
    }

    pub fn num_bounces(&self) -> usize {
        self.tracks.iter().map(|t| t.len()).sum()
    }
}
