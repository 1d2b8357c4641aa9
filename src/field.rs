//! Scalar colour values from complex field samples.
//!
//! The evaluation pipeline for a surface bounce is:
//! 1. vector assembly: sum of the selected incident/reflected/transmitted
//!    samples of E, H, or an equivalent current `J = n x H`, `M = -E x n`
//! 2. component reduction: one signed axis (complex scalar) or the
//!    composite squared magnitude (non-negative real)
//! 3. scale transform: real, imaginary, magnitude, power, dB or phase
//!
//! The distance mode skips the pipeline and reports cumulative path
//! distance. A bounce lacking a sample for any selected side evaluates
//! to `None` rather than an error.

use itertools::Itertools;
use nalgebra::{Complex, Vector3};
use serde::{Deserialize, Serialize};

use crate::bounce::{BounceType, CVector3, FieldKind, FieldSide, RayBounce};
use crate::bundle::RayBundle;
use crate::error::{BounceError, Result};


/// Base quantity of the field pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    E,
    H,
    /// Electric surface current `n x H`.
    J,
    /// Magnetic surface current `-E x n`.
    M,
}

impl Quantity {
    fn is_current(self) -> bool {
        matches!(self, Quantity::J | Quantity::M)
    }
}

/// Component reduction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    X,
    Y,
    Z,
    NegX,
    NegY,
    NegZ,
    /// Squared magnitude of the whole vector.
    Composite,
}

/// Scale transform applied to the reduced value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Real,
    Imag,
    Mag,
    Power,
    Db,
    /// Phase angle in degrees.
    Phase,
}

impl Scale {
    fn needs_phase(self) -> bool {
        matches!(self, Scale::Real | Scale::Imag | Scale::Phase)
    }
}

/// A validated field pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    quantity: Quantity,
    sources: Vec<FieldSide>,
    component: Component,
    scale: Scale,
}

impl FieldSpec {
    pub fn new(
        quantity: Quantity,
        sources: Vec<FieldSide>,
        component: Component,
        scale: Scale,
    ) -> Result<Self> {
        let sources: Vec<FieldSide> = sources.into_iter().unique().collect();
        if sources.is_empty() {
            return Err(BounceError::config("field mode needs at least one source side"));
        }
        if component == Component::Composite && scale.needs_phase() {
            return Err(BounceError::config(format!(
                "{:?} scale cannot be applied to a composite component",
                scale
            )));
        }
        Ok(Self {
            quantity,
            sources,
            component,
            scale,
        })
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn sources(&self) -> &[FieldSide] {
        &self.sources
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Evaluates the pipeline at a bounce. `None` if the bounce is not a
    /// surface bounce or lacks a sample for any selected side.
    pub fn evaluate(&self, bounce: &RayBounce, freq: usize) -> Option<f64> {
        if bounce.bounce_type != BounceType::Surface {
            return None;
        }
        let vector = self.assemble(bounce, freq)?;
        let value = match self.component {
            Component::X => scale_complex(vector[0], self.scale),
            Component::Y => scale_complex(vector[1], self.scale),
            Component::Z => scale_complex(vector[2], self.scale),
            Component::NegX => scale_complex(-vector[0], self.scale),
            Component::NegY => scale_complex(-vector[1], self.scale),
            Component::NegZ => scale_complex(-vector[2], self.scale),
            Component::Composite => {
                scale_power(vector.iter().map(|c| c.norm_sqr()).sum(), self.scale)?
            }
        };
        Some(value)
    }

    fn assemble(&self, bounce: &RayBounce, freq: usize) -> Option<CVector3> {
        let normal = if self.quantity.is_current() {
            Some(bounce.normal?)
        } else {
            None
        };

        // every selected side must be sampled; a missing one is not a zero
        let contributions = self
            .sources
            .iter()
            .map(|&side| {
                let sample = match self.quantity {
                    Quantity::E | Quantity::M => bounce.fields.get(FieldKind::E, side, freq)?,
                    Quantity::H | Quantity::J => bounce.fields.get(FieldKind::H, side, freq)?,
                };
                let vector = match normal {
                    // J = n x H and M = -E x n = n x E share the same product
                    Some(n) => cross_real(&n, &sample),
                    None => sample,
                };
                // the normal flips on the transmission side
                match (normal, side) {
                    (Some(_), FieldSide::Transmitted) => Some(-vector),
                    _ => Some(vector),
                }
            })
            .collect::<Option<Vec<CVector3>>>()?;
        contributions.into_iter().reduce(|acc, v| acc + v)
    }
}

/// `a x b` for a real `a` and a complex `b`.
fn cross_real(a: &Vector3<f64>, b: &CVector3) -> CVector3 {
    Vector3::new(
        b[2] * a[1] - b[1] * a[2],
        b[0] * a[2] - b[2] * a[0],
        b[1] * a[0] - b[0] * a[1],
    )
}

fn scale_complex(value: Complex<f64>, scale: Scale) -> f64 {
    match scale {
        Scale::Real => value.re,
        Scale::Imag => value.im,
        Scale::Mag => value.norm(),
        Scale::Power => value.norm_sqr(),
        Scale::Db => 10.0 * value.norm_sqr().log10(),
        Scale::Phase => value.arg().to_degrees(),
    }
}

fn scale_power(power: f64, scale: Scale) -> Option<f64> {
    match scale {
        Scale::Mag => Some(power.sqrt()),
        Scale::Power => Some(power),
        Scale::Db => Some(10.0 * power.log10()),
        // rejected by FieldSpec::new
        Scale::Real | Scale::Imag | Scale::Phase => None,
    }
}

/// Scalar colour source: cumulative distance or a field pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMode {
    Distance,
    Field(FieldSpec),
}

impl FieldMode {
    pub fn evaluate(&self, bounce: &RayBounce, freq: usize) -> Option<f64> {
        match self {
            FieldMode::Distance => Some(bounce.stats.distance),
            FieldMode::Field(spec) => spec.evaluate(bounce, freq),
        }
    }
}

/// A field mode bound to an augmented bundle and a frequency index.
#[derive(Debug, Clone)]
pub struct Evaluator {
    mode: FieldMode,
    freq: usize,
}

impl Evaluator {
    pub fn new(bundle: &RayBundle, mode: FieldMode, freq: usize) -> Result<Self> {
        bundle.ensure_augmented()?;
        if let FieldMode::Field(_) = mode {
            if freq >= bundle.frequencies.len() {
                return Err(BounceError::config(format!(
                    "frequency index {} out of range for {} frequencies",
                    freq,
                    bundle.frequencies.len()
                )));
            }
        }
        Ok(Self { mode, freq })
    }

    pub fn value(&self, bounce: &RayBounce) -> Option<f64> {
        self.mode.evaluate(bounce, self.freq)
    }

    pub fn mode(&self) -> &FieldMode {
        &self.mode
    }
}
