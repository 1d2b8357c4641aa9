//! Inclusive integer ranges used by the filter configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BounceError, Result};


/// Inclusive range `[min, max]`; a missing `max` is unbounded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawBounds", into = "RawBounds")]
pub struct Bounds {
    min: u32,
    max: Option<u32>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBounds {
    #[serde(default)]
    min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<u32>,
}

impl TryFrom<RawBounds> for Bounds {
    type Error = BounceError;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Bounds::new(raw.min, raw.max)
    }
}

impl From<Bounds> for RawBounds {
    fn from(bounds: Bounds) -> Self {
        RawBounds {
            min: bounds.min,
            max: bounds.max,
        }
    }
}

impl Bounds {
    pub fn new(min: u32, max: Option<u32>) -> Result<Self> {
        match max {
            Some(max) if min > max => Err(BounceError::config(format!(
                "range minimum {} exceeds maximum {}",
                min, max
            ))),
            _ => Ok(Self { min, max }),
        }
    }

    /// `[0, max]`
    pub fn up_to(max: u32) -> Self {
        Self {
            min: 0,
            max: Some(max),
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }

    /// Whether every value in `other` is also in `self`.
    pub fn covers(&self, other: &Bounds) -> bool {
        let upper = match (self.max, other.max) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a >= b,
        };
        self.min <= other.min && upper
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, inf)", self.min),
        }
    }
}
