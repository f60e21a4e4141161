//! Skip ratios for collision neighbor coverage.

use serde::{Deserialize, Deserializer, Serialize};

/// Fraction of a neighboring activity's duration that a collision exclusion
/// extends over, in the closed interval [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkipRatio(f64);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipRatioError {
    #[error("skip ratio {0} is outside the closed interval [0.0, 1.0]")]
    OutOfBounds(f64),
}

impl SkipRatio {
    /// Creates a new `SkipRatio`. Returns an error if the value is not in
    /// [0.0, 1.0].
    pub fn new(value: f64) -> Result<Self, SkipRatioError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(SkipRatioError::OutOfBounds(value));
        }
        Ok(Self(value))
    }

    /// The default ratio: the whole neighboring activity is covered.
    #[must_use]
    pub const fn full() -> Self {
        Self(1.0)
    }

    pub const fn get(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl Default for SkipRatio {
    fn default() -> Self {
        Self::full()
    }
}

impl TryFrom<f64> for SkipRatio {
    type Error = SkipRatioError;

    fn try_from(value: f64) -> Result<Self, SkipRatioError> {
        Self::new(value)
    }
}

impl From<SkipRatio> for f64 {
    fn from(ratio: SkipRatio) -> f64 {
        ratio.0
    }
}

impl<'de> Deserialize<'de> for SkipRatio {
    fn deserialize<D>(deserializer: D) -> Result<SkipRatio, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        SkipRatio::new(value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for SkipRatio {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}
