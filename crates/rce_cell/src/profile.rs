//! Piecewise-linear energy envelopes.

use std::collections::HashMap;

use rce_geometry::Line2D;
use serde::{Deserialize, Serialize};

use crate::problem::ActivityId;

/// A convex lower bound on energy as a function of duration, stored as a
/// non-empty set of affine lines. The effective bound at a duration `d` is
/// the maximum of `q * d + c` over all lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Line2D>", into = "Vec<Line2D>")]
pub struct EnergyProfile(Vec<Line2D>);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnergyProfileError {
    #[error("an energy profile needs at least one line")]
    Empty,
    #[error("energy profile line y = {q}x + {c} has a non-finite coefficient")]
    NonFiniteLine { q: f64, c: f64 },
}

impl EnergyProfile {
    /// Creates a profile from lines. All coefficients must be finite and at
    /// least one line must be given.
    pub fn new(lines: Vec<Line2D>) -> Result<Self, EnergyProfileError> {
        if lines.is_empty() {
            return Err(EnergyProfileError::Empty);
        }
        if let Some(line) = lines
            .iter()
            .find(|line| !line.q.is_finite() || !line.c.is_finite())
        {
            return Err(EnergyProfileError::NonFiniteLine {
                q: line.q,
                c: line.c,
            });
        }
        Ok(Self(lines))
    }

    /// A single-line profile, the usual shape for idle rates `q * d`.
    pub fn single(line: Line2D) -> Result<Self, EnergyProfileError> {
        Self::new(vec![line])
    }

    pub fn lines(&self) -> &[Line2D] {
        &self.0
    }

    /// The envelope value at duration `d`: the max over all lines.
    pub fn value_at(&self, d: f64) -> f64 {
        self.0
            .iter()
            .map(|line| line.y_at(d))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Lines whose value at `d` is within `tolerance` of the envelope value,
    /// i.e. the pieces active at that duration.
    pub fn active_lines_at(&self, d: f64, energy: f64, tolerance: f64) -> Vec<Line2D> {
        self.0
            .iter()
            .copied()
            .filter(|line| (line.y_at(d) - energy).abs() <= tolerance)
            .collect()
    }
}

impl TryFrom<Vec<Line2D>> for EnergyProfile {
    type Error = EnergyProfileError;

    fn try_from(lines: Vec<Line2D>) -> Result<Self, EnergyProfileError> {
        Self::new(lines)
    }
}

impl From<EnergyProfile> for Vec<Line2D> {
    fn from(profile: EnergyProfile) -> Self {
        profile.0
    }
}

/// Resolved duration bounds and envelope of a movement activity, as produced
/// by the preprocessing stage.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementProfile {
    pub profile: EnergyProfile,
    pub min_duration: f64,
    pub max_duration: f64,
}

/// Envelopes computed by the preprocessing stage, keyed by activity id.
/// Movement entries also carry the resolved duration bounds since the
/// estimator fills bounds the description leaves out.
#[derive(Debug, Clone, Default)]
pub struct ResolvedProfiles {
    movements: HashMap<ActivityId, MovementProfile>,
    idles: HashMap<ActivityId, EnergyProfile>,
}

impl ResolvedProfiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_movement(&mut self, id: ActivityId, profile: MovementProfile) {
        self.movements.insert(id, profile);
    }

    pub fn insert_idle(&mut self, id: ActivityId, profile: EnergyProfile) {
        self.idles.insert(id, profile);
    }

    pub fn movement(&self, id: &str) -> Option<&MovementProfile> {
        self.movements.get(id)
    }

    pub fn idle(&self, id: &str) -> Option<&EnergyProfile> {
        self.idles.get(id)
    }
}
