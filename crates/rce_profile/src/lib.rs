//! Energy profile estimation for robot activities.
//!
//! Turns robot geometry, payload and movement endpoints into the
//! piecewise-linear energy envelopes and idle power rates the schedule
//! optimizer prices durations with.

pub mod estimator;
pub mod movement;
pub mod params;

pub use estimator::{EnergyProfileEstimator, ProfileError};
pub use movement::{DirectionRatios, Movement, MovementError};
pub use params::{
    EnergyProfileParameters, ParseError, PartialEnergyProfileParameters, PerDirection, QuadCoefs,
};
