//! Data model of a multi-robot work cell and its cyclic schedule problem.
//!
//! The crate owns three layers: the serde [`description`] types collaborators
//! hand in, the semantic [`validate`] pass, and the immutable [`problem`]
//! model the schedule optimizer consumes.

pub mod description;
pub mod problem;
pub mod profile;
pub mod skip_ratio;
pub mod validate;

pub use description::{
    ActivityDescription, CellDescription, CollisionDescription, RobotDescription,
    TimeOffsetDescription,
};
pub use problem::{
    Activity, ActivityId, ActivityKind, ActivityRef, ActivityType, Collision, IdleActivity,
    MovementActivity, Problem, Robot, TimeOffset, WorkActivity,
};
pub use profile::{EnergyProfile, EnergyProfileError, MovementProfile, ResolvedProfiles};
pub use skip_ratio::{SkipRatio, SkipRatioError};
pub use validate::{build_problem, validate, InvalidInputError};
