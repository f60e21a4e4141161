//! The error taxonomy of the optimization pipeline.

use rce_cell::InvalidInputError;
use rce_milp::SolveError;
use rce_profile::{MovementError, ProfileError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Schema or semantic violation in the cell description.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
    /// Non-finite numbers or point configurations the estimator's
    /// decomposition cannot handle.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(ProfileError),
    /// A movement with coincident start and end where the estimator needs a
    /// nonzero length.
    #[error("degenerate movement: {0}")]
    DegenerateMovement(ProfileError),
    /// A movement without duration bounds for which no fallback estimate
    /// exists.
    #[error("missing duration bounds: {0}")]
    MissingDurationBounds(ProfileError),
    #[error("no feasible schedule exists")]
    Infeasible,
    #[error("the schedule model is unbounded")]
    Unbounded,
    #[error("the solver hit its time limit")]
    TimedOut,
    #[error("the solver was interrupted")]
    Interrupted,
    #[error("solver error: {0}")]
    Solver(String),
}

impl From<ProfileError> for Error {
    fn from(error: ProfileError) -> Self {
        match error {
            error @ ProfileError::Movement {
                source: MovementError::Degenerate,
                ..
            } => Self::DegenerateMovement(error),
            error @ ProfileError::Movement { .. } => Self::InvalidGeometry(error),
            error @ ProfileError::MissingDurationBounds { .. } => {
                Self::MissingDurationBounds(error)
            }
            ProfileError::Envelope { id, source } => {
                Self::InvalidInput(InvalidInputError::Profile { id, source })
            }
        }
    }
}

impl From<SolveError> for Error {
    fn from(error: SolveError) -> Self {
        match error {
            SolveError::Infeasible => Self::Infeasible,
            SolveError::Unbounded => Self::Unbounded,
            SolveError::TimedOut => Self::TimedOut,
            SolveError::Interrupted => Self::Interrupted,
            SolveError::Solver(message) => Self::Solver(message),
        }
    }
}
