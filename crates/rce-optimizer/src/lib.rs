//! Energy-minimal cyclic schedules for multi-robot work cells.
//!
//! Given a fixed cycle time, per-robot ordered activity lists and
//! inter-robot constraints, [`optimize`] assigns start times and durations
//! minimizing the total electrical energy per cycle:
//!
//! 1. the cell description is validated ([`rce_cell`]),
//! 2. movement and idle activities get piecewise-linear energy envelopes
//!    ([`rce_profile`]),
//! 3. the schedule is solved as a mixed-integer linear program
//!    ([`rce_milp`]).

pub mod error;

pub use error::Error;
pub use rce_cell::{
    ActivityDescription, ActivityType, CellDescription, CollisionDescription, Problem,
    RobotDescription, SkipRatio, TimeOffsetDescription,
};
pub use rce_geometry::{Line2D, Point2D, Point3D};
pub use rce_milp::{
    ActivitySolution, CellModel, CellSolution, GoodLpBackend, MilpBackend, RobotSolution,
    SolverOptions,
};
pub use rce_profile::{EnergyProfileEstimator, EnergyProfileParameters};

use tracing::debug;

/// Computes an energy-minimal schedule with the calibrated default
/// estimator parameters and default solver options.
pub fn optimize(cell: &CellDescription) -> Result<CellSolution, Error> {
    optimize_with(
        cell,
        EnergyProfileParameters::default(),
        &SolverOptions::default(),
    )
}

/// Computes an energy-minimal schedule with custom estimator parameters
/// and solver options.
pub fn optimize_with(
    cell: &CellDescription,
    parameters: EnergyProfileParameters,
    options: &SolverOptions,
) -> Result<CellSolution, Error> {
    rce_cell::validate(cell)?;

    let estimator = EnergyProfileEstimator::new(parameters);
    let profiles = estimator.resolve_profiles(cell)?;
    let problem = rce_cell::build_problem(cell, &profiles)?;
    debug!(cycle_time = problem.cycle_time(), "problem prepared");

    let solution = CellModel::build(problem).solve(options)?;
    Ok(solution)
}
