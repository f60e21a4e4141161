//! The narrow solver interface the schedule model is built against.
//!
//! Any MILP solver that can create bounded continuous and binary variables,
//! accept linear constraints, minimize a linear objective and report one of
//! the [`SolveStatus`] outcomes can drive the optimizer.

use std::time::Duration;

use crate::linear::{LinearConstraint, LinearExpr, VarId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariableKind {
    Continuous { lower: f64, upper: Option<f64> },
    Binary,
}

/// Outcome of a solve attempt.
#[derive(Debug, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    TimedOut,
    Interrupted,
    #[strum(serialize = "Error")]
    Error(String),
}

/// Options forwarded to the backend at solve time.
#[derive(Debug, Clone, Default)]
pub struct SolverOptions {
    /// Wall-clock limit for the solve. Backends without time limit support
    /// ignore it and run to completion.
    pub time_limit: Option<Duration>,
}

/// A mixed-integer linear programming backend.
///
/// Variables and constraints are registered in call order and the emitted
/// order is deterministic for a given problem; backends must not reorder
/// anything that would make repeated runs diverge.
pub trait MilpBackend {
    /// Registers a decision variable and returns its handle.
    fn add_variable(&mut self, kind: VariableKind, name: &str) -> VarId;

    /// Registers a linear constraint over previously created variables.
    fn add_constraint(&mut self, constraint: LinearConstraint);

    /// Sets the objective to minimize.
    fn set_objective(&mut self, objective: LinearExpr);

    /// Runs the solver. Returns [`SolveStatus::Optimal`] when an optimal
    /// solution was found; [`MilpBackend::value`] is only meaningful then.
    fn solve(&mut self, options: &SolverOptions) -> SolveStatus;

    /// Value of a variable in the optimal solution.
    ///
    /// # Panics
    ///
    /// May panic when called before [`MilpBackend::solve`] returned
    /// [`SolveStatus::Optimal`].
    fn value(&self, var: VarId) -> f64;
}
