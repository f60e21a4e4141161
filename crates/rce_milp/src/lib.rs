//! MILP formulation and solver driver for energy-minimal cyclic schedules.
//!
//! [`CellModel`] turns a validated [`rce_cell::Problem`] into a
//! mixed-integer linear program behind the narrow [`MilpBackend`] interface
//! and materializes a [`CellSolution`] from an optimal solve. The bundled
//! backend is [`GoodLpBackend`].

pub mod backend;
pub mod good_lp_backend;
pub mod linear;
pub mod model;
pub mod solution;

pub use backend::{MilpBackend, SolveStatus, SolverOptions, VariableKind};
pub use good_lp_backend::GoodLpBackend;
pub use linear::{Comparison, LinearConstraint, LinearExpr, VarId};
pub use model::{CellModel, SolveError};
pub use solution::{ActivitySolution, CellSolution, CollisionResolution, RobotSolution};
