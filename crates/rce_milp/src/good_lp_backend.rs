//! [`MilpBackend`] implementation on top of the `good_lp` solver facade.
//!
//! The concrete solver is `good_lp`'s `default_solver`, which this crate
//! pins to the pure-Rust `microlp` MIP solver, so the optimizer needs no
//! native solver libraries. Variables and constraints are buffered and the
//! `good_lp` problem is assembled in one pass at solve time, preserving
//! registration order.

use good_lp::{constraint, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable};
use tracing::{debug, warn};

use crate::{
    backend::{MilpBackend, SolveStatus, SolverOptions, VariableKind},
    linear::{Comparison, LinearConstraint, LinearExpr, VarId},
};

pub struct GoodLpBackend {
    // consumed by solve; a second solve attempt reports an error status
    variables: Option<ProblemVariables>,
    handles: Vec<Variable>,
    constraints: Vec<good_lp::Constraint>,
    objective: Expression,
    values: Option<Vec<f64>>,
}

impl GoodLpBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            variables: Some(ProblemVariables::new()),
            handles: Vec::new(),
            constraints: Vec::new(),
            objective: Expression::from_other_affine(0.0),
            values: None,
        }
    }

    fn to_expression(&self, expr: &LinearExpr) -> Expression {
        let mut result = Expression::from_other_affine(expr.constant);
        for (var, coef) in &expr.terms {
            result += *coef * self.handles[var.index()];
        }
        result
    }
}

impl Default for GoodLpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GoodLpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoodLpBackend")
            .field("variables", &self.handles.len())
            .field("constraints", &self.constraints.len())
            .field("solved", &self.values.is_some())
            .finish()
    }
}

impl MilpBackend for GoodLpBackend {
    fn add_variable(&mut self, kind: VariableKind, name: &str) -> VarId {
        let definition = match kind {
            VariableKind::Continuous { lower, upper } => {
                let mut definition = variable().min(lower);
                if let Some(upper) = upper {
                    definition = definition.max(upper);
                }
                definition
            }
            VariableKind::Binary => variable().binary(),
        };
        let handle = self
            .variables
            .as_mut()
            .expect("variables are only consumed by solve")
            .add(definition.name(name));
        self.handles.push(handle);
        VarId(self.handles.len() - 1)
    }

    fn add_constraint(&mut self, constraint: LinearConstraint) {
        let expr = self.to_expression(&constraint.expr);
        let constraint = match constraint.comparison {
            Comparison::LessOrEqual => constraint::leq(expr, constraint.rhs),
            Comparison::GreaterOrEqual => constraint::geq(expr, constraint.rhs),
            Comparison::Equal => constraint::eq(expr, constraint.rhs),
        };
        self.constraints.push(constraint);
    }

    fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = self.to_expression(&objective);
    }

    fn solve(&mut self, options: &SolverOptions) -> SolveStatus {
        if let Some(limit) = options.time_limit {
            // microlp runs to completion; surface the ignored option
            warn!(?limit, "solver backend has no time limit support");
        }

        let Some(variables) = self.variables.take() else {
            return SolveStatus::Error("model was already solved".to_owned());
        };

        debug!(
            variables = self.handles.len(),
            constraints = self.constraints.len(),
            "invoking MILP solver"
        );

        let mut model = variables
            .minimise(self.objective.clone())
            .using(good_lp::default_solver);
        for constraint in self.constraints.drain(..) {
            model = model.with(constraint);
        }

        match model.solve() {
            Ok(solution) => {
                self.values = Some(self.handles.iter().map(|&v| solution.value(v)).collect());
                SolveStatus::Optimal
            }
            Err(ResolutionError::Infeasible) => SolveStatus::Infeasible,
            Err(ResolutionError::Unbounded) => SolveStatus::Unbounded,
            Err(other) => SolveStatus::Error(other.to_string()),
        }
    }

    fn value(&self, var: VarId) -> f64 {
        self.values
            .as_ref()
            .expect("value() is only valid after an Optimal solve")[var.index()]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::linear::LinearExpr;

    #[test]
    fn minimizes_simple_program() {
        let mut backend = GoodLpBackend::new();
        let x = backend.add_variable(
            VariableKind::Continuous {
                lower: 0.0,
                upper: None,
            },
            "x",
        );
        backend.add_constraint(LinearConstraint::greater_or_equal(
            LinearExpr::variable(x),
            3.0,
        ));
        backend.set_objective(LinearExpr::variable(x));

        assert_eq!(backend.solve(&SolverOptions::default()), SolveStatus::Optimal);
        assert_abs_diff_eq!(backend.value(x), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn binary_variable_selects_cheaper_branch() {
        let mut backend = GoodLpBackend::new();
        let x = backend.add_variable(VariableKind::Binary, "x");
        let y = backend.add_variable(
            VariableKind::Continuous {
                lower: 0.0,
                upper: None,
            },
            "y",
        );
        // y >= 10 - 8x: choosing x = 1 relaxes y; objective 5x + y
        backend.add_constraint(LinearConstraint::greater_or_equal(
            LinearExpr::variable(y).plus(x, 8.0),
            10.0,
        ));
        backend.set_objective(LinearExpr::variable(y).plus(x, 5.0));

        assert_eq!(backend.solve(&SolverOptions::default()), SolveStatus::Optimal);
        assert_abs_diff_eq!(backend.value(x), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(backend.value(y), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn reports_infeasible_program() {
        let mut backend = GoodLpBackend::new();
        let x = backend.add_variable(
            VariableKind::Continuous {
                lower: 0.0,
                upper: Some(1.0),
            },
            "x",
        );
        backend.add_constraint(LinearConstraint::greater_or_equal(
            LinearExpr::variable(x),
            2.0,
        ));
        backend.set_objective(LinearExpr::variable(x));

        assert_eq!(
            backend.solve(&SolverOptions::default()),
            SolveStatus::Infeasible
        );
    }
}
