//! The MILP formulation of the cyclic scheduling problem.
//!
//! Decision variables per activity: start time `t_s` in `[0, 2T]`, duration
//! `d >= 0` and energy `E >= 0`; per collision exclusion one binary
//! indicator choosing the resolution order. The big-M constant of the
//! collision disjunction is `2T`, sufficient because start times are capped
//! at `2T`.
//!
//! A model is built from a [`Problem`] exactly once and consumed by
//! [`CellModel::solve`]; re-solving needs a fresh build.

use itertools::Itertools;
use rce_cell::{ActivityKind, ActivityRef, Problem};
use tracing::{debug, info};

use crate::{
    backend::{MilpBackend, SolveStatus, SolverOptions, VariableKind},
    good_lp_backend::GoodLpBackend,
    linear::{LinearConstraint, LinearExpr, VarId},
    solution::{ActivitySolution, CellSolution, CollisionResolution, RobotSolution},
};

/// An envelope line counts as active when its value at the scheduled
/// duration is this close to the assigned energy.
const ACTIVE_LINE_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
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

#[derive(Debug, Clone, Copy)]
struct ActivityVars {
    start_time: VarId,
    duration: VarId,
    energy: VarId,
}

pub struct CellModel<B: MilpBackend = GoodLpBackend> {
    backend: B,
    problem: Problem,
    activity_vars: Vec<Vec<ActivityVars>>,
    collision_vars: Vec<VarId>,
}

impl CellModel<GoodLpBackend> {
    /// Builds the model against the bundled `good_lp` backend.
    #[must_use]
    pub fn build(problem: Problem) -> Self {
        Self::build_with_backend(problem, GoodLpBackend::new())
    }
}

impl<B: MilpBackend> CellModel<B> {
    /// Creates every variable and constraint of the formulation. Emission
    /// order follows the declared order of robots, activities, offsets and
    /// collisions, so repeated builds of the same problem are identical.
    pub fn build_with_backend(problem: Problem, mut backend: B) -> Self {
        let cycle_time = problem.cycle_time();
        let big_m = 2.0 * cycle_time;

        let activity_vars: Vec<Vec<ActivityVars>> = problem
            .robots()
            .iter()
            .map(|robot| {
                robot
                    .activities
                    .iter()
                    .map(|activity| ActivityVars {
                        start_time: backend.add_variable(
                            VariableKind::Continuous {
                                lower: 0.0,
                                upper: Some(big_m),
                            },
                            &format!("start_time_{}", activity.id),
                        ),
                        duration: backend.add_variable(
                            VariableKind::Continuous {
                                lower: 0.0,
                                upper: None,
                            },
                            &format!("duration_{}", activity.id),
                        ),
                        energy: backend.add_variable(
                            VariableKind::Continuous {
                                lower: 0.0,
                                upper: None,
                            },
                            &format!("energy_{}", activity.id),
                        ),
                    })
                    .collect()
            })
            .collect();

        for (robot_index, robot) in problem.robots().iter().enumerate() {
            let vars = &activity_vars[robot_index];

            // the cycle is closed: the first activity starts the cycle, the
            // last ends it, and the sequence is contiguous in between
            backend.add_constraint(LinearConstraint::equal(
                LinearExpr::variable(vars[0].start_time),
                0.0,
            ));
            let last = vars[vars.len() - 1];
            backend.add_constraint(LinearConstraint::equal(
                LinearExpr::variable(last.start_time).plus(last.duration, 1.0),
                cycle_time,
            ));
            for (i, j) in (0..vars.len()).tuple_windows() {
                backend.add_constraint(LinearConstraint::equal(
                    LinearExpr::variable(vars[i].start_time)
                        .plus(vars[i].duration, 1.0)
                        .plus(vars[j].start_time, -1.0),
                    0.0,
                ));
            }

            for (activity, vars) in robot.activities.iter().zip(vars) {
                emit_activity_constraints(&mut backend, activity, *vars);
            }
        }

        for offset in problem.time_offsets() {
            let a = activity_vars[offset.a.robot][offset.a.index];
            let b = activity_vars[offset.b.robot][offset.b.index];
            if let Some(min) = offset.min_offset {
                // t_s(a) + min <= t_s(b)
                backend.add_constraint(LinearConstraint::less_or_equal(
                    LinearExpr::variable(a.start_time).minus(b.start_time),
                    -min,
                ));
            }
            if let Some(max) = offset.max_offset {
                // t_s(a) + max >= t_s(b)
                backend.add_constraint(LinearConstraint::greater_or_equal(
                    LinearExpr::variable(a.start_time).minus(b.start_time),
                    -max,
                ));
            }
        }

        let collision_vars: Vec<VarId> = problem
            .collisions()
            .iter()
            .map(|collision| {
                let a = activity_vars[collision.a.robot][collision.a.index];
                let b = activity_vars[collision.b.robot][collision.b.index];
                let a_id = &problem.activity(collision.a).id;
                let b_id = &problem.activity(collision.b).id;
                let x = backend.add_variable(VariableKind::Binary, &format!("x_{a_id}_{b_id}"));

                let neighbor_duration = |at: ActivityRef, step: isize| -> Option<VarId> {
                    let index = at.index.checked_add_signed(step)?;
                    activity_vars[at.robot].get(index).map(|vars| vars.duration)
                };

                // x = 1: a (plus the covered tail of b's predecessor) ends
                // before b starts
                let mut before = LinearExpr::variable(a.start_time)
                    .plus(a.duration, 1.0)
                    .plus(x, big_m)
                    .minus(b.start_time);
                let prev_ratio = collision.b_prev_skip_ratio.get();
                if prev_ratio > 0.0 {
                    if let Some(prev_duration) = neighbor_duration(collision.b, -1) {
                        before.push(prev_duration, prev_ratio);
                    }
                }
                backend.add_constraint(LinearConstraint::less_or_equal(before, big_m));

                // x = 0: b (plus the covered head of b's successor) ends
                // before a starts
                let mut after = LinearExpr::variable(b.start_time)
                    .plus(b.duration, 1.0)
                    .plus(x, -big_m)
                    .minus(a.start_time);
                let next_ratio = collision.b_next_skip_ratio.get();
                if next_ratio > 0.0 {
                    if let Some(next_duration) = neighbor_duration(collision.b, 1) {
                        after.push(next_duration, next_ratio);
                    }
                }
                backend.add_constraint(LinearConstraint::less_or_equal(after, 0.0));

                x
            })
            .collect();

        let mut objective = LinearExpr::new();
        for vars in activity_vars.iter().flatten() {
            objective.push(vars.energy, 1.0);
        }
        backend.set_objective(objective);

        debug!(
            robots = problem.robots().len(),
            collisions = collision_vars.len(),
            "schedule model built"
        );

        Self {
            backend,
            problem,
            activity_vars,
            collision_vars,
        }
    }

    /// Runs the backend and materializes the schedule on an optimal
    /// outcome. Every other status is a typed failure without partial
    /// results.
    pub fn solve(mut self, options: &SolverOptions) -> Result<CellSolution, SolveError> {
        match self.backend.solve(options) {
            SolveStatus::Optimal => {
                let solution = self.extract();
                info!(energy = solution.energy, "optimal schedule found");
                Ok(solution)
            }
            SolveStatus::Infeasible => Err(SolveError::Infeasible),
            SolveStatus::Unbounded => Err(SolveError::Unbounded),
            SolveStatus::TimedOut => Err(SolveError::TimedOut),
            SolveStatus::Interrupted => Err(SolveError::Interrupted),
            SolveStatus::Error(message) => Err(SolveError::Solver(message)),
        }
    }

    fn extract(&self) -> CellSolution {
        let mut total_energy = 0.0;

        let robots = self
            .problem
            .robots()
            .iter()
            .enumerate()
            .map(|(robot_index, robot)| RobotSolution {
                id: robot.id.clone(),
                activities: robot
                    .activities
                    .iter()
                    .zip(&self.activity_vars[robot_index])
                    .map(|(activity, vars)| {
                        let start_time = self.backend.value(vars.start_time);
                        let duration = self.backend.value(vars.duration);
                        let energy = self.backend.value(vars.energy);
                        total_energy += energy;

                        let energy_profile = activity.profile().map_or_else(Vec::new, |profile| {
                            profile.active_lines_at(duration, energy, ACTIVE_LINE_TOLERANCE)
                        });

                        ActivitySolution {
                            id: activity.id.clone(),
                            activity_type: activity.activity_type(),
                            start_time,
                            duration,
                            end_time: start_time + duration,
                            energy,
                            energy_profile,
                        }
                    })
                    .collect(),
            })
            .collect();

        let collisions = self
            .problem
            .collisions()
            .iter()
            .zip(&self.collision_vars)
            .map(|(collision, &x)| CollisionResolution {
                a_id: self.problem.activity(collision.a).id.clone(),
                b_id: self.problem.activity(collision.b).id.clone(),
                a_before_b: self.backend.value(x) > 0.5,
            })
            .collect();

        CellSolution {
            cycle_time: self.problem.cycle_time(),
            robots,
            energy: total_energy,
            collisions,
        }
    }
}

fn emit_activity_constraints<B: MilpBackend>(
    backend: &mut B,
    activity: &rce_cell::Activity,
    vars: ActivityVars,
) {
    match &activity.kind {
        ActivityKind::Work(work) => {
            backend.add_constraint(LinearConstraint::equal(
                LinearExpr::variable(vars.duration),
                work.duration,
            ));
            // work contributes nothing to the objective
            backend.add_constraint(LinearConstraint::equal(
                LinearExpr::variable(vars.energy),
                0.0,
            ));
        }
        ActivityKind::Movement(movement) => {
            backend.add_constraint(LinearConstraint::greater_or_equal(
                LinearExpr::variable(vars.duration),
                movement.min_duration,
            ));
            backend.add_constraint(LinearConstraint::less_or_equal(
                LinearExpr::variable(vars.duration),
                movement.max_duration,
            ));
            emit_envelope(backend, &movement.profile, vars);
        }
        ActivityKind::Idle(idle) => {
            backend.add_constraint(LinearConstraint::greater_or_equal(
                LinearExpr::variable(vars.duration),
                idle.min_duration,
            ));
            backend.add_constraint(LinearConstraint::less_or_equal(
                LinearExpr::variable(vars.duration),
                idle.max_duration,
            ));
            emit_envelope(backend, &idle.profile, vars);
        }
    }

    if let Some(start) = activity.fixed_start_time() {
        backend.add_constraint(LinearConstraint::equal(
            LinearExpr::variable(vars.start_time),
            start,
        ));
    }
    if let Some(end) = activity.fixed_end_time() {
        backend.add_constraint(LinearConstraint::equal(
            LinearExpr::variable(vars.start_time).plus(vars.duration, 1.0),
            end,
        ));
    }
}

/// Lower-bounds the energy variable by every envelope line:
/// `E >= q * d + c`.
fn emit_envelope<B: MilpBackend>(
    backend: &mut B,
    profile: &rce_cell::EnergyProfile,
    vars: ActivityVars,
) {
    for line in profile.lines() {
        backend.add_constraint(LinearConstraint::greater_or_equal(
            LinearExpr::variable(vars.energy).plus(vars.duration, -line.q),
            line.c,
        ));
    }
}
