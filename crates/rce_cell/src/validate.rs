//! Input validation and problem assembly.
//!
//! [`validate`] enforces the semantic rules of the cell description and
//! short-circuits on the first violation. [`build_problem`] runs the same
//! checks and then assembles the immutable [`Problem`], attaching the
//! energy envelopes computed by the preprocessing stage.

use std::collections::HashMap;

use tracing::{debug, info};
use typed_floats::StrictlyPositiveFinite;

use crate::{
    description::{ActivityDescription, CellDescription},
    problem::{
        Activity, ActivityKind, ActivityRef, Collision, IdleActivity, MovementActivity, Problem,
        Robot, TimeOffset, WorkActivity,
    },
    profile::{EnergyProfileError, ResolvedProfiles},
};

/// The pin arithmetic check allows for rounding in user-supplied numbers.
const PIN_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInputError {
    #[error("cycle time {0} must be a positive finite number")]
    NonPositiveCycleTime(f64),
    #[error("robot id must not be empty")]
    EmptyRobotId,
    #[error("duplicate robot id \"{0}\"")]
    DuplicateRobotId(String),
    #[error("robot \"{0}\" has no activities")]
    NoActivities(String),
    #[error("robot \"{0}\" has an activity with an empty id")]
    EmptyActivityId(String),
    #[error("duplicate activity id \"{0}\"")]
    DuplicateActivityId(String),
    #[error("robot \"{0}\": axis position is not finite")]
    NonFiniteAxis(String),
    #[error("robot \"{id}\": weight {weight} must be a positive finite number")]
    InvalidWeight { id: String, weight: f64 },
    #[error("robot \"{id}\": maximum reach {reach} must be a positive finite number")]
    InvalidReach { id: String, reach: f64 },
    #[error("robot \"{id}\": min_activities_duration {value} must lie in [0, cycle_time]")]
    InvalidMinActivitiesDuration { id: String, value: f64 },
    #[error("activity \"{0}\": numeric input is not finite")]
    NonFiniteInput(String),
    #[error("work activity \"{id}\": duration {duration} must be in (0, cycle_time]")]
    WorkDurationOutOfRange { id: String, duration: f64 },
    #[error("movement \"{id}\": duration bounds [{min}, {max}] must satisfy 0 < min <= max")]
    InvalidMovementBounds { id: String, min: f64, max: f64 },
    #[error("idle \"{id}\": duration bounds [{min}, {max}] must satisfy 0 <= min <= max")]
    InvalidIdleBounds { id: String, min: f64, max: f64 },
    #[error("activity \"{id}\": pinned time {time} is outside [0, cycle_time]")]
    PinnedTimeOutOfRange { id: String, time: f64 },
    #[error(
        "work activity \"{id}\": fixed start {start} plus duration {duration} does not reach \
         fixed end {end}"
    )]
    InconsistentPins {
        id: String,
        start: f64,
        duration: f64,
        end: f64,
    },
    #[error("time offset references unknown activity \"{0}\"")]
    UnknownOffsetActivity(String),
    #[error("collision references unknown activity \"{0}\"")]
    UnknownCollisionActivity(String),
    #[error("collision between \"{a}\" and \"{b}\": both activities belong to robot \"{robot}\"")]
    CollisionOnSameRobot { a: String, b: String, robot: String },
    #[error("collision between \"{a}\" and \"{b}\": both are the first activity of their robot")]
    CollisionBetweenFirstActivities { a: String, b: String },
    #[error("collision between \"{a}\" and \"{b}\": both are the last activity of their robot")]
    CollisionBetweenLastActivities { a: String, b: String },
    #[error("activity \"{0}\": no energy profile was resolved")]
    MissingProfile(String),
    #[error("activity \"{id}\": invalid energy profile: {source}")]
    Profile {
        id: String,
        #[source]
        source: EnergyProfileError,
    },
}

/// Checks every semantic rule on the description, short-circuiting on the
/// first violation.
pub fn validate(cell: &CellDescription) -> Result<(), InvalidInputError> {
    debug!(
        robots = cell.robots.len(),
        time_offsets = cell.time_offsets.len(),
        collisions = cell.collisions.len(),
        "validating cell description"
    );

    if !cell.cycle_time.is_finite() || cell.cycle_time <= 0.0 {
        return Err(InvalidInputError::NonPositiveCycleTime(cell.cycle_time));
    }
    let cycle_time = cell.cycle_time;

    let mut robot_ids: HashMap<&str, ()> = HashMap::new();
    let mut refs: HashMap<&str, ActivityRef> = HashMap::new();

    for (robot_index, robot) in cell.robots.iter().enumerate() {
        if robot.id.is_empty() {
            return Err(InvalidInputError::EmptyRobotId);
        }
        if robot_ids.insert(&robot.id, ()).is_some() {
            return Err(InvalidInputError::DuplicateRobotId(robot.id.clone()));
        }
        if !robot.position.is_finite() {
            return Err(InvalidInputError::NonFiniteAxis(robot.id.clone()));
        }
        if !robot.weight.is_finite() || robot.weight <= 0.0 {
            return Err(InvalidInputError::InvalidWeight {
                id: robot.id.clone(),
                weight: robot.weight,
            });
        }
        if !robot.maximum_reach.is_finite() || robot.maximum_reach <= 0.0 {
            return Err(InvalidInputError::InvalidReach {
                id: robot.id.clone(),
                reach: robot.maximum_reach,
            });
        }
        if let Some(value) = robot.min_activities_duration {
            if !value.is_finite() || value < 0.0 || value > cycle_time {
                return Err(InvalidInputError::InvalidMinActivitiesDuration {
                    id: robot.id.clone(),
                    value,
                });
            }
        }
        if robot.activities.is_empty() {
            return Err(InvalidInputError::NoActivities(robot.id.clone()));
        }

        for (index, activity) in robot.activities.iter().enumerate() {
            if activity.id().is_empty() {
                return Err(InvalidInputError::EmptyActivityId(robot.id.clone()));
            }
            let at = ActivityRef {
                robot: robot_index,
                index,
            };
            if refs.insert(activity.id(), at).is_some() {
                return Err(InvalidInputError::DuplicateActivityId(
                    activity.id().to_owned(),
                ));
            }
            validate_activity(activity, cycle_time)?;
        }
    }

    for offset in &cell.time_offsets {
        for id in [&offset.a_id, &offset.b_id] {
            if !refs.contains_key(id.as_str()) {
                return Err(InvalidInputError::UnknownOffsetActivity(id.clone()));
            }
        }
    }

    for collision in &cell.collisions {
        let a = *refs.get(collision.a_id.as_str()).ok_or_else(|| {
            InvalidInputError::UnknownCollisionActivity(collision.a_id.clone())
        })?;
        let b = *refs.get(collision.b_id.as_str()).ok_or_else(|| {
            InvalidInputError::UnknownCollisionActivity(collision.b_id.clone())
        })?;
        if a.robot == b.robot {
            return Err(InvalidInputError::CollisionOnSameRobot {
                a: collision.a_id.clone(),
                b: collision.b_id.clone(),
                robot: cell.robots[a.robot].id.clone(),
            });
        }
        if a.index == 0 && b.index == 0 {
            return Err(InvalidInputError::CollisionBetweenFirstActivities {
                a: collision.a_id.clone(),
                b: collision.b_id.clone(),
            });
        }
        let a_is_last = a.index + 1 == cell.robots[a.robot].activities.len();
        let b_is_last = b.index + 1 == cell.robots[b.robot].activities.len();
        if a_is_last && b_is_last {
            return Err(InvalidInputError::CollisionBetweenLastActivities {
                a: collision.a_id.clone(),
                b: collision.b_id.clone(),
            });
        }
    }

    Ok(())
}

fn validate_activity(
    activity: &ActivityDescription,
    cycle_time: f64,
) -> Result<(), InvalidInputError> {
    let id = activity.id();

    let check_finite = |values: &[Option<f64>]| -> Result<(), InvalidInputError> {
        if values.iter().flatten().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(InvalidInputError::NonFiniteInput(id.to_owned()))
        }
    };

    let check_pin = |pin: Option<f64>| -> Result<(), InvalidInputError> {
        match pin {
            Some(time) if !(0.0..=cycle_time).contains(&time) => {
                Err(InvalidInputError::PinnedTimeOutOfRange {
                    id: id.to_owned(),
                    time,
                })
            }
            _ => Ok(()),
        }
    };

    match activity {
        ActivityDescription::Work {
            duration,
            fixed_start_time,
            fixed_end_time,
            ..
        } => {
            check_finite(&[Some(*duration), *fixed_start_time, *fixed_end_time])?;
            if *duration <= 0.0 || *duration > cycle_time {
                return Err(InvalidInputError::WorkDurationOutOfRange {
                    id: id.to_owned(),
                    duration: *duration,
                });
            }
            check_pin(*fixed_start_time)?;
            check_pin(*fixed_end_time)?;
            if let (Some(start), Some(end)) = (fixed_start_time, fixed_end_time) {
                if (start + duration - end).abs() > PIN_TOLERANCE {
                    return Err(InvalidInputError::InconsistentPins {
                        id: id.to_owned(),
                        start: *start,
                        duration: *duration,
                        end: *end,
                    });
                }
            }
        }
        ActivityDescription::Movement {
            min_duration,
            max_duration,
            fixed_start_time,
            fixed_end_time,
            start,
            end,
            payload_weight,
            ..
        } => {
            check_finite(&[
                *min_duration,
                *max_duration,
                *fixed_start_time,
                *fixed_end_time,
                Some(*payload_weight),
            ])?;
            if !start.is_finite() || !end.is_finite() {
                return Err(InvalidInputError::NonFiniteInput(id.to_owned()));
            }
            if let (Some(min), Some(max)) = (min_duration, max_duration) {
                if *min <= 0.0 || min > max {
                    return Err(InvalidInputError::InvalidMovementBounds {
                        id: id.to_owned(),
                        min: *min,
                        max: *max,
                    });
                }
            }
            check_pin(*fixed_start_time)?;
            check_pin(*fixed_end_time)?;
        }
        ActivityDescription::Idle {
            min_duration,
            max_duration,
            position,
            payload_weight,
            given_consumption,
            ..
        } => {
            check_finite(&[
                *min_duration,
                *max_duration,
                Some(*payload_weight),
                *given_consumption,
            ])?;
            if !position.is_finite() {
                return Err(InvalidInputError::NonFiniteInput(id.to_owned()));
            }
            if let (Some(min), Some(max)) = (min_duration, max_duration) {
                if *min < 0.0 || min > max {
                    return Err(InvalidInputError::InvalidIdleBounds {
                        id: id.to_owned(),
                        min: *min,
                        max: *max,
                    });
                }
            }
        }
    }

    Ok(())
}

/// Validates the description and assembles the [`Problem`], attaching the
/// resolved energy envelopes. Movement duration bounds come from the
/// resolved profiles (the preprocessing stage fills bounds the description
/// leaves out); idle bounds default to `[0, cycle_time -
/// min_activities_duration]`, falling back to the sum of the other
/// activities' minimum durations when the robot does not declare one.
pub fn build_problem(
    cell: &CellDescription,
    profiles: &ResolvedProfiles,
) -> Result<Problem, InvalidInputError> {
    validate(cell)?;

    let cycle_time = StrictlyPositiveFinite::<f64>::new(cell.cycle_time)
        .map_err(|_| InvalidInputError::NonPositiveCycleTime(cell.cycle_time))?;

    let mut robots = Vec::with_capacity(cell.robots.len());
    let mut activity_refs = HashMap::new();

    for (robot_index, robot) in cell.robots.iter().enumerate() {
        let mut activities = Vec::with_capacity(robot.activities.len());
        for (index, activity) in robot.activities.iter().enumerate() {
            activity_refs.insert(
                activity.id().to_owned(),
                ActivityRef {
                    robot: robot_index,
                    index,
                },
            );
            activities.push(build_activity(activity, robot, cell.cycle_time, profiles)?);
        }
        robots.push(Robot {
            id: robot.id.clone(),
            axis: robot.position,
            weight: robot.weight,
            maximum_reach: robot.maximum_reach,
            activities,
        });
    }

    let resolve = |id: &str, missing: fn(String) -> InvalidInputError| {
        activity_refs
            .get(id)
            .copied()
            .ok_or_else(|| missing(id.to_owned()))
    };

    let time_offsets = cell
        .time_offsets
        .iter()
        .map(|offset| {
            Ok(TimeOffset {
                a: resolve(&offset.a_id, InvalidInputError::UnknownOffsetActivity)?,
                b: resolve(&offset.b_id, InvalidInputError::UnknownOffsetActivity)?,
                min_offset: offset.min_offset,
                max_offset: offset.max_offset,
            })
        })
        .collect::<Result<Vec<_>, InvalidInputError>>()?;

    let collisions = cell
        .collisions
        .iter()
        .map(|collision| {
            Ok(Collision {
                a: resolve(&collision.a_id, InvalidInputError::UnknownCollisionActivity)?,
                b: resolve(&collision.b_id, InvalidInputError::UnknownCollisionActivity)?,
                b_prev_skip_ratio: collision.b_prev_skip_ratio,
                b_next_skip_ratio: collision.b_next_skip_ratio,
            })
        })
        .collect::<Result<Vec<_>, InvalidInputError>>()?;

    let problem = Problem::from_parts(cycle_time, robots, time_offsets, collisions, activity_refs);
    info!(
        robots = problem.robots().len(),
        activities = problem.iter_activities().count(),
        "assembled optimization problem"
    );
    Ok(problem)
}

fn build_activity(
    activity: &ActivityDescription,
    robot: &crate::description::RobotDescription,
    cycle_time: f64,
    profiles: &ResolvedProfiles,
) -> Result<Activity, InvalidInputError> {
    let id = activity.id().to_owned();
    let kind = match activity {
        ActivityDescription::Work {
            duration,
            fixed_start_time,
            fixed_end_time,
            ..
        } => ActivityKind::Work(WorkActivity {
            duration: *duration,
            fixed_start_time: *fixed_start_time,
            fixed_end_time: *fixed_end_time,
        }),
        ActivityDescription::Movement {
            fixed_start_time,
            fixed_end_time,
            ..
        } => {
            let resolved = profiles
                .movement(&id)
                .ok_or_else(|| InvalidInputError::MissingProfile(id.clone()))?;
            if resolved.min_duration <= 0.0 || resolved.min_duration > resolved.max_duration {
                return Err(InvalidInputError::InvalidMovementBounds {
                    id: id.clone(),
                    min: resolved.min_duration,
                    max: resolved.max_duration,
                });
            }
            ActivityKind::Movement(MovementActivity {
                min_duration: resolved.min_duration,
                max_duration: resolved.max_duration,
                fixed_start_time: *fixed_start_time,
                fixed_end_time: *fixed_end_time,
                profile: resolved.profile.clone(),
            })
        }
        ActivityDescription::Idle {
            min_duration,
            max_duration,
            ..
        } => {
            let profile = profiles
                .idle(&id)
                .ok_or_else(|| InvalidInputError::MissingProfile(id.clone()))?
                .clone();
            let min = min_duration.unwrap_or(0.0);
            let max = max_duration.unwrap_or_else(|| {
                let reserved = robot.min_activities_duration.unwrap_or_else(|| {
                    robot
                        .activities
                        .iter()
                        .filter(|other| other.id() != id)
                        .map(ActivityDescription::declared_min_duration)
                        .sum()
                });
                (cycle_time - reserved).max(0.0)
            });
            ActivityKind::Idle(IdleActivity {
                min_duration: min,
                max_duration: max,
                profile,
            })
        }
    };

    Ok(Activity { id, kind })
}
