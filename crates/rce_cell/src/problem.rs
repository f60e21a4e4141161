//! The validated work cell model consumed by the schedule optimizer.
//!
//! A [`Problem`] is only ever produced by [`crate::validate`]; once built it
//! is immutable. Activities are owned by their robot's ordered sequence and
//! neighbor relations are positional (index ± 1), so there are no cyclic
//! references to manage.

use std::collections::HashMap;

use rce_geometry::Point3D;
use serde::{Deserialize, Serialize};
use typed_floats::StrictlyPositiveFinite;

use crate::{profile::EnergyProfile, skip_ratio::SkipRatio};

pub type ActivityId = String;

/// The three kinds of robot activity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ActivityType {
    Work,
    Movement,
    Idle,
}

/// Work: a fixed-duration task contributing no energy to the objective.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkActivity {
    pub duration: f64,
    pub fixed_start_time: Option<f64>,
    pub fixed_end_time: Option<f64>,
}

/// Movement: bounded duration with a piecewise-linear energy envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementActivity {
    pub min_duration: f64,
    pub max_duration: f64,
    pub fixed_start_time: Option<f64>,
    pub fixed_end_time: Option<f64>,
    pub profile: EnergyProfile,
}

/// Idle: a stationary hold with an affine power rate.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleActivity {
    pub min_duration: f64,
    pub max_duration: f64,
    pub profile: EnergyProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityKind {
    Work(WorkActivity),
    Movement(MovementActivity),
    Idle(IdleActivity),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: ActivityId,
    pub kind: ActivityKind,
}

impl Activity {
    pub const fn activity_type(&self) -> ActivityType {
        match self.kind {
            ActivityKind::Work(_) => ActivityType::Work,
            ActivityKind::Movement(_) => ActivityType::Movement,
            ActivityKind::Idle(_) => ActivityType::Idle,
        }
    }

    /// The envelope of a movement or idle activity; work has none.
    pub const fn profile(&self) -> Option<&EnergyProfile> {
        match &self.kind {
            ActivityKind::Work(_) => None,
            ActivityKind::Movement(movement) => Some(&movement.profile),
            ActivityKind::Idle(idle) => Some(&idle.profile),
        }
    }

    pub fn fixed_start_time(&self) -> Option<f64> {
        match &self.kind {
            ActivityKind::Work(work) => work.fixed_start_time,
            ActivityKind::Movement(movement) => movement.fixed_start_time,
            ActivityKind::Idle(_) => None,
        }
    }

    pub fn fixed_end_time(&self) -> Option<f64> {
        match &self.kind {
            ActivityKind::Work(work) => work.fixed_end_time,
            ActivityKind::Movement(movement) => movement.fixed_end_time,
            ActivityKind::Idle(_) => None,
        }
    }
}

/// A robot and its ordered, non-empty activity sequence.
#[derive(Debug, Clone)]
pub struct Robot {
    pub id: String,
    /// Axis position in millimeters.
    pub axis: Point3D,
    /// Weight in kilograms.
    pub weight: f64,
    /// Maximum reach in millimeters.
    pub maximum_reach: f64,
    pub activities: Vec<Activity>,
}

impl Robot {
    pub fn first(&self) -> &Activity {
        &self.activities[0]
    }

    pub fn last(&self) -> &Activity {
        &self.activities[self.activities.len() - 1]
    }

    pub fn is_first(&self, index: usize) -> bool {
        index == 0
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.activities.len()
    }

    pub fn prev(&self, index: usize) -> Option<&Activity> {
        index.checked_sub(1).map(|i| &self.activities[i])
    }

    pub fn next(&self, index: usize) -> Option<&Activity> {
        self.activities.get(index + 1)
    }
}

/// Position of an activity inside the problem: robot index and index within
/// the robot's sequence, both in declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityRef {
    pub robot: usize,
    pub index: usize,
}

/// A relative constraint between the start times of two activities:
/// `start(a) + min_offset <= start(b)` and `start(a) + max_offset >= start(b)`
/// for whichever bounds are present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOffset {
    pub a: ActivityRef,
    pub b: ActivityRef,
    pub min_offset: Option<f64>,
    pub max_offset: Option<f64>,
}

/// A mutual exclusion between two activities on different robots, extended
/// over the given fractions of `b`'s neighbors. Resolution order is left to
/// a binary decision in the schedule model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub a: ActivityRef,
    pub b: ActivityRef,
    pub b_prev_skip_ratio: SkipRatio,
    pub b_next_skip_ratio: SkipRatio,
}

/// The validated optimization problem.
#[derive(Debug, Clone)]
pub struct Problem {
    cycle_time: StrictlyPositiveFinite<f64>,
    robots: Vec<Robot>,
    time_offsets: Vec<TimeOffset>,
    collisions: Vec<Collision>,
    activity_refs: HashMap<ActivityId, ActivityRef>,
}

impl Problem {
    /// Assembles a problem from already-validated parts. Internal to the
    /// crate; [`crate::validate::build_problem`] is the public entry.
    pub(crate) fn from_parts(
        cycle_time: StrictlyPositiveFinite<f64>,
        robots: Vec<Robot>,
        time_offsets: Vec<TimeOffset>,
        collisions: Vec<Collision>,
        activity_refs: HashMap<ActivityId, ActivityRef>,
    ) -> Self {
        Self {
            cycle_time,
            robots,
            time_offsets,
            collisions,
            activity_refs,
        }
    }

    pub fn cycle_time(&self) -> f64 {
        self.cycle_time.get()
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn time_offsets(&self) -> &[TimeOffset] {
        &self.time_offsets
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    pub fn activity(&self, at: ActivityRef) -> &Activity {
        &self.robots[at.robot].activities[at.index]
    }

    pub fn robot(&self, at: ActivityRef) -> &Robot {
        &self.robots[at.robot]
    }

    pub fn resolve(&self, id: &str) -> Option<ActivityRef> {
        self.activity_refs.get(id).copied()
    }

    /// All activities with their positions, robots in declared order and
    /// activities in sequence order within each robot.
    pub fn iter_activities(&self) -> impl Iterator<Item = (ActivityRef, &Activity)> {
        self.robots.iter().enumerate().flat_map(|(robot, r)| {
            r.activities
                .iter()
                .enumerate()
                .map(move |(index, activity)| (ActivityRef { robot, index }, activity))
        })
    }
}
