//! The materialized schedule produced by an optimal solve.

use rce_cell::ActivityType;
use rce_geometry::Line2D;
use serde::{Deserialize, Serialize};

/// One scheduled activity: its time window, the energy the schedule assigns
/// to it, and the envelope lines that were active at the optimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySolution {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub start_time: f64,
    pub duration: f64,
    pub end_time: f64,
    pub energy: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub energy_profile: Vec<Line2D>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSolution {
    pub id: String,
    pub activities: Vec<ActivitySolution>,
}

/// Resolution of one collision exclusion: which of the two activities the
/// schedule placed first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionResolution {
    pub a_id: String,
    pub b_id: String,
    pub a_before_b: bool,
}

/// An energy-minimal cyclic schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSolution {
    pub cycle_time: f64,
    pub robots: Vec<RobotSolution>,
    /// Total energy per cycle, the optimized objective.
    pub energy: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<CollisionResolution>,
}

impl CellSolution {
    /// Looks up an activity record by id.
    pub fn activity(&self, id: &str) -> Option<&ActivitySolution> {
        self.robots
            .iter()
            .flat_map(|robot| robot.activities.iter())
            .find(|activity| activity.id == id)
    }
}
