//! Serde model of the work cell description.
//!
//! This is the wire shape collaborators hand to the optimizer. Field names
//! and defaults follow the cell description format: a cycle time, robots
//! with ordered activity lists, optional relative time offsets and optional
//! pairwise collision exclusions. Parsing performs shape checks only; the
//! semantic rules live in [`crate::validate`].

use rce_geometry::{Line2D, Point3D};
use serde::{Deserialize, Serialize};

use crate::skip_ratio::SkipRatio;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellDescription {
    pub cycle_time: f64,
    pub robots: Vec<RobotDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_offsets: Vec<TimeOffsetDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<CollisionDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotDescription {
    pub id: String,
    /// Axis position in millimeters.
    pub position: Point3D,
    /// Robot weight in kilograms.
    pub weight: f64,
    /// Maximum reach in millimeters.
    pub maximum_reach: f64,
    /// Lower bound on the summed duration of the robot's non-idle
    /// activities; bounds the default maximum of unspecified idle windows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_activities_duration: Option<f64>,
    pub activities: Vec<ActivityDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActivityDescription {
    #[serde(rename = "WORK")]
    Work {
        id: String,
        duration: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fixed_start_time: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fixed_end_time: Option<f64>,
    },
    #[serde(rename = "MOVEMENT")]
    Movement {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_duration: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_duration: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fixed_start_time: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fixed_end_time: Option<f64>,
        start: Point3D,
        end: Point3D,
        #[serde(default)]
        payload_weight: f64,
        /// Explicit envelope lines; when present the estimator is bypassed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        given_lines: Option<Vec<Line2D>>,
    },
    #[serde(rename = "IDLE")]
    Idle {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_duration: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_duration: Option<f64>,
        position: Point3D,
        #[serde(default)]
        payload_weight: f64,
        /// Explicit idle power rate; when present the estimator is bypassed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        given_consumption: Option<f64>,
    },
}

impl ActivityDescription {
    pub fn id(&self) -> &str {
        match self {
            Self::Work { id, .. } | Self::Movement { id, .. } | Self::Idle { id, .. } => id,
        }
    }

    pub const fn is_movement(&self) -> bool {
        matches!(self, Self::Movement { .. })
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle { .. })
    }

    /// The activity's declared minimum duration: the fixed duration of work,
    /// the minimum of a movement (when given) and the minimum of an idle
    /// window (0 when unspecified).
    pub fn declared_min_duration(&self) -> f64 {
        match self {
            Self::Work { duration, .. } => *duration,
            Self::Movement { min_duration, .. } => min_duration.unwrap_or(0.0),
            Self::Idle { min_duration, .. } => min_duration.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeOffsetDescription {
    pub a_id: String,
    pub b_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_offset: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollisionDescription {
    pub a_id: String,
    pub b_id: String,
    #[serde(default)]
    pub b_prev_skip_ratio: SkipRatio,
    #[serde(default)]
    pub b_next_skip_ratio: SkipRatio,
}
