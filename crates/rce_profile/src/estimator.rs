//! Energy profile estimation.
//!
//! Movements get a V-shaped piecewise-linear lower envelope over their
//! duration window: expensive when rushed at the minimum duration, free
//! around the estimated optimal duration, expensive again when stretched to
//! the maximum (slow joint motion keeps the drives powered longer). Idling
//! gets an affine power rate. Both models are products of small calibrated
//! factors; see [`crate::params`].

use rce_cell::{
    description::{ActivityDescription, CellDescription, RobotDescription},
    profile::{EnergyProfile, EnergyProfileError, MovementProfile, ResolvedProfiles},
};
use rce_geometry::{Line2D, Point2D, Point3D};
use tracing::debug;

use crate::{
    movement::{DirectionRatios, Movement, MovementError},
    params::{EnergyProfileParameters, PerDirection, RegimeParams},
};

/// Conservative duration window used when a movement does not declare its
/// bounds, scaled by the relative weight of arm and payload.
const FALLBACK_DURATION_WINDOW: (f64, f64) = (1.0, 10.0);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("movement \"{id}\": {source}")]
    Movement {
        id: String,
        #[source]
        source: MovementError,
    },
    #[error("movement \"{id}\": no duration bounds given and no estimate available")]
    MissingDurationBounds { id: String },
    #[error("activity \"{id}\": invalid energy profile: {source}")]
    Envelope {
        id: String,
        #[source]
        source: EnergyProfileError,
    },
}

/// Estimator of energy profiles for movements and idling.
///
/// Holds the merged parameter set; construct with custom parameters or use
/// the calibrated defaults.
#[derive(Debug, Clone, Default)]
pub struct EnergyProfileEstimator {
    parameters: EnergyProfileParameters,
}

impl EnergyProfileEstimator {
    #[must_use]
    pub const fn new(parameters: EnergyProfileParameters) -> Self {
        Self { parameters }
    }

    pub const fn parameters(&self) -> &EnergyProfileParameters {
        &self.parameters
    }

    /// Piecewise linearization of the movement's energy over its duration
    /// window `[min_duration, max_duration]`.
    ///
    /// The regular shape is three lines: falling into the flat floor around
    /// the estimated optimal duration, the floor itself, and rising towards
    /// the maximum duration. When the corner placement collapses the shape
    /// degrades to a two-line V with the corner at the window midpoint, and
    /// for a window of zero width to a single constant line.
    pub fn estimate_movement(
        &self,
        movement: &Movement,
        min_duration: f64,
        max_duration: f64,
    ) -> Vec<Line2D> {
        let ratios = movement.direction_ratios();

        let min_energy =
            regime_energy(&self.parameters.movement.min_duration, movement, &ratios);
        let max_energy =
            regime_energy(&self.parameters.movement.max_duration, movement, &ratios);

        let opt = &self.parameters.movement.opt_duration;
        let opt_ratio = regime_energy(&opt.regime, movement, &ratios);
        let opt_duration = min_duration * opt_ratio;

        let left = f64::max(
            opt.left_dur_shift * opt_duration,
            opt.min_left_dur_ratio * min_duration,
        );
        let right = f64::max(
            opt.right_dur_shift * opt_duration,
            opt.min_right_dur_ratio * min_duration,
        );

        debug!(
            min_duration,
            max_duration, opt_duration, left, right, "movement envelope corners"
        );

        if min_duration < left && left <= right && right < max_duration {
            let falling = Line2D::through(
                Point2D::new(min_duration, min_energy),
                Point2D::new(left, 0.0),
            );
            let rising = Line2D::through(
                Point2D::new(right, 0.0),
                Point2D::new(max_duration, max_energy),
            );
            if let (Ok(falling), Ok(rising)) = (falling, rising) {
                // the floor between the corners is the zero line
                return vec![falling, Line2D::new(0.0, 0.0), rising];
            }
        }

        // collapsed corners: a two-line V with the corner at the midpoint
        let mid = (min_duration + max_duration) / 2.0;
        let falling = Line2D::through(
            Point2D::new(min_duration, min_energy),
            Point2D::new(mid, 0.0),
        );
        let rising = Line2D::through(
            Point2D::new(mid, 0.0),
            Point2D::new(max_duration, max_energy),
        );
        if let (Ok(falling), Ok(rising)) = (falling, rising) {
            return vec![falling, rising];
        }

        // zero-width window: the duration is fixed, a constant bound remains
        vec![Line2D::new(0.0, min_energy)]
    }

    /// Affine idle power rate at `point` for a robot with its axis at
    /// `axis`: `base * dist_coef(d) * height_coef(h)` with `d` the
    /// horizontal distance from the axis and `h` the hold height.
    pub fn estimate_idling(&self, point: Point3D, axis: Point3D) -> Line2D {
        let distance = axis.xy().distance_to(point.xy());
        let idling = &self.parameters.idling;
        let rate =
            idling.base * idling.dist_coef.eval(distance) * idling.height_coef.eval(point.z);
        Line2D::new(rate, 0.0)
    }

    /// Conservative duration window for a movement without declared bounds,
    /// widened with the relative weight of arm and payload.
    pub fn estimate_duration_window(
        &self,
        robot_weight: f64,
        payload_weight: f64,
    ) -> Option<(f64, f64)> {
        let common = &self.parameters.common;
        let relative_weight =
            robot_weight * common.robot_weight_coef + payload_weight * common.payload_weight_coef;
        if !relative_weight.is_finite() || relative_weight <= 0.0 {
            return None;
        }
        let (min, max) = FALLBACK_DURATION_WINDOW;
        Some((min * relative_weight, max * relative_weight))
    }

    /// Resolves the envelope (and, for movements, the duration window) of
    /// every movement and idle activity in the cell. Explicit `given_lines`
    /// and `given_consumption` bypass the estimation.
    pub fn resolve_profiles(
        &self,
        cell: &CellDescription,
    ) -> Result<ResolvedProfiles, ProfileError> {
        let mut profiles = ResolvedProfiles::new();

        for robot in &cell.robots {
            for activity in &robot.activities {
                match activity {
                    ActivityDescription::Work { .. } => {}
                    ActivityDescription::Movement { id, .. } => {
                        let resolved = self.resolve_movement(robot, activity, id)?;
                        profiles.insert_movement(id.clone(), resolved);
                    }
                    ActivityDescription::Idle {
                        id,
                        position,
                        given_consumption,
                        ..
                    } => {
                        let line = given_consumption.map_or_else(
                            || self.estimate_idling(*position, robot.position),
                            |rate| Line2D::new(rate, 0.0),
                        );
                        let profile = EnergyProfile::single(line).map_err(|source| {
                            ProfileError::Envelope {
                                id: id.clone(),
                                source,
                            }
                        })?;
                        profiles.insert_idle(id.clone(), profile);
                    }
                }
            }
        }

        Ok(profiles)
    }

    fn resolve_movement(
        &self,
        robot: &RobotDescription,
        activity: &ActivityDescription,
        id: &str,
    ) -> Result<MovementProfile, ProfileError> {
        let ActivityDescription::Movement {
            min_duration,
            max_duration,
            start,
            end,
            payload_weight,
            given_lines,
            ..
        } = activity
        else {
            unreachable!("caller matched a movement");
        };

        let (min_duration, max_duration) = match (*min_duration, *max_duration) {
            (Some(min), Some(max)) => (min, max),
            (given_min, given_max) => {
                let (fallback_min, fallback_max) = self
                    .estimate_duration_window(robot.weight, *payload_weight)
                    .ok_or_else(|| ProfileError::MissingDurationBounds { id: id.to_owned() })?;
                let min = given_min.unwrap_or(fallback_min);
                let max = given_max.unwrap_or(f64::max(fallback_max, min));
                (min, max)
            }
        };

        let lines = match given_lines {
            Some(lines) => lines.clone(),
            None => {
                let movement = Movement::new(*start, *end, *payload_weight, robot.position)
                    .map_err(|source| ProfileError::Movement {
                        id: id.to_owned(),
                        source,
                    })?;
                self.estimate_movement(&movement, min_duration, max_duration)
            }
        };

        let profile =
            EnergyProfile::new(lines).map_err(|source| ProfileError::Envelope {
                id: id.to_owned(),
                source,
            })?;

        Ok(MovementProfile {
            profile,
            min_duration,
            max_duration,
        })
    }
}

/// The product of the five regime factors: base, direction type, length,
/// average distance from axis and average height.
fn regime_energy(params: &RegimeParams, movement: &Movement, ratios: &DirectionRatios) -> f64 {
    let type_factor = direction_norm(&params.type_factor, ratios, |factor| factor);
    let length = movement.length();
    let length_factor = direction_norm(&params.length_coef, ratios, |quad| quad.eval(length));
    let avg_dist = movement.avg_distance_from_axis();
    let avg_dist_factor = direction_norm(&params.avg_dist_coef, ratios, |quad| quad.eval(avg_dist));
    let avg_height = movement.avg_height();
    let avg_height_factor =
        direction_norm(&params.avg_height_coef, ratios, |quad| quad.eval(avg_height));

    params.base * type_factor * length_factor * avg_dist_factor * avg_height_factor
}

/// `sqrt(sum((ratio_t * value_t)^2))` over the five direction components.
fn direction_norm<T: Copy>(
    values: &PerDirection<T>,
    ratios: &DirectionRatios,
    value: impl Fn(T) -> f64,
) -> f64 {
    let terms = [
        (ratios.side, value(values.side)),
        (ratios.into_dist, value(values.into_dist)),
        (ratios.from_afar, value(values.from_afar)),
        (ratios.up, value(values.up)),
        (ratios.down, value(values.down)),
    ];
    terms
        .iter()
        .map(|(ratio, value)| (ratio * value).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rce_cell::description::{ActivityDescription, CellDescription, RobotDescription};

    use super::*;
    use crate::params::QuadCoefs;

    const AXIS: Point3D = Point3D::new(0.0, 0.0, 0.0);

    fn side_movement() -> Movement {
        Movement::new(
            Point3D::new(1000.0, -500.0, 0.0),
            Point3D::new(1000.0, 500.0, 0.0),
            0.0,
            AXIS,
        )
        .expect("valid movement")
    }

    /// A regime whose five factors collapse to `energy` for any movement
    /// with a single dominant direction.
    fn flat_regime(energy: f64) -> RegimeParams {
        let unit_quad = QuadCoefs::new(0.0, 0.0, 1.0);
        let units = PerDirection {
            side: unit_quad,
            into_dist: unit_quad,
            from_afar: unit_quad,
            up: unit_quad,
            down: unit_quad,
        };
        RegimeParams {
            base: energy,
            type_factor: PerDirection {
                side: 1.0,
                into_dist: 1.0,
                from_afar: 1.0,
                up: 1.0,
                down: 1.0,
            },
            length_coef: units,
            avg_dist_coef: units,
            avg_height_coef: units,
        }
    }

    fn flat_estimator(min: f64, opt: f64, max: f64) -> EnergyProfileEstimator {
        let mut parameters = EnergyProfileParameters::default();
        parameters.movement.min_duration = flat_regime(min);
        parameters.movement.max_duration = flat_regime(max);
        parameters.movement.opt_duration.regime = flat_regime(opt);
        EnergyProfileEstimator::new(parameters)
    }

    #[test]
    fn default_idling_estimator_matches_calibration() {
        let estimator = EnergyProfileEstimator::default();

        let line = estimator.estimate_idling(Point3D::new(500.0, 0.0, 0.0), AXIS);
        assert_abs_diff_eq!(line.q, 448.425, epsilon = 0.1);
        assert_abs_diff_eq!(line.c, 0.0);

        let line = estimator.estimate_idling(Point3D::new(1750.0, 0.0, 250.0), AXIS);
        assert_abs_diff_eq!(line.q, 479.373, epsilon = 0.1);
    }

    #[test]
    fn unit_idling_parameters_give_unit_rate() {
        let parameters = EnergyProfileParameters::from_toml_str(
            r#"
            [idling]
            base = 1.0
            dist_coef = { A = 0.0, B = 0.0, C = 1.0 }
            height_coef = { A = 0.0, B = 0.0, C = 1.0 }
            "#,
        )
        .expect("valid parameters");
        let estimator = EnergyProfileEstimator::new(parameters);

        let line = estimator.estimate_idling(Point3D::new(123.0, 456.0, 789.0), AXIS);
        assert_abs_diff_eq!(line.q, 1.0);
    }

    #[test]
    fn movement_envelope_has_three_lines() {
        let estimator = flat_estimator(2.0, 3.0, 5.0);
        let lines = estimator.estimate_movement(&side_movement(), 1.0, 10.0);

        // opt duration 3.0: corners at 2.7 and 3.3
        assert_eq!(lines.len(), 3);
        assert_abs_diff_eq!(lines[0].y_at(1.0), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lines[0].y_at(2.7), 0.0, epsilon = 1e-9);
        assert_eq!(lines[1], Line2D::new(0.0, 0.0));
        assert_abs_diff_eq!(lines[2].y_at(3.3), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lines[2].y_at(10.0), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn collapsed_corners_fall_back_to_two_line_v() {
        let estimator = flat_estimator(2.0, 3.0, 5.0);
        let lines = estimator.estimate_movement(&side_movement(), 1.0, 1.2);

        assert_eq!(lines.len(), 2);
        assert_abs_diff_eq!(lines[0].y_at(1.0), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lines[0].y_at(1.1), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lines[1].y_at(1.1), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lines[1].y_at(1.2), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn fixed_duration_window_gives_constant_bound() {
        let estimator = flat_estimator(2.0, 3.0, 5.0);
        let lines = estimator.estimate_movement(&side_movement(), 2.0, 2.0);
        assert_eq!(lines, vec![Line2D::new(0.0, 2.0)]);
    }

    #[test]
    fn duration_window_scales_with_relative_weight() {
        let estimator = EnergyProfileEstimator::default();

        // the calibration robot weighs 300 kg and has relative weight 1
        let (min, max) = estimator
            .estimate_duration_window(300.0, 0.0)
            .expect("finite weights");
        assert_abs_diff_eq!(min, 1.0);
        assert_abs_diff_eq!(max, 10.0);

        let (min, max) = estimator
            .estimate_duration_window(600.0, 0.0)
            .expect("finite weights");
        assert_abs_diff_eq!(min, 2.0);
        assert_abs_diff_eq!(max, 20.0);
    }

    fn cell_with(activities: Vec<ActivityDescription>) -> CellDescription {
        CellDescription {
            cycle_time: 20.0,
            robots: vec![RobotDescription {
                id: "r1".to_owned(),
                position: AXIS,
                weight: 300.0,
                maximum_reach: 2000.0,
                min_activities_duration: None,
                activities,
            }],
            time_offsets: vec![],
            collisions: vec![],
        }
    }

    #[test]
    fn resolve_profiles_uses_given_lines_and_consumption() {
        let cell = cell_with(vec![
            ActivityDescription::Movement {
                id: "m1".to_owned(),
                min_duration: Some(1.0),
                max_duration: Some(5.0),
                fixed_start_time: None,
                fixed_end_time: None,
                start: Point3D::new(0.0, 0.0, 0.0),
                end: Point3D::new(1000.0, 0.0, 0.0),
                payload_weight: 0.0,
                given_lines: Some(vec![Line2D::new(-10.0, 60.0), Line2D::new(0.0, 10.0)]),
            },
            ActivityDescription::Idle {
                id: "i1".to_owned(),
                min_duration: None,
                max_duration: None,
                position: Point3D::new(500.0, 0.0, 0.0),
                payload_weight: 0.0,
                given_consumption: Some(1.0),
            },
        ]);

        let estimator = EnergyProfileEstimator::default();
        let profiles = estimator.resolve_profiles(&cell).expect("resolvable cell");

        let movement = profiles.movement("m1").expect("m1 resolved");
        assert_abs_diff_eq!(movement.min_duration, 1.0);
        assert_abs_diff_eq!(movement.max_duration, 5.0);
        assert_eq!(movement.profile.lines().len(), 2);

        let idle = profiles.idle("i1").expect("i1 resolved");
        assert_eq!(idle.lines(), &[Line2D::new(1.0, 0.0)]);
    }

    #[test]
    fn resolve_profiles_fills_missing_movement_bounds() {
        let cell = cell_with(vec![ActivityDescription::Movement {
            id: "m1".to_owned(),
            min_duration: None,
            max_duration: None,
            fixed_start_time: None,
            fixed_end_time: None,
            start: Point3D::new(500.0, 0.0, 0.0),
            end: Point3D::new(1500.0, 0.0, 0.0),
            payload_weight: 0.0,
            given_lines: None,
        }]);

        let estimator = EnergyProfileEstimator::default();
        let profiles = estimator.resolve_profiles(&cell).expect("resolvable cell");

        let movement = profiles.movement("m1").expect("m1 resolved");
        assert_abs_diff_eq!(movement.min_duration, 1.0);
        assert_abs_diff_eq!(movement.max_duration, 10.0);
        assert!(!movement.profile.lines().is_empty());
    }

    #[test]
    fn resolve_profiles_reports_degenerate_movement() {
        let point = Point3D::new(500.0, 500.0, 0.0);
        let cell = cell_with(vec![ActivityDescription::Movement {
            id: "m1".to_owned(),
            min_duration: Some(1.0),
            max_duration: Some(5.0),
            fixed_start_time: None,
            fixed_end_time: None,
            start: point,
            end: point,
            payload_weight: 0.0,
            given_lines: None,
        }]);

        let estimator = EnergyProfileEstimator::default();
        let result = estimator.resolve_profiles(&cell);
        assert_eq!(
            result.err(),
            Some(ProfileError::Movement {
                id: "m1".to_owned(),
                source: MovementError::Degenerate,
            })
        );
    }

    #[test]
    fn resolve_profiles_estimates_idle_rate() {
        let cell = cell_with(vec![ActivityDescription::Idle {
            id: "i1".to_owned(),
            min_duration: None,
            max_duration: None,
            position: Point3D::new(500.0, 0.0, 0.0),
            payload_weight: 0.0,
            given_consumption: None,
        }]);

        let estimator = EnergyProfileEstimator::default();
        let profiles = estimator.resolve_profiles(&cell).expect("resolvable cell");

        let idle = profiles.idle("i1").expect("i1 resolved");
        assert_abs_diff_eq!(idle.lines()[0].q, 448.425, epsilon = 0.1);
    }
}
