//! Movement geometry and the derived quantities the energy model consumes.

use rce_geometry::{GeometryError, Line2D, Point3D};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MovementError {
    #[error("geometric input is not finite")]
    NonFinite,
    #[error("movement start and end coincide")]
    Degenerate,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// A straight movement of the robot flange from `start` to `end`, described
/// relative to the robot axis. All decompositions are computed eagerly at
/// construction so later lookups are plain reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    start: Point3D,
    end: Point3D,
    axis: Point3D,
    payload_weight: f64,
    length: f64,
    side_distance: f64,
    far_distance: f64,
    avg_distance_from_axis: f64,
}

impl Movement {
    /// Builds the movement and its side/far/height decomposition.
    ///
    /// The decomposition needs the line through the axis and the segment
    /// midpoint (both projected to the floor plane); point pairs for which
    /// that line has no `y = qx + c` form are rejected as geometry errors.
    pub fn new(
        start: Point3D,
        end: Point3D,
        payload_weight: f64,
        axis: Point3D,
    ) -> Result<Self, MovementError> {
        if !start.is_finite() || !end.is_finite() || !axis.is_finite() || !payload_weight.is_finite()
        {
            return Err(MovementError::NonFinite);
        }

        let length = start.distance_to(end);
        if length == 0.0 {
            return Err(MovementError::Degenerate);
        }

        let axis_2d = axis.xy();
        let mid_2d = start.midpoint(end).xy();
        let axis_mid_line = Line2D::through(axis_2d, mid_2d)?;

        let side_distance = 2.0 * axis_mid_line.distance_to(start.xy());

        // positive: the movement runs away from the axis, negative: towards it
        let projected_start = axis_mid_line.closest_point(start.xy());
        let far_distance =
            2.0 * (axis_2d.distance_to(mid_2d) - axis_2d.distance_to(projected_start));

        Ok(Self {
            start,
            end,
            axis,
            payload_weight,
            length,
            side_distance,
            far_distance,
            avg_distance_from_axis: axis_2d.distance_to(mid_2d),
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Signed change of the z coordinate.
    pub fn height_change(&self) -> f64 {
        self.end.z - self.start.z
    }

    pub fn avg_height(&self) -> f64 {
        (self.start.z + self.end.z) / 2.0
    }

    /// Length of the movement component perpendicular to the axis-midpoint
    /// direction.
    pub fn side_distance(&self) -> f64 {
        self.side_distance
    }

    /// Signed length of the movement component along the axis-midpoint
    /// direction; positive when moving into distance from the axis.
    pub fn far_distance(&self) -> f64 {
        self.far_distance
    }

    pub fn avg_distance_from_axis(&self) -> f64 {
        self.avg_distance_from_axis
    }

    pub fn payload_weight(&self) -> f64 {
        self.payload_weight
    }

    pub fn axis(&self) -> Point3D {
        self.axis
    }

    /// Shares of the movement length attributed to each direction component.
    pub fn direction_ratios(&self) -> DirectionRatios {
        let length = self.length;
        let height_change = self.height_change();
        DirectionRatios {
            side: self.side_distance / length,
            into_dist: self.far_distance.max(0.0) / length,
            from_afar: (-self.far_distance).max(0.0) / length,
            up: height_change.max(0.0) / length,
            down: (-height_change).max(0.0) / length,
        }
    }
}

/// Direction decomposition of a movement, each component as a fraction of
/// the movement length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionRatios {
    pub side: f64,
    pub into_dist: f64,
    pub from_afar: f64,
    pub up: f64,
    pub down: f64,
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const AXIS: Point3D = Point3D::new(0.0, 0.0, 0.0);

    fn movement(start: Point3D, end: Point3D) -> Movement {
        Movement::new(start, end, 0.0, AXIS).expect("valid movement")
    }

    #[test]
    fn pure_side_movement() {
        let m = movement(
            Point3D::new(1000.0, -500.0, 0.0),
            Point3D::new(1000.0, 500.0, 0.0),
        );
        assert_abs_diff_eq!(m.length(), 1000.0);
        assert_abs_diff_eq!(m.side_distance(), 1000.0);
        assert_abs_diff_eq!(m.far_distance(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.avg_distance_from_axis(), 1000.0);
        assert_abs_diff_eq!(m.height_change(), 0.0);

        let ratios = m.direction_ratios();
        assert_abs_diff_eq!(ratios.side, 1.0);
        assert_abs_diff_eq!(ratios.into_dist, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ratios.from_afar, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ratios.up, 0.0);
        assert_abs_diff_eq!(ratios.down, 0.0);
    }

    #[test]
    fn movement_into_distance() {
        let m = movement(
            Point3D::new(500.0, 0.0, 0.0),
            Point3D::new(1500.0, 0.0, 0.0),
        );
        assert_abs_diff_eq!(m.length(), 1000.0);
        assert_abs_diff_eq!(m.far_distance(), 1000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(m.side_distance(), 0.0, epsilon = 1e-6);

        let ratios = m.direction_ratios();
        assert_abs_diff_eq!(ratios.into_dist, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ratios.from_afar, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn movement_from_afar() {
        let m = movement(
            Point3D::new(1500.0, 0.0, 0.0),
            Point3D::new(500.0, 0.0, 0.0),
        );
        assert_abs_diff_eq!(m.far_distance(), -1000.0, epsilon = 1e-6);

        let ratios = m.direction_ratios();
        assert_abs_diff_eq!(ratios.from_afar, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ratios.into_dist, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn vertical_movement() {
        let m = movement(
            Point3D::new(1000.0, 0.0, 0.0),
            Point3D::new(1000.0, 0.0, 500.0),
        );
        assert_abs_diff_eq!(m.length(), 500.0);
        assert_abs_diff_eq!(m.height_change(), 500.0);
        assert_abs_diff_eq!(m.avg_height(), 250.0);

        let ratios = m.direction_ratios();
        assert_abs_diff_eq!(ratios.up, 1.0);
        assert_abs_diff_eq!(ratios.down, 0.0);
        assert_abs_diff_eq!(ratios.side, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn downward_movement() {
        let m = movement(
            Point3D::new(1000.0, 0.0, 500.0),
            Point3D::new(1000.0, 0.0, 0.0),
        );
        assert_abs_diff_eq!(m.height_change(), -500.0);

        let ratios = m.direction_ratios();
        assert_abs_diff_eq!(ratios.down, 1.0);
        assert_abs_diff_eq!(ratios.up, 0.0);
    }

    #[test]
    fn degenerate_movement_is_rejected() {
        let point = Point3D::new(1000.0, 500.0, 0.0);
        assert_eq!(
            Movement::new(point, point, 0.0, AXIS),
            Err(MovementError::Degenerate)
        );
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let start = Point3D::new(f64::NAN, 0.0, 0.0);
        let end = Point3D::new(1000.0, 0.0, 0.0);
        assert_eq!(
            Movement::new(start, end, 0.0, AXIS),
            Err(MovementError::NonFinite)
        );
    }

    #[test]
    fn axis_above_midpoint_is_rejected() {
        // axis and midpoint project to the same floor point, so the
        // axis-midpoint line does not exist
        let m = Movement::new(
            Point3D::new(-500.0, 0.0, 0.0),
            Point3D::new(500.0, 0.0, 0.0),
            0.0,
            AXIS,
        );
        assert!(matches!(m, Err(MovementError::Geometry(_))));
    }
}
