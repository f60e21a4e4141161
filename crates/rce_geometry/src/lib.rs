//! Geometry kernel for the robotic cell optimizer.
//!
//! Coordinates are millimeters. 3D points describe positions in the cell,
//! 2D points their projections onto the floor plane, and [`Line2D`] the
//! affine lines `y = q*x + c` used both for floor-plane constructions and
//! for piecewise-linear energy envelopes (duration on x, energy on y).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Construction of `y = q*x + c` through two points divides by their
    /// x-distance. Coincident points and vertical point pairs both land here.
    #[error("no line y = qx + c exists through points with equal x = {x}")]
    VerticalLine { x: f64 },
    /// The perpendicular of a horizontal line is vertical and has no
    /// `y = q*x + c` form.
    #[error("perpendicular of a horizontal line is vertical")]
    VerticalPerpendicular,
}

pub type Result<T> = std::result::Result<T, GeometryError>;

/// A point (or vector) in the floor plane.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_more::Add, derive_more::Sub,
)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance of the point from the origin.
    pub fn magnitude(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance_to(self, other: Self) -> f64 {
        (self - other).magnitude()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// A point (or vector) in the cell, in millimeters.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_more::Add, derive_more::Sub,
)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(self, other: Self) -> f64 {
        (self - other).magnitude()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Projection onto the floor plane (the null-z projection).
    pub const fn xy(self) -> Point2D {
        Point2D {
            x: self.x,
            y: self.y,
        }
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
        }
    }

    /// Component-wise equality within `tolerance`.
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl std::ops::Mul<f64> for Point3D {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Div<f64> for Point3D {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// Angle between two vectors in radians, in [0, π].
///
/// Returns 0 when either vector is zero. The cosine is clamped before
/// `acos` so parallel vectors do not produce NaN from rounding.
pub fn angle(u: Point3D, v: Point3D) -> f64 {
    if u.is_zero() || v.is_zero() {
        return 0.0;
    }
    let dot = u.x * v.x + u.y * v.y + u.z * v.z;
    let cos = (dot / (u.magnitude() * v.magnitude())).clamp(-1.0, 1.0);
    cos.acos()
}

/// An affine line `y = q*x + c` in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line2D {
    pub q: f64,
    pub c: f64,
}

impl Line2D {
    #[inline]
    #[must_use]
    pub const fn new(q: f64, c: f64) -> Self {
        Self { q, c }
    }

    /// The line through two points with distinct x coordinates.
    pub fn through(a: Point2D, b: Point2D) -> Result<Self> {
        if a.x == b.x {
            return Err(GeometryError::VerticalLine { x: a.x });
        }
        let q = (a.y - b.y) / (a.x - b.x);
        let c = a.y - q * a.x;
        Ok(Self { q, c })
    }

    pub fn y_at(self, x: f64) -> f64 {
        self.q * x + self.c
    }

    /// Euclidean distance from the line to `point`.
    pub fn distance_to(self, point: Point2D) -> f64 {
        // general form: q*x - y + c = 0
        (self.q * point.x - point.y + self.c).abs() / self.q.hypot(-1.0)
    }

    /// The perpendicular line passing through `point`.
    pub fn perpendicular_through(self, point: Point2D) -> Result<Self> {
        if self.q == 0.0 {
            return Err(GeometryError::VerticalPerpendicular);
        }
        let q = -1.0 / self.q;
        let c = point.y - q * point.x;
        Ok(Self { q, c })
    }

    /// Intersection with another line; `None` when the lines are parallel.
    pub fn intersection(self, other: Self) -> Option<Point2D> {
        if self.q == other.q {
            return None;
        }
        let x = (other.c - self.c) / (self.q - other.q);
        Some(Point2D::new(x, self.y_at(x)))
    }

    /// The point on the line closest to `point` (orthogonal projection).
    pub fn closest_point(self, point: Point2D) -> Point2D {
        if self.q == 0.0 {
            return Point2D::new(point.x, self.c);
        }
        let perpendicular_q = -1.0 / self.q;
        let perpendicular_c = point.y - perpendicular_q * point.x;
        let x = (perpendicular_c - self.c) / (self.q - perpendicular_q);
        Point2D::new(x, self.y_at(x))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn point3d_arithmetic() {
        let a = Point3D::new(1.0, 2.0, 3.0);
        let b = Point3D::new(4.0, 6.0, 8.0);
        assert_eq!(a + b, Point3D::new(5.0, 8.0, 11.0));
        assert_eq!(b - a, Point3D::new(3.0, 4.0, 5.0));
        assert_eq!(a * 2.0, Point3D::new(2.0, 4.0, 6.0));
        assert_eq!(b / 2.0, Point3D::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn point3d_distance() {
        let a = Point3D::new(0.0, 0.0, 0.0);
        let b = Point3D::new(3.0, 4.0, 0.0);
        assert_abs_diff_eq!(a.distance_to(b), 5.0);
        assert_abs_diff_eq!((b - a).magnitude(), 5.0);
    }

    #[test]
    fn point3d_midpoint_and_projection() {
        let a = Point3D::new(0.0, 2.0, 4.0);
        let b = Point3D::new(2.0, 0.0, 0.0);
        assert_eq!(a.midpoint(b), Point3D::new(1.0, 1.0, 2.0));
        assert_eq!(a.xy(), Point2D::new(0.0, 2.0));
    }

    #[test]
    fn point3d_approx_eq() {
        let a = Point3D::new(1.0, 1.0, 1.0);
        let b = Point3D::new(1.0 + 1e-9, 1.0 - 1e-9, 1.0);
        assert!(a.approx_eq(b, 1e-6));
        assert!(!a.approx_eq(Point3D::new(1.1, 1.0, 1.0), 1e-6));
    }

    #[test]
    fn angle_of_perpendicular_vectors() {
        let u = Point3D::new(1.0, 0.0, 0.0);
        let v = Point3D::new(0.0, 1.0, 0.0);
        assert_abs_diff_eq!(angle(u, v), std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn angle_of_opposite_vectors() {
        let u = Point3D::new(1.0, 0.0, 0.0);
        let v = Point3D::new(-2.0, 0.0, 0.0);
        assert_abs_diff_eq!(angle(u, v), std::f64::consts::PI);
    }

    #[test]
    fn angle_of_zero_vector_is_zero() {
        let u = Point3D::new(0.0, 0.0, 0.0);
        let v = Point3D::new(1.0, 1.0, 1.0);
        assert_abs_diff_eq!(angle(u, v), 0.0);
        assert_abs_diff_eq!(angle(v, u), 0.0);
    }

    #[test]
    fn line_through_points() {
        let line = Line2D::through(Point2D::new(0.0, 1.0), Point2D::new(2.0, 5.0))
            .expect("distinct x coordinates");
        assert_abs_diff_eq!(line.q, 2.0);
        assert_abs_diff_eq!(line.c, 1.0);
        assert_abs_diff_eq!(line.y_at(3.0), 7.0);
    }

    #[test]
    fn line_through_vertical_points_fails() {
        let result = Line2D::through(Point2D::new(1.0, 0.0), Point2D::new(1.0, 5.0));
        assert_eq!(result, Err(GeometryError::VerticalLine { x: 1.0 }));

        // coincident points are the same failure
        let result = Line2D::through(Point2D::new(1.0, 2.0), Point2D::new(1.0, 2.0));
        assert_eq!(result, Err(GeometryError::VerticalLine { x: 1.0 }));
    }

    #[test]
    fn line_distance_to_point() {
        // y = x, distance to (2, 0) is sqrt(2)
        let line = Line2D::new(1.0, 0.0);
        assert_abs_diff_eq!(
            line.distance_to(Point2D::new(2.0, 0.0)),
            std::f64::consts::SQRT_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn perpendicular_and_intersection() {
        let line = Line2D::new(1.0, 0.0);
        let perpendicular = line
            .perpendicular_through(Point2D::new(2.0, 0.0))
            .expect("line is not horizontal");
        assert_abs_diff_eq!(perpendicular.q, -1.0);
        assert_abs_diff_eq!(perpendicular.c, 2.0);

        let intersection = line.intersection(perpendicular).expect("not parallel");
        assert_abs_diff_eq!(intersection.x, 1.0);
        assert_abs_diff_eq!(intersection.y, 1.0);
    }

    #[test]
    fn perpendicular_of_horizontal_line_fails() {
        let line = Line2D::new(0.0, 3.0);
        assert_eq!(
            line.perpendicular_through(Point2D::new(1.0, 1.0)),
            Err(GeometryError::VerticalPerpendicular)
        );
    }

    #[test]
    fn intersection_of_parallel_lines_is_none() {
        let a = Line2D::new(2.0, 0.0);
        let b = Line2D::new(2.0, 5.0);
        assert_eq!(a.intersection(b), None);
    }

    #[test]
    fn closest_point_on_sloped_line() {
        let line = Line2D::new(1.0, 0.0);
        let closest = line.closest_point(Point2D::new(2.0, 0.0));
        assert_abs_diff_eq!(closest.x, 1.0);
        assert_abs_diff_eq!(closest.y, 1.0);
    }

    #[test]
    fn closest_point_on_horizontal_line() {
        let line = Line2D::new(0.0, 4.0);
        assert_eq!(
            line.closest_point(Point2D::new(7.0, 0.0)),
            Point2D::new(7.0, 4.0)
        );
    }
}
