use core::f64;
use serde::Serialize;

use crate::ProfileError;

/// A point in the profile plane, in internal length units
pub type Point2 = nalgebra::geometry::Point2<f64>;

/// Distance under which two points are treated as the same point
pub const LINEAR_TOLERANCE: f64 = 1e-9;

/// Point at `radius` and `angle` (radians, CCW from +X) around the origin
pub fn polar(radius: f64, angle: f64) -> Point2 {
    Point2::new(radius * angle.cos(), radius * angle.sin())
}

pub fn points_coincide(a: &Point2, b: &Point2) -> bool {
    (a - b).norm() < LINEAR_TOLERANCE
}

/// Direction an arc edge is traversed in, relative to its counter-clockwise `ArcSpec`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winding {
    Ccw,
    Cw,
}

/// A circular arc running counter-clockwise from `start` to `end` around `center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArcSpec {
    center: Point2,
    start: Point2,
    end: Point2,
}

impl ArcSpec {
    /// Build an arc, checking that `start` and `end` are the same distance from `center`.
    pub fn new(center: Point2, start: Point2, end: Point2) -> Result<Self, ProfileError> {
        let r_start = (start - center).norm();
        let r_end = (end - center).norm();
        if (r_start - r_end).abs() > LINEAR_TOLERANCE {
            return Err(ProfileError::DegenerateGeometry(format!(
                "arc endpoints at different radii ({r_start} vs {r_end})"
            )));
        }
        if r_start < LINEAR_TOLERANCE {
            return Err(ProfileError::DegenerateGeometry(
                "arc with zero radius".to_string(),
            ));
        }
        Ok(ArcSpec { center, start, end })
    }

    /// Arc around `center` between two angles, CCW from `start_angle` to `end_angle`
    pub fn from_angles(
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    ) -> Result<Self, ProfileError> {
        let offset = center.coords;
        ArcSpec::new(
            center,
            polar(radius, start_angle) + offset,
            polar(radius, end_angle) + offset,
        )
    }

    pub fn center(&self) -> Point2 {
        self.center
    }

    pub fn start(&self) -> Point2 {
        self.start
    }

    pub fn end(&self) -> Point2 {
        self.end
    }

    pub fn radius(&self) -> f64 {
        (self.start - self.center).norm()
    }

    /// Swept angle, in (0, 2π]. Coincident endpoints are a full circle.
    pub fn sweep(&self) -> f64 {
        let a0 = (self.start.y - self.center.y).atan2(self.start.x - self.center.x);
        let a1 = (self.end.y - self.center.y).atan2(self.end.x - self.center.x);
        let mut sweep = a1 - a0;
        while sweep <= 0.0 {
            sweep += f64::consts::TAU;
        }
        sweep
    }

    pub fn length(&self) -> f64 {
        self.radius() * self.sweep()
    }
}

/// One edge of a profile loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Edge {
    Line { start: Point2, end: Point2 },
    Arc { arc: ArcSpec, winding: Winding },
}

impl Edge {
    /// Point the edge is traversed from
    pub fn start(&self) -> Point2 {
        match self {
            Edge::Line { start, .. } => *start,
            Edge::Arc { arc, winding } => match winding {
                Winding::Ccw => arc.start,
                Winding::Cw => arc.end,
            },
        }
    }

    /// Point the edge is traversed to
    pub fn end(&self) -> Point2 {
        match self {
            Edge::Line { end, .. } => *end,
            Edge::Arc { arc, winding } => match winding {
                Winding::Ccw => arc.end,
                Winding::Cw => arc.start,
            },
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Edge::Line { start, end } => (end - start).norm(),
            Edge::Arc { arc, .. } => arc.length(),
        }
    }

    pub fn is_arc(&self) -> bool {
        matches!(self, Edge::Arc { .. })
    }

    /// Contribution of this edge to the signed (CCW positive) area of the loop it belongs to.
    ///
    /// The shoelace term of the chord, plus the circular segment between chord and arc for arcs.
    pub fn signed_area_term(&self) -> f64 {
        let (s, e) = (self.start(), self.end());
        let chord = (s.x * e.y - e.x * s.y) / 2.0;
        match self {
            Edge::Line { .. } => chord,
            Edge::Arc { arc, winding } => {
                let theta = arc.sweep();
                let r = arc.radius();
                let segment = r * r * (theta - theta.sin()) / 2.0;
                match winding {
                    Winding::Ccw => chord + segment,
                    Winding::Cw => chord - segment,
                }
            }
        }
    }
}

/// A full circle, used for bores and bolt holes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2, radius: f64) -> Self {
        Circle { center, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPSILON: f64 = 1e-10;

    fn points_equal(p1: Point2, p2: Point2) -> bool {
        (p1 - p2).norm() < EPSILON
    }

    #[test]
    fn test_polar() {
        assert!(points_equal(polar(2.0, 0.0), Point2::new(2.0, 0.0)));
        assert!(points_equal(polar(2.0, FRAC_PI_2), Point2::new(0.0, 2.0)));
        assert!(points_equal(polar(1.0, PI), Point2::new(-1.0, 0.0)));
    }

    #[test]
    fn test_arc_rejects_unequal_radii() {
        let result = ArcSpec::new(
            Point2::origin(),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 2.0),
        );
        assert!(matches!(result, Err(ProfileError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_arc_rejects_zero_radius() {
        let result = ArcSpec::new(Point2::origin(), Point2::origin(), Point2::origin());
        assert!(matches!(result, Err(ProfileError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_quarter_arc() {
        let arc = ArcSpec::from_angles(Point2::origin(), 5.0, 0.0, FRAC_PI_2).unwrap();
        assert!((arc.sweep() - FRAC_PI_2).abs() < EPSILON);
        assert!((arc.length() - 5.0 * PI / 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_arc_sweep_wraps_through_zero() {
        // From 350 degrees to 10 degrees is a 20 degree CCW arc, not 340
        let arc =
            ArcSpec::from_angles(Point2::origin(), 1.0, 350f64.to_radians(), 10f64.to_radians())
                .unwrap();
        assert!((arc.sweep() - 20f64.to_radians()).abs() < EPSILON);
    }

    #[test]
    fn test_arc_off_origin() {
        let arc = ArcSpec::from_angles(Point2::new(3.0, 4.0), 1.0, 0.0, PI).unwrap();
        assert!(points_equal(arc.start(), Point2::new(4.0, 4.0)));
        assert!(points_equal(arc.end(), Point2::new(2.0, 4.0)));
        assert!((arc.radius() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_cw_edge_reverses_endpoints() {
        let arc = ArcSpec::from_angles(Point2::origin(), 1.0, 0.0, FRAC_PI_2).unwrap();
        let edge = Edge::Arc {
            arc,
            winding: Winding::Cw,
        };
        assert!(points_equal(edge.start(), Point2::new(0.0, 1.0)));
        assert!(points_equal(edge.end(), Point2::new(1.0, 0.0)));
    }

    #[test]
    fn test_half_disc_area() {
        // Upper half of the unit disc: CCW arc from (1,0) to (-1,0), then the diameter back
        let arc = ArcSpec::from_angles(Point2::origin(), 1.0, 0.0, PI).unwrap();
        let edges = [
            Edge::Arc {
                arc,
                winding: Winding::Ccw,
            },
            Edge::Line {
                start: Point2::new(-1.0, 0.0),
                end: Point2::new(1.0, 0.0),
            },
        ];
        let area: f64 = edges.iter().map(|e| e.signed_area_term()).sum();
        assert!((area - PI / 2.0).abs() < EPSILON);
    }
}
