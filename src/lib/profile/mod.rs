//! Closed profile loops, and the cut and hole descriptions that hang off them.
//!
//! Builders never assemble `ToothProfile` edge lists by hand. They walk a `ProfileAccumulator`
//!  around the outline, and `finish` checks the loop is closed before anything leaves the crate.

use serde::Serialize;

use crate::geometry::{points_coincide, ArcSpec, Circle, Edge, Point2, Winding, LINEAR_TOLERANCE};
use crate::ProfileError;

/// An immutable, closed loop of edges. Each edge ends where the next begins, and the last edge
///  ends where the first begins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToothProfile {
    edges: Vec<Edge>,
}

impl ToothProfile {
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Start point of every edge, in loop order
    pub fn vertices(&self) -> Vec<Point2> {
        self.edges.iter().map(|e| e.start()).collect()
    }

    pub fn line_count(&self) -> usize {
        self.edges.iter().filter(|e| !e.is_arc()).count()
    }

    pub fn arc_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_arc()).count()
    }

    pub fn perimeter(&self) -> f64 {
        self.edges.iter().map(|e| e.length()).sum()
    }

    /// Signed enclosed area, positive for counter-clockwise loops
    pub fn area(&self) -> f64 {
        self.edges.iter().map(|e| e.signed_area_term()).sum()
    }

    /// Largest gap between consecutive edges, including the closing gap. Zero for every profile
    ///  this crate hands out.
    pub fn closure_gap(&self) -> f64 {
        let n = self.edges.len();
        (0..n)
            .map(|i| (self.edges[(i + 1) % n].start() - self.edges[i].end()).norm())
            .fold(0.0, f64::max)
    }
}

/// Walks a pen around an outline, recording edges as it goes.
#[derive(Debug, Clone)]
pub struct ProfileAccumulator {
    first: Point2,
    cursor: Point2,
    edges: Vec<Edge>,
}

impl ProfileAccumulator {
    /// Put the pen down at `start`
    pub fn begin(start: Point2) -> Self {
        ProfileAccumulator {
            first: start,
            cursor: start,
            edges: Vec::new(),
        }
    }

    pub fn cursor(&self) -> Point2 {
        self.cursor
    }

    /// Straight edge from the pen to `end`
    pub fn line_to(&mut self, end: Point2) -> Result<&mut Self, ProfileError> {
        if points_coincide(&self.cursor, &end) {
            return Err(ProfileError::DegenerateGeometry(format!(
                "zero length line at edge {}",
                self.edges.len()
            )));
        }
        self.edges.push(Edge::Line {
            start: self.cursor,
            end,
        });
        self.cursor = end;
        Ok(self)
    }

    /// Arc around `center` from the pen to `end`, in the given direction
    pub fn arc_to(
        &mut self,
        center: Point2,
        end: Point2,
        winding: Winding,
    ) -> Result<&mut Self, ProfileError> {
        let arc = match winding {
            Winding::Ccw => ArcSpec::new(center, self.cursor, end)?,
            Winding::Cw => ArcSpec::new(center, end, self.cursor)?,
        };
        self.edges.push(Edge::Arc { arc, winding });
        self.cursor = end;
        Ok(self)
    }

    /// Line back to the first point, then `finish`
    pub fn close(mut self) -> Result<ToothProfile, ProfileError> {
        let first = self.first;
        self.line_to(first)?;
        self.finish()
    }

    /// Hand out the loop, provided the pen has come back to where it started.
    pub fn finish(self) -> Result<ToothProfile, ProfileError> {
        if self.edges.is_empty() {
            return Err(ProfileError::DegenerateGeometry(
                "profile has no edges".to_string(),
            ));
        }
        let gap = (self.cursor - self.first).norm();
        if gap > LINEAR_TOLERANCE {
            return Err(ProfileError::OpenProfile {
                index: self.edges.len() - 1,
                gap,
            });
        }
        let mut edges = self.edges;
        // Snap the closing point so the loop is exactly closed, not just within tolerance
        if let Some(last) = edges.last_mut() {
            let first = self.first;
            match last {
                Edge::Line { end, .. } => *end = first,
                Edge::Arc { arc, winding } => {
                    *arc = match winding {
                        Winding::Ccw => ArcSpec::new(arc.center(), arc.start(), first)?,
                        Winding::Cw => ArcSpec::new(arc.center(), first, arc.end())?,
                    }
                }
            }
        }
        Ok(ToothProfile { edges })
    }

    /// Closed polygon through `points`, in order
    pub fn polygon(points: &[Point2]) -> Result<ToothProfile, ProfileError> {
        let (first, rest) = points.split_first().ok_or_else(|| {
            ProfileError::DegenerateGeometry("polygon with no points".to_string())
        })?;
        let mut acc = ProfileAccumulator::begin(*first);
        for p in rest {
            acc.line_to(*p)?;
        }
        acc.close()
    }
}

/// A region to extrude: an outer loop with circular holes left out of it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Face {
    pub outer: ToothProfile,
    pub holes: Vec<Circle>,
}

/// Material to remove: `outline` swept from `z_start` above the body base, `depth` upwards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutSpec {
    pub outline: ToothProfile,
    pub z_start: f64,
    pub depth: f64,
}

/// A round hole along the extrusion axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoleSpec {
    pub circle: Circle,
    pub z_start: f64,
    pub depth: f64,
}

/// A hole drilled radially inward from the rim of a round part
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadialHole {
    /// Direction of the hole axis, radians CCW from +X
    pub angle: f64,
    /// Height of the hole axis above the body base
    pub height: f64,
    pub radius: f64,
    /// Radius at which the drill enters the part
    pub entry_radius: f64,
    pub depth: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-12;

    fn square() -> ToothProfile {
        ProfileAccumulator::polygon(&[
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_polygon_is_closed() {
        let profile = square();
        assert_eq!(profile.len(), 4);
        assert_eq!(profile.line_count(), 4);
        assert_eq!(profile.closure_gap(), 0.0);
        assert!((profile.area() - 4.0).abs() < EPSILON);
        assert!((profile.perimeter() - 8.0).abs() < EPSILON);
    }

    #[test]
    fn test_clockwise_area_is_negative() {
        let profile = ProfileAccumulator::polygon(&[
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 2.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
        ])
        .unwrap();
        assert!((profile.area() + 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_open_profile_is_rejected() {
        let mut acc = ProfileAccumulator::begin(Point2::new(0.0, 0.0));
        acc.line_to(Point2::new(10.0, 0.0)).unwrap();
        acc.line_to(Point2::new(10.0, 10.0)).unwrap();
        let result = acc.finish();
        assert!(matches!(
            result,
            Err(ProfileError::OpenProfile { index: 1, .. })
        ));
    }

    #[test]
    fn test_empty_profile_is_rejected() {
        let acc = ProfileAccumulator::begin(Point2::new(1.0, 1.0));
        assert!(matches!(
            acc.finish(),
            Err(ProfileError::DegenerateGeometry(_))
        ));
        assert!(ProfileAccumulator::polygon(&[]).is_err());
    }

    #[test]
    fn test_zero_length_line_is_rejected() {
        let mut acc = ProfileAccumulator::begin(Point2::new(1.0, 1.0));
        assert!(acc.line_to(Point2::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn test_disc_sector_with_arcs() {
        // Quarter annulus, outer arc CCW and inner arc CW
        let mut acc = ProfileAccumulator::begin(Point2::new(1.0, 0.0));
        acc.line_to(Point2::new(2.0, 0.0))
            .unwrap()
            .arc_to(Point2::origin(), Point2::new(0.0, 2.0), Winding::Ccw)
            .unwrap()
            .line_to(Point2::new(0.0, 1.0))
            .unwrap()
            .arc_to(Point2::origin(), Point2::new(1.0, 0.0), Winding::Cw)
            .unwrap();
        let profile = acc.finish().unwrap();
        assert_eq!(profile.arc_count(), 2);
        assert_eq!(profile.closure_gap(), 0.0);
        // (π·2² - π·1²) / 4
        assert!((profile.area() - 3.0 * PI / 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_finish_snaps_near_miss() {
        let mut acc = ProfileAccumulator::begin(Point2::new(0.0, 0.0));
        acc.line_to(Point2::new(1.0, 0.0)).unwrap();
        acc.line_to(Point2::new(0.0, 1.0)).unwrap();
        acc.line_to(Point2::new(1e-12, 0.0)).unwrap();
        let profile = acc.finish().unwrap();
        assert_eq!(profile.edges()[2].end(), Point2::new(0.0, 0.0));
    }
}
