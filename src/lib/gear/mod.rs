//! Radial tooth profiles for gears and pinions.
//!
//! The teeth are straight-flanked trapezoids: a tip arc on the outer circle, a root arc on the root
//!  circle, and straight lines joining them. Tip and root widths are given as chord widths and
//!  turned into angles with the small-angle approximation, so the tip and root spans differ because
//!  their radii differ.
use core::f64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{polar, Circle, Point2, Winding};
use crate::host::{ModelingHost, Realize};
use crate::profile::{Face, ProfileAccumulator, RadialHole, ToothProfile};
use crate::units::{chord_half_angle, diameter_to_internal_radius, to_internal_length};
use crate::{require_positive, ProfileBuilder, ProfileError};

/// Gear dimensions, all lengths in mm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearParameters {
    /// Tip circle diameter
    pub outer_diameter: f64,
    /// Root circle diameter
    pub root_diameter: f64,
    /// Central shaft hole
    pub bore_diameter: f64,
    pub thickness: f64,
    pub tooth_count: u32,
    /// Chord width of a tooth at the tip circle
    pub tip_chord_width: f64,
    /// Chord width of a tooth at the root circle
    pub root_chord_width: f64,
    /// Side grub screw hole, drilled radially at half thickness
    pub screw_hole_diameter: f64,
}

impl Default for GearParameters {
    /// An 8 tooth pinion with an M2 grub screw
    fn default() -> Self {
        GearParameters {
            outer_diameter: 35.0,
            root_diameter: 28.043,
            bore_diameter: 3.4,
            thickness: 8.0,
            tooth_count: 8,
            tip_chord_width: 8.6314,
            root_chord_width: 9.672,
            screw_hole_diameter: 2.4,
        }
    }
}

/// Angles driving the tooth layout, in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GearAngles {
    /// Angle from one tooth to the next
    pub step: f64,
    /// Rotation of the first tooth centre away from 0
    pub rotate_offset: f64,
    /// Half the angle spanned by a tooth tip
    pub tip_half: f64,
    /// Half the angle spanned by a tooth at its root
    pub root_half: f64,
}

impl GearAngles {
    /// Angle of the centre line of tooth `i`
    pub fn tooth_center(&self, i: u32) -> f64 {
        i as f64 * self.step + self.rotate_offset
    }

    /// Angle of the root gap arc between two neighbouring teeth
    pub fn root_gap(&self) -> f64 {
        self.step - 2.0 * self.root_half
    }
}

impl GearParameters {
    pub fn validate(&self) -> Result<(), ProfileError> {
        require_positive("outer_diameter", self.outer_diameter)?;
        require_positive("root_diameter", self.root_diameter)?;
        require_positive("bore_diameter", self.bore_diameter)?;
        require_positive("thickness", self.thickness)?;
        require_positive("tip_chord_width", self.tip_chord_width)?;
        require_positive("root_chord_width", self.root_chord_width)?;
        require_positive("screw_hole_diameter", self.screw_hole_diameter)?;
        if self.tooth_count < 3 {
            return Err(ProfileError::invalid(
                "tooth_count",
                format!("need at least 3 teeth, got {}", self.tooth_count),
            ));
        }
        if self.root_diameter >= self.outer_diameter {
            return Err(ProfileError::invalid(
                "root_diameter",
                format!(
                    "must be smaller than the outer diameter {}, got {}",
                    self.outer_diameter, self.root_diameter
                ),
            ));
        }
        if self.bore_diameter >= self.root_diameter {
            return Err(ProfileError::invalid(
                "bore_diameter",
                format!(
                    "must be smaller than the root diameter {}, got {}",
                    self.root_diameter, self.bore_diameter
                ),
            ));
        }
        Ok(())
    }

    pub fn outer_radius(&self) -> f64 {
        diameter_to_internal_radius(self.outer_diameter)
    }

    pub fn root_radius(&self) -> f64 {
        diameter_to_internal_radius(self.root_diameter)
    }

    pub fn angles(&self) -> GearAngles {
        let step = f64::consts::TAU / self.tooth_count as f64;
        GearAngles {
            step,
            rotate_offset: step / 2.0,
            tip_half: chord_half_angle(
                to_internal_length(self.tip_chord_width),
                self.outer_radius(),
            ),
            root_half: chord_half_angle(
                to_internal_length(self.root_chord_width),
                self.root_radius(),
            ),
        }
    }
}

/// A generated gear: tooth outline, bore and side screw hole
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GearProfile {
    pub outline: ToothProfile,
    pub bore: Circle,
    /// Extrusion height, internal units
    pub thickness: f64,
    pub screw_hole: RadialHole,
    pub angles: GearAngles,
}

/// Build the closed tooth outline of a gear, plus its bore and screw hole.
///
/// Tooth flanks that cross each other are not detected, only a root gap or tip that fills a whole
///  tooth step. Choosing widths that give clean teeth is up to the caller.
pub fn build_gear_profile(params: &GearParameters) -> Result<GearProfile, ProfileError> {
    params.validate()?;

    let angles = params.angles();
    let r_outer = params.outer_radius();
    let r_root = params.root_radius();
    debug!(
        step = angles.step,
        tip_half = angles.tip_half,
        root_half = angles.root_half,
        "gear angles"
    );

    if angles.root_gap() <= 0.0 {
        return Err(ProfileError::DegenerateGeometry(format!(
            "root width {}mm leaves no gap between teeth (root span {:.6} rad, step {:.6} rad)",
            params.root_chord_width,
            2.0 * angles.root_half,
            angles.step
        )));
    }
    if 2.0 * angles.tip_half >= angles.step {
        return Err(ProfileError::DegenerateGeometry(format!(
            "tip width {}mm spans a whole tooth step",
            params.tip_chord_width
        )));
    }

    let center = Point2::origin();
    let n = params.tooth_count;
    // Leading root corner of tooth i, where the flank leaves the root circle
    let root_leading = |i: u32| polar(r_root, angles.tooth_center(i % n) - angles.root_half);

    let mut acc = ProfileAccumulator::begin(root_leading(0));
    for i in 0..n {
        let offset = angles.tooth_center(i);
        let tip_start = polar(r_outer, offset - angles.tip_half);
        let tip_end = polar(r_outer, offset + angles.tip_half);
        let root_trailing = polar(r_root, offset + angles.root_half);

        acc.line_to(tip_start)?
            .arc_to(center, tip_end, Winding::Ccw)?
            .line_to(root_trailing)?
            .arc_to(center, root_leading(i + 1), Winding::Ccw)?;
    }
    let outline = acc.finish()?;

    let thickness = to_internal_length(params.thickness);
    Ok(GearProfile {
        outline,
        bore: Circle::new(center, diameter_to_internal_radius(params.bore_diameter)),
        thickness,
        screw_hole: RadialHole {
            angle: 0.0,
            height: thickness / 2.0,
            radius: diameter_to_internal_radius(params.screw_hole_diameter),
            entry_radius: r_outer,
            depth: r_outer,
        },
        angles,
    })
}

impl ProfileBuilder for GearParameters {
    type Output = GearProfile;

    fn build(&self) -> Result<GearProfile, ProfileError> {
        build_gear_profile(self)
    }
}

impl Realize for GearProfile {
    fn realize<H: ModelingHost>(&self, host: &mut H) -> Result<(), H::Error> {
        let face = Face {
            outer: self.outline.clone(),
            holes: vec![self.bore],
        };
        host.new_body("gear", &face, self.thickness)?;
        host.drill_radial(&self.screw_hole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Edge;
    use crate::host::{HostCall, RecordingHost};
    use core::f64::consts::{PI, TAU};

    const EPSILON: f64 = 1e-6;

    fn points_equal(p1: Point2, p2: Point2) -> bool {
        (p1 - p2).norm() < EPSILON
    }

    fn arcs_at(profile: &ToothProfile, radius: f64) -> Vec<Edge> {
        profile
            .edges()
            .iter()
            .filter(|e| match e {
                Edge::Arc { arc, .. } => (arc.radius() - radius).abs() < EPSILON,
                _ => false,
            })
            .copied()
            .collect()
    }

    #[test]
    fn test_default_pinion_angles() {
        let angles = GearParameters::default().angles();
        assert!((angles.step - 0.785398163).abs() < EPSILON);
        assert!((angles.rotate_offset - PI / 8.0).abs() < EPSILON);
        assert!((angles.tip_half - (8.6314 / 17.5) / 2.0).abs() < EPSILON);
        assert!((angles.root_half - (9.672 / 14.0215) / 2.0).abs() < EPSILON);
        assert!((angles.tip_half - 0.2466).abs() < 1e-4);
        assert!((angles.root_half - 0.3449).abs() < 1e-4);
    }

    #[test]
    fn test_default_pinion_arc_endpoints() {
        let params = GearParameters::default();
        let gear = build_gear_profile(&params).unwrap();
        let tips = arcs_at(&gear.outline, 1.75);
        let offset = PI / 8.0;
        let tip_half = (8.6314 / 17.5) / 2.0;
        assert!(points_equal(
            tips[0].start(),
            Point2::new(
                1.75 * (offset - tip_half).cos(),
                1.75 * (offset - tip_half).sin()
            )
        ));
        assert!(points_equal(
            tips[0].end(),
            Point2::new(
                1.75 * (offset + tip_half).cos(),
                1.75 * (offset + tip_half).sin()
            )
        ));

        let roots = arcs_at(&gear.outline, 1.40215);
        let root_half = (9.672 / 14.0215) / 2.0;
        assert!(points_equal(
            roots[0].start(),
            Point2::new(
                1.40215 * (offset + root_half).cos(),
                1.40215 * (offset + root_half).sin()
            )
        ));
        let next = offset + PI / 4.0 - root_half;
        assert!(points_equal(
            roots[0].end(),
            Point2::new(1.40215 * next.cos(), 1.40215 * next.sin())
        ));
    }

    #[test]
    fn test_outline_is_one_closed_loop() {
        let gear = build_gear_profile(&GearParameters::default()).unwrap();
        let edges = gear.outline.edges();
        assert_eq!(edges.len(), 32);
        for i in 0..edges.len() {
            assert_eq!(edges[i].end(), edges[(i + 1) % edges.len()].start());
        }
        assert_eq!(gear.outline.closure_gap(), 0.0);
    }

    #[test]
    fn test_tip_and_root_arc_counts() {
        for teeth in [3, 8, 17, 40] {
            let params = GearParameters {
                outer_diameter: 4.0 * teeth as f64,
                root_diameter: 3.5 * teeth as f64,
                tip_chord_width: 1.0,
                root_chord_width: 2.0,
                tooth_count: teeth,
                ..GearParameters::default()
            };
            let gear = build_gear_profile(&params).unwrap();
            assert_eq!(arcs_at(&gear.outline, params.outer_radius()).len(), teeth as usize);
            assert_eq!(arcs_at(&gear.outline, params.root_radius()).len(), teeth as usize);
            assert_eq!(gear.outline.line_count(), 2 * teeth as usize);
        }
    }

    #[test]
    fn test_outline_is_counter_clockwise_and_inside_tip_circle() {
        let params = GearParameters::default();
        let gear = build_gear_profile(&params).unwrap();
        let area = gear.outline.area();
        let r_root = params.root_radius();
        let r_outer = params.outer_radius();
        assert!(area > PI * r_root * r_root);
        assert!(area < PI * r_outer * r_outer);
    }

    #[test]
    fn test_minimum_tooth_count() {
        let params = GearParameters {
            tooth_count: 3,
            ..GearParameters::default()
        };
        let angles = params.angles();
        assert!(2.0 * angles.tip_half + 2.0 * angles.root_half < angles.step);
        let gear = build_gear_profile(&params).unwrap();
        assert_eq!(gear.outline.arc_count(), 6);
        assert_eq!(gear.outline.closure_gap(), 0.0);

        // Walking the loop, every vertex is further round than the last and the walk goes round
        //  exactly once, so no edge crosses another
        let vertices = gear.outline.vertices();
        let mut total = 0.0;
        for (i, v) in vertices.iter().enumerate() {
            let next = vertices[(i + 1) % vertices.len()];
            let mut turn = next.y.atan2(next.x) - v.y.atan2(v.x);
            if turn < 0.0 {
                turn += TAU;
            }
            assert!(turn > 0.0 && turn < PI, "vertex {} turns back by {}", i, turn);
            total += turn;
        }
        assert!((total - TAU).abs() < 1e-9);
    }

    #[test]
    fn test_build_is_repeatable() {
        let params = GearParameters::default();
        let a = build_gear_profile(&params).unwrap();
        let b = params.build().unwrap();
        assert_eq!(a, b);
        for (ea, eb) in a.outline.edges().iter().zip(b.outline.edges()) {
            assert_eq!(ea.start().x.to_bits(), eb.start().x.to_bits());
            assert_eq!(ea.start().y.to_bits(), eb.start().y.to_bits());
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let too_few = GearParameters {
            tooth_count: 2,
            ..GearParameters::default()
        };
        assert!(matches!(
            build_gear_profile(&too_few),
            Err(ProfileError::InvalidParameter {
                name: "tooth_count",
                ..
            })
        ));

        let inverted = GearParameters {
            root_diameter: 35.0,
            ..GearParameters::default()
        };
        assert!(matches!(
            build_gear_profile(&inverted),
            Err(ProfileError::InvalidParameter {
                name: "root_diameter",
                ..
            })
        ));

        let negative = GearParameters {
            thickness: -1.0,
            ..GearParameters::default()
        };
        assert!(matches!(
            build_gear_profile(&negative),
            Err(ProfileError::InvalidParameter {
                name: "thickness",
                ..
            })
        ));
    }

    #[test]
    fn test_root_width_filling_step_is_degenerate() {
        // 12 teeth on a 28mm root circle leave 7.3mm of root per tooth
        let params = GearParameters {
            tooth_count: 12,
            ..GearParameters::default()
        };
        assert!(matches!(
            build_gear_profile(&params),
            Err(ProfileError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_bore_and_screw_hole() {
        let gear = build_gear_profile(&GearParameters::default()).unwrap();
        assert!((gear.bore.radius - 0.17).abs() < EPSILON);
        assert!((gear.thickness - 0.8).abs() < EPSILON);
        assert!((gear.screw_hole.height - 0.4).abs() < EPSILON);
        assert!((gear.screw_hole.radius - 0.12).abs() < EPSILON);
        assert!((gear.screw_hole.entry_radius - 1.75).abs() < EPSILON);
    }

    #[test]
    fn test_realize_creates_body_then_screw_hole() {
        let gear = build_gear_profile(&GearParameters::default()).unwrap();
        let mut host = RecordingHost::default();
        gear.realize(&mut host).unwrap();
        assert_eq!(host.calls.len(), 2);
        match &host.calls[0] {
            HostCall::NewBody { name, face, height } => {
                assert_eq!(name, "gear");
                assert_eq!(face.holes.len(), 1);
                assert!((height - 0.8).abs() < EPSILON);
            }
            other => panic!("expected a new body, got {:?}", other),
        }
        assert!(matches!(host.calls[1], HostCall::DrillRadial(_)));
    }
}
