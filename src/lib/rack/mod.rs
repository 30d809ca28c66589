//! Straight racks with trapezoidal teeth.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{points_coincide, Point2};
use crate::host::{ModelingHost, Realize};
use crate::profile::{Face, ProfileAccumulator, ToothProfile};
use crate::units::to_internal_length;
use crate::{require_positive, ProfileBuilder, ProfileError};

/// Straight rack dimensions, all lengths in mm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RackParameters {
    /// Distance between corresponding points of neighbouring teeth
    pub pitch: f64,
    pub tooth_count: u32,
    /// Height of a tooth above the base
    pub tooth_height: f64,
    /// Height of the solid strip under the teeth
    pub base_height: f64,
    /// Tooth width at the tip
    pub top_groove_width: f64,
    /// Tooth width where it meets the base
    pub bottom_groove_width: f64,
    /// Extrusion thickness of the finished rack
    pub thickness: f64,
}

impl Default for RackParameters {
    /// Matches the default pinion's 12.38mm pitch
    fn default() -> Self {
        RackParameters {
            pitch: 12.38,
            tooth_count: 10,
            tooth_height: 3.5,
            base_height: 8.0,
            top_groove_width: 3.6,
            bottom_groove_width: 6.2,
            thickness: 8.0,
        }
    }
}

impl RackParameters {
    pub fn validate(&self) -> Result<(), ProfileError> {
        require_positive("pitch", self.pitch)?;
        require_positive("tooth_height", self.tooth_height)?;
        require_positive("base_height", self.base_height)?;
        require_positive("top_groove_width", self.top_groove_width)?;
        require_positive("bottom_groove_width", self.bottom_groove_width)?;
        require_positive("thickness", self.thickness)?;
        if self.tooth_count == 0 {
            return Err(ProfileError::invalid("tooth_count", "need at least one tooth"));
        }
        if self.top_groove_width >= self.bottom_groove_width {
            return Err(ProfileError::invalid(
                "top_groove_width",
                format!(
                    "must be narrower than the bottom width {}, got {}",
                    self.bottom_groove_width, self.top_groove_width
                ),
            ));
        }
        if self.bottom_groove_width > self.pitch {
            return Err(ProfileError::DegenerateGeometry(format!(
                "tooth base {}mm is wider than the pitch {}mm, neighbouring teeth overlap",
                self.bottom_groove_width, self.pitch
            )));
        }
        Ok(())
    }
}

/// A generated straight rack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RackProfile {
    pub outline: ToothProfile,
    /// Baseline length, internal units
    pub length: f64,
    /// Top of the teeth above the baseline, internal units
    pub tip_height: f64,
    pub tooth_count: u32,
    pub thickness: f64,
}

impl RackProfile {
    /// Number of tooth tip plateaus in the outline
    pub fn notch_count(&self) -> usize {
        self.outline
            .edges()
            .iter()
            .filter(|e| {
                !e.is_arc()
                    && (e.start().y - self.tip_height).abs() < 1e-9
                    && (e.end().y - self.tip_height).abs() < 1e-9
            })
            .count()
    }
}

/// Build the comb outline of a straight rack, teeth pointing up from a baseline at y = 0.
///
/// The outline starts at the top of the left end, runs along the teeth, and returns along the
///  baseline, so it winds clockwise.
pub fn build_rack_profile(params: &RackParameters) -> Result<RackProfile, ProfileError> {
    params.validate()?;

    let pitch = to_internal_length(params.pitch);
    let base = to_internal_length(params.base_height);
    let tip = base + to_internal_length(params.tooth_height);
    let half_top = to_internal_length(params.top_groove_width) / 2.0;
    let half_bottom = to_internal_length(params.bottom_groove_width) / 2.0;
    let length = params.tooth_count as f64 * pitch;
    debug!(pitch, length, teeth = params.tooth_count, "rack layout");

    let mut acc = ProfileAccumulator::begin(Point2::new(0.0, base));
    for i in 0..params.tooth_count {
        let left = i as f64 * pitch;
        let center = left + pitch / 2.0;
        let right = (i + 1) as f64 * pitch;

        let rise = Point2::new(center - half_bottom, base);
        // Teeth as wide as the pitch share a corner with their neighbour, with no shoulder between
        if !points_coincide(&acc.cursor(), &rise) {
            acc.line_to(rise)?;
        }
        acc.line_to(Point2::new(center - half_top, tip))?
            .line_to(Point2::new(center + half_top, tip))?
            .line_to(Point2::new(center + half_bottom, base))?;
        let shoulder = Point2::new(right, base);
        if !points_coincide(&acc.cursor(), &shoulder) {
            acc.line_to(shoulder)?;
        }
    }
    acc.line_to(Point2::new(length, 0.0))?
        .line_to(Point2::new(0.0, 0.0))?;
    let outline = acc.close()?;

    Ok(RackProfile {
        outline,
        length,
        tip_height: tip,
        tooth_count: params.tooth_count,
        thickness: to_internal_length(params.thickness),
    })
}

impl ProfileBuilder for RackParameters {
    type Output = RackProfile;

    fn build(&self) -> Result<RackProfile, ProfileError> {
        build_rack_profile(self)
    }
}

impl Realize for RackProfile {
    fn realize<H: ModelingHost>(&self, host: &mut H) -> Result<(), H::Error> {
        let face = Face {
            outer: self.outline.clone(),
            holes: Vec::new(),
        };
        host.new_body("rack", &face, self.thickness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCall, RecordingHost};
    use crate::units::from_internal_length;

    const EPSILON: f64 = 1e-9;

    fn baseline_length(rack: &RackProfile) -> f64 {
        rack.outline
            .edges()
            .iter()
            .filter(|e| e.start().y.abs() < EPSILON && e.end().y.abs() < EPSILON)
            .map(|e| e.length())
            .sum()
    }

    #[test]
    fn test_default_rack_length() {
        let rack = build_rack_profile(&RackParameters::default()).unwrap();
        assert!((from_internal_length(rack.length) - 123.8).abs() < EPSILON);
        assert!((from_internal_length(baseline_length(&rack)) - 123.8).abs() < EPSILON);
    }

    #[test]
    fn test_notch_count_matches_teeth() {
        for teeth in [1, 2, 10, 33] {
            let params = RackParameters {
                tooth_count: teeth,
                ..RackParameters::default()
            };
            let rack = build_rack_profile(&params).unwrap();
            assert_eq!(rack.notch_count(), teeth as usize);
            assert!(
                (baseline_length(&rack) - to_internal_length(params.pitch) * teeth as f64).abs()
                    < EPSILON
            );
        }
    }

    #[test]
    fn test_edge_layout() {
        // Five edges per tooth (the shared shoulder counted once) plus three closing edges
        let rack = build_rack_profile(&RackParameters::default()).unwrap();
        assert_eq!(rack.outline.len(), 10 * 5 + 3);
        assert_eq!(rack.outline.arc_count(), 0);
        assert_eq!(rack.outline.closure_gap(), 0.0);
        assert_eq!(rack.outline.vertices()[0], Point2::new(0.0, 0.8));
    }

    #[test]
    fn test_area() {
        let params = RackParameters::default();
        let rack = build_rack_profile(&params).unwrap();
        let length = to_internal_length(params.pitch) * 10.0;
        let tooth = (to_internal_length(params.top_groove_width)
            + to_internal_length(params.bottom_groove_width))
            / 2.0
            * to_internal_length(params.tooth_height);
        let expected = length * to_internal_length(params.base_height) + 10.0 * tooth;
        // Along the teeth left to right, then back along the baseline: clockwise
        assert!((rack.outline.area() + expected).abs() < EPSILON);
    }

    #[test]
    fn test_full_width_teeth_share_corners() {
        let params = RackParameters {
            bottom_groove_width: 12.38,
            ..RackParameters::default()
        };
        let rack = build_rack_profile(&params).unwrap();
        // Rise, plateau and fall per tooth, no shoulders, then the three closing edges
        assert_eq!(rack.outline.len(), 10 * 3 + 3);
        assert_eq!(rack.notch_count(), 10);
    }

    #[test]
    fn test_invalid_widths() {
        let inverted = RackParameters {
            top_groove_width: 7.0,
            ..RackParameters::default()
        };
        assert!(matches!(
            build_rack_profile(&inverted),
            Err(ProfileError::InvalidParameter {
                name: "top_groove_width",
                ..
            })
        ));

        let overlapping = RackParameters {
            bottom_groove_width: 13.0,
            ..RackParameters::default()
        };
        assert!(matches!(
            build_rack_profile(&overlapping),
            Err(ProfileError::DegenerateGeometry(_))
        ));

        let empty = RackParameters {
            tooth_count: 0,
            ..RackParameters::default()
        };
        assert!(build_rack_profile(&empty).is_err());
    }

    #[test]
    fn test_build_is_repeatable() {
        let params = RackParameters::default();
        assert_eq!(params.build().unwrap(), params.build().unwrap());
    }

    #[test]
    fn test_realize() {
        let rack = build_rack_profile(&RackParameters::default()).unwrap();
        let mut host = RecordingHost::default();
        rack.realize(&mut host).unwrap();
        assert!(matches!(&host.calls[..], [HostCall::NewBody { .. }]));
    }
}
