//! Curved racks: a toothless arc of material with rectangular windows for the pinion teeth to
//!  engage.
//!
//! Large radius racks are printed in pieces. `build_arc_rack_divisions` splits an angular span into
//!  separately made divisions, each with a slit along its inner edge for the aluminium backing
//!  plate. `build_mounting_rack` makes a single piece with a back plate, a slit for the plate, and
//!  bolt holes.
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::debug;

use crate::geometry::{polar, Circle, Point2, Winding};
use crate::host::{ModelingHost, Realize};
use crate::profile::{CutSpec, Face, HoleSpec, ProfileAccumulator, ToothProfile};
use crate::units::{angular_step, diameter_to_internal_radius, to_internal_length};
use crate::{require_positive, ProfileBuilder, ProfileError};

/// How to share holes between divisions when they don't divide evenly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionPolicy {
    /// Every division gets `total / divisions`, and the last one also takes the remainder.
    /// Existing printed parts were made this way.
    LastAbsorbs,
    /// The remainder is handed out one hole at a time from the first division on
    Balanced,
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        PartitionPolicy::LastAbsorbs
    }
}

/// Split `total` holes across `divisions` contiguous divisions.
pub fn partition_holes(
    total: usize,
    divisions: usize,
    policy: PartitionPolicy,
) -> Result<Vec<usize>, ProfileError> {
    if divisions == 0 {
        return Err(ProfileError::invalid("divisions", "need at least one division"));
    }
    let per_part = total / divisions;
    let counts = match policy {
        PartitionPolicy::LastAbsorbs => (0..divisions)
            .map(|i| {
                if i < divisions - 1 {
                    per_part
                } else {
                    total - per_part * (divisions - 1)
                }
            })
            .collect(),
        PartitionPolicy::Balanced => {
            let remainder = total % divisions;
            (0..divisions)
                .map(|i| per_part + usize::from(i < remainder))
                .collect()
        }
    };
    Ok(counts)
}

/// Annular sector between two radii, CCW from `a0` to `a1`. Outer arc first, inner arc back.
fn annular_sector(r_in: f64, r_out: f64, a0: f64, a1: f64) -> Result<ToothProfile, ProfileError> {
    let center = Point2::origin();
    let mut acc = ProfileAccumulator::begin(polar(r_out, a0));
    acc.arc_to(center, polar(r_out, a1), Winding::Ccw)?
        .line_to(polar(r_in, a1))?
        .arc_to(center, polar(r_in, a0), Winding::Cw)?;
    acc.close()
}

/// Four sided window with radial sides at `a0` and `a1`, straight across at both radii
fn radial_window(r_in: f64, r_out: f64, a0: f64, a1: f64) -> Result<ToothProfile, ProfileError> {
    ProfileAccumulator::polygon(&[
        polar(r_in, a0),
        polar(r_out, a0),
        polar(r_out, a1),
        polar(r_in, a1),
    ])
}

/// Shared angular layout of windows and pillars along a curved rack
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowLayout {
    /// Angle from one window to the next
    pub step: f64,
    /// Angle covered by one window
    pub window: f64,
    /// Angle of solid material between windows, and at each end
    pub pillar: f64,
}

impl WindowLayout {
    /// Layout for `pitch` and `window_width` (internal units) at `radius`
    fn new(pitch: f64, window_width: f64, radius: f64) -> Result<Self, ProfileError> {
        let step = angular_step(pitch, radius);
        let window = window_width / radius;
        let pillar = step - window;
        if pillar <= 0.0 {
            return Err(ProfileError::DegenerateGeometry(format!(
                "windows overlap: pillar angle {pillar:.6} rad is not positive"
            )));
        }
        Ok(WindowLayout {
            step,
            window,
            pillar,
        })
    }

    /// Angle taken by `holes` windows, with a pillar at both ends
    pub fn span(&self, holes: usize) -> f64 {
        self.step * holes as f64 + self.pillar
    }

    /// Start and end angle of window `i`, counting from `start`
    pub fn window_range(&self, start: f64, i: usize) -> (f64, f64) {
        let center = start + i as f64 * self.step + self.pillar + self.window / 2.0;
        (center - self.window / 2.0, center + self.window / 2.0)
    }
}

/// Curved rack dimensions, lengths in mm and angles in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcRackParameters {
    /// Pitch line radius
    pub radius: f64,
    /// Pitch along the pitch circle
    pub pitch: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    /// Number of separately made pieces
    pub divisions: usize,
    pub partition: PartitionPolicy,
    /// Width of a tooth window, including running clearance
    pub window_width: f64,
    /// Height of a tooth window, centred in the rack height
    pub window_height: f64,
    /// Overall extrusion height
    pub rack_height: f64,
    /// Radial thickness of the rack, centred on the pitch radius
    pub rack_thickness: f64,
    /// How far the backing plate slit reaches out from the inner face
    pub slit_depth: f64,
}

impl Default for ArcRackParameters {
    fn default() -> Self {
        ArcRackParameters {
            radius: 800.0,
            pitch: 12.38,
            start_angle: 30.0,
            end_angle: 80.0,
            divisions: 6,
            partition: PartitionPolicy::LastAbsorbs,
            window_width: 10.513,
            window_height: 9.6,
            rack_height: 30.0,
            rack_thickness: 8.0,
            slit_depth: 4.0,
        }
    }
}

impl ArcRackParameters {
    pub fn validate(&self) -> Result<(), ProfileError> {
        require_positive("radius", self.radius)?;
        require_positive("pitch", self.pitch)?;
        require_positive("window_width", self.window_width)?;
        require_positive("window_height", self.window_height)?;
        require_positive("rack_height", self.rack_height)?;
        require_positive("rack_thickness", self.rack_thickness)?;
        require_positive("slit_depth", self.slit_depth)?;
        if self.divisions == 0 {
            return Err(ProfileError::invalid("divisions", "need at least one division"));
        }
        if !self.start_angle.is_finite()
            || !self.end_angle.is_finite()
            || self.end_angle <= self.start_angle
        {
            return Err(ProfileError::invalid(
                "end_angle",
                format!(
                    "must be after the start angle {}, got {}",
                    self.start_angle, self.end_angle
                ),
            ));
        }
        // Leave room for the window overshoot inside the inner face
        if self.rack_thickness / 2.0 + WINDOW_OVERSHOOT_MM >= self.radius {
            return Err(ProfileError::invalid(
                "rack_thickness",
                format!("too thick for a {}mm radius", self.radius),
            ));
        }
        if self.window_height >= self.rack_height {
            return Err(ProfileError::DegenerateGeometry(format!(
                "window height {}mm leaves no rail in a {}mm rack",
                self.window_height, self.rack_height
            )));
        }
        if self.slit_depth >= self.rack_thickness {
            return Err(ProfileError::DegenerateGeometry(format!(
                "slit depth {}mm cuts through the {}mm rack",
                self.slit_depth, self.rack_thickness
            )));
        }
        // The last division can run one pillar past the end angle
        let sweep = (self.end_angle - self.start_angle).to_radians() + self.layout()?.pillar;
        if sweep >= TAU {
            return Err(ProfileError::DegenerateGeometry(format!(
                "{} to {} degrees wraps round onto itself",
                self.start_angle, self.end_angle
            )));
        }
        Ok(())
    }

    pub fn layout(&self) -> Result<WindowLayout, ProfileError> {
        WindowLayout::new(
            to_internal_length(self.pitch),
            to_internal_length(self.window_width),
            to_internal_length(self.radius),
        )
    }

    /// Number of whole windows that fit between the start and end angles
    pub fn total_holes(&self) -> Result<usize, ProfileError> {
        let span = (self.end_angle - self.start_angle).to_radians();
        Ok((span / self.layout()?.step).floor() as usize)
    }
}

/// Distance windows run past the inner and outer faces of a division, so they cut clean through
const WINDOW_OVERSHOOT_MM: f64 = 1.0;

/// One separately made piece of a curved rack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RackDivision {
    pub index: usize,
    /// Angle the division starts at, radians
    pub start_angle: f64,
    /// Angle the division covers, radians
    pub span: f64,
    pub hole_count: usize,
    /// Outline of the piece before any cuts
    pub base: ToothProfile,
    /// Extrusion height of the base
    pub height: f64,
    pub windows: Vec<CutSpec>,
    /// Backing plate groove along the inner face
    pub slit: CutSpec,
}

/// Build every division of a curved rack. Divisions are contiguous, in angle order.
///
/// Divisions given no holes by the partition still get a base and a slit, they are just one pillar
///  wide.
pub fn build_arc_rack_divisions(
    params: &ArcRackParameters,
) -> Result<Vec<RackDivision>, ProfileError> {
    params.validate()?;

    let layout = params.layout()?;
    let total_holes = params.total_holes()?;
    let counts = partition_holes(total_holes, params.divisions, params.partition)?;
    debug!(
        step = layout.step,
        pillar = layout.pillar,
        total_holes,
        ?counts,
        "arc rack partition"
    );

    let radius = to_internal_length(params.radius);
    let half_thickness = to_internal_length(params.rack_thickness) / 2.0;
    let (r_in, r_out) = (radius - half_thickness, radius + half_thickness);
    let overshoot = to_internal_length(WINDOW_OVERSHOOT_MM);
    let height = to_internal_length(params.rack_height);
    let window_height = to_internal_length(params.window_height);
    let rail = (height - window_height) / 2.0;
    let slit_depth = to_internal_length(params.slit_depth);

    let mut divisions = Vec::with_capacity(counts.len());
    let mut holes_before = 0;
    for (index, &hole_count) in counts.iter().enumerate() {
        let start = params.start_angle.to_radians() + holes_before as f64 * layout.step;
        let span = layout.span(hole_count);
        holes_before += hole_count;

        let base = annular_sector(r_in, r_out, start, start + span)?;
        let windows = (0..hole_count)
            .map(|i| {
                let (a0, a1) = layout.window_range(start, i);
                Ok(CutSpec {
                    outline: radial_window(r_in - overshoot, r_out + overshoot, a0, a1)?,
                    z_start: rail,
                    depth: window_height,
                })
            })
            .collect::<Result<Vec<_>, ProfileError>>()?;
        let slit = CutSpec {
            outline: annular_sector(r_in, r_in + slit_depth, start, start + span)?,
            z_start: 0.0,
            depth: height,
        };

        divisions.push(RackDivision {
            index,
            start_angle: start,
            span,
            hole_count,
            base,
            height,
            windows,
            slit,
        });
    }
    Ok(divisions)
}

impl ProfileBuilder for ArcRackParameters {
    type Output = Vec<RackDivision>;

    fn build(&self) -> Result<Vec<RackDivision>, ProfileError> {
        build_arc_rack_divisions(self)
    }
}

impl Realize for RackDivision {
    fn realize<H: ModelingHost>(&self, host: &mut H) -> Result<(), H::Error> {
        let face = Face {
            outer: self.base.clone(),
            holes: Vec::new(),
        };
        host.new_body(&format!("arc_rack_part_{}", self.index + 1), &face, self.height)?;
        for window in &self.windows {
            host.cut(window)?;
        }
        host.cut(&self.slit)
    }
}

/// Single piece curved rack with a back plate for bolting to the frame, lengths in mm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountingRackParameters {
    pub radius: f64,
    pub pitch: f64,
    pub window_width: f64,
    pub hole_count: usize,
    /// Overall extrusion height, matched to the aluminium plate width
    pub rack_height: f64,
    pub window_height: f64,
    /// Radial thickness of the toothed part, centred on the pitch radius
    pub rack_thickness: f64,
    /// Radial thickness of the back plate inside the rack
    pub back_thickness: f64,
    /// Aluminium plate slit, centred on the rack / back plate boundary
    pub slit_width: f64,
    /// Depth of the slit up from the base
    pub slit_depth: f64,
    /// Bolt hole diameter
    pub screw_diameter: f64,
}

impl Default for MountingRackParameters {
    /// Ten window test piece for a 50mm aluminium plate and M3 bolts
    fn default() -> Self {
        MountingRackParameters {
            radius: 800.0,
            pitch: 12.38,
            window_width: 10.513,
            hole_count: 10,
            rack_height: 50.0,
            window_height: 12.0,
            rack_thickness: 10.0,
            back_thickness: 5.0,
            slit_width: 3.6,
            slit_depth: 8.0,
            screw_diameter: 3.4,
        }
    }
}

impl MountingRackParameters {
    pub fn validate(&self) -> Result<(), ProfileError> {
        require_positive("radius", self.radius)?;
        require_positive("pitch", self.pitch)?;
        require_positive("window_width", self.window_width)?;
        require_positive("rack_height", self.rack_height)?;
        require_positive("window_height", self.window_height)?;
        require_positive("rack_thickness", self.rack_thickness)?;
        require_positive("back_thickness", self.back_thickness)?;
        require_positive("slit_width", self.slit_width)?;
        require_positive("slit_depth", self.slit_depth)?;
        require_positive("screw_diameter", self.screw_diameter)?;
        if self.hole_count == 0 {
            return Err(ProfileError::invalid("hole_count", "need at least one window"));
        }
        if self.rack_thickness / 2.0 + self.back_thickness >= self.radius {
            return Err(ProfileError::invalid(
                "back_thickness",
                format!("rack and back plate too thick for a {}mm radius", self.radius),
            ));
        }
        if self.window_height >= self.rack_height {
            return Err(ProfileError::DegenerateGeometry(format!(
                "window height {}mm leaves no rail in a {}mm rack",
                self.window_height, self.rack_height
            )));
        }
        let half_slit = self.slit_width / 2.0;
        if half_slit >= self.back_thickness || half_slit >= self.rack_thickness {
            return Err(ProfileError::DegenerateGeometry(format!(
                "{}mm slit does not fit between the back plate and the rack",
                self.slit_width
            )));
        }
        if self.slit_depth > self.rack_height {
            return Err(ProfileError::DegenerateGeometry(format!(
                "slit depth {}mm is more than the rack height {}mm",
                self.slit_depth, self.rack_height
            )));
        }
        if self.screw_diameter >= self.back_thickness {
            return Err(ProfileError::DegenerateGeometry(format!(
                "{}mm bolt holes do not fit in a {}mm back plate",
                self.screw_diameter, self.back_thickness
            )));
        }
        Ok(())
    }
}

/// A generated mounting rack: base outline plus everything cut out of it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MountingRack {
    pub base: ToothProfile,
    pub height: f64,
    /// Angle covered by the whole piece, radians from 0
    pub span: f64,
    pub windows: Vec<CutSpec>,
    pub slit: CutSpec,
    pub bolt_holes: Vec<HoleSpec>,
}

/// Build the single piece mounting rack, laid out CCW from angle 0.
pub fn build_mounting_rack(params: &MountingRackParameters) -> Result<MountingRack, ProfileError> {
    params.validate()?;

    let radius = to_internal_length(params.radius);
    let layout = WindowLayout::new(
        to_internal_length(params.pitch),
        to_internal_length(params.window_width),
        radius,
    )?;
    let span = layout.span(params.hole_count);
    debug!(step = layout.step, pillar = layout.pillar, span, "mounting rack layout");
    if span >= TAU {
        return Err(ProfileError::DegenerateGeometry(format!(
            "{} windows wrap round onto themselves at a {}mm radius",
            params.hole_count, params.radius
        )));
    }

    let half_thickness = to_internal_length(params.rack_thickness) / 2.0;
    let back = to_internal_length(params.back_thickness);
    let rack_inner = radius - half_thickness;
    let r_out = radius + half_thickness;
    let height = to_internal_length(params.rack_height);
    let window_height = to_internal_length(params.window_height);
    let rail = (height - window_height) / 2.0;

    let base = annular_sector(rack_inner - back, r_out, 0.0, span)?;

    // Windows stop just short of the back plate, and run past the outer face
    let window_in = rack_inner + to_internal_length(0.1);
    let window_out = r_out + to_internal_length(WINDOW_OVERSHOOT_MM);
    let windows = (0..params.hole_count)
        .map(|i| {
            let (a0, a1) = layout.window_range(0.0, i);
            Ok(CutSpec {
                outline: radial_window(window_in, window_out, a0, a1)?,
                z_start: rail,
                depth: window_height,
            })
        })
        .collect::<Result<Vec<_>, ProfileError>>()?;

    let half_slit = to_internal_length(params.slit_width) / 2.0;
    let slit = CutSpec {
        outline: annular_sector(rack_inner - half_slit, rack_inner + half_slit, 0.0, span)?,
        z_start: 0.0,
        depth: to_internal_length(params.slit_depth),
    };

    // Both ends and the middle, on the centre line of the back plate
    let bolt_radius = rack_inner - back / 2.0;
    let bolt_holes = [layout.pillar / 2.0, span / 2.0, span - layout.pillar / 2.0]
        .iter()
        .map(|&angle| HoleSpec {
            circle: Circle::new(
                polar(bolt_radius, angle),
                diameter_to_internal_radius(params.screw_diameter),
            ),
            z_start: 0.0,
            depth: height,
        })
        .collect();

    Ok(MountingRack {
        base,
        height,
        span,
        windows,
        slit,
        bolt_holes,
    })
}

impl ProfileBuilder for MountingRackParameters {
    type Output = MountingRack;

    fn build(&self) -> Result<MountingRack, ProfileError> {
        build_mounting_rack(self)
    }
}

impl Realize for MountingRack {
    fn realize<H: ModelingHost>(&self, host: &mut H) -> Result<(), H::Error> {
        let face = Face {
            outer: self.base.clone(),
            holes: Vec::new(),
        };
        host.new_body("mounting_rack", &face, self.height)?;
        for window in &self.windows {
            host.cut(window)?;
        }
        host.cut(&self.slit)?;
        for hole in &self.bolt_holes {
            host.drill(hole)?;
        }
        Ok(())
    }
}
