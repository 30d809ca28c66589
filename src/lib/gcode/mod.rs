//! A `ModelingHost` that writes G-code for a 3 axis mill.
//!
//! Parts are cut from sheet stock with the top of the stock at Z0. Body outlines and through cuts are
//!  contoured in step-down passes with cutter compensation (G41/G42, D register = tool number), so
//!  the programmed path is the part outline itself. Each pass leads in and out at the middle of the
//!  longest edge, from the waste side. Round holes bigger than the cutter are milled helically,
//!  smaller ones are plunged. Anything that doesn't go all the way through the part can't be reached
//!  from the top, and cuts narrower than the cutter can't be cleared. Both are left as comments in
//!  the output.
use anyhow::Context;
use nalgebra::{Rotation2, Vector2};
use std::fs::OpenOptions;
use std::io::{BufWriter, Error, ErrorKind, Result, Write};
use std::path::Path;
use structopt::StructOpt;
use tracing::{info, warn};

use crate::geometry::{Edge, Point2, Winding};
use crate::host::{ModelingHost, Realize};
use crate::profile::{CutSpec, Face, HoleSpec, RadialHole, ToothProfile};
use crate::units::from_internal_length;

/// Features closer than this (mm) to the top or bottom face count as reaching it
const Z_TOLERANCE: f64 = 1e-6;

pub fn gcode_comment(file: &mut dyn Write, s: &str) -> Result<()> {
    writeln!(file, "({s})")
}

pub fn preamble(
    name: &Option<String>,
    tool: u32,
    tool_comment: &str,
    rpm: f64,
    coolant: bool,
    file: &mut dyn Write,
) -> Result<()> {
    if let Some(name) = &name {
        gcode_comment(file, name)?;
    }
    gcode_comment(file, tool_comment)?;

    // Put the machine into a known mode. Arc centres are incremental from the arc start.
    let preamble_str = "
G90 (Absolute)
G54 (G54 Datum)
G17 (X-Y Plane)
G40 (No cutter compensation)
G80 (No cycles)
G94 (Feed per minute)
G91.1 (Incremental arc centres)
G49 (No tool length compensation)
M9 (Coolant off)

G21 (Metric)

G30 (Go Home Before Starting)
    ";
    write!(file, "{preamble_str}\n\n")?;
    writeln!(file, "T{tool} G43 H{tool} M6")?;
    writeln!(file, "S{rpm} M3")?;

    if coolant {
        writeln!(file, "M8")?;
    }

    Ok(())
}

pub fn trailer(file: &mut dyn Write) -> Result<()> {
    writeln!(file, "G30 (Go Home)")?;
    writeln!(file, "M9 (Coolant off)")?;
    writeln!(file, "M5 (Spindle off)")?;
    writeln!(file, "M30")?;

    Ok(())
}

/// Cutter radius compensation, with the D register to take the radius from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compensation {
    /// G41, tool to the left of the direction of travel
    Left(u32),
    /// G42, tool to the right of the direction of travel
    Right(u32),
    /// G40
    Off,
}

/// Target of a move. Axes left as `None` are not written.
#[derive(Clone, Debug, Default)]
pub struct Move {
    comp: Option<Compensation>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    i: Option<f64>,
    j: Option<f64>,
    feed: Option<f64>,
}

impl Move {
    pub fn xy(p: Point2) -> Self {
        Move {
            x: Some(p.x),
            y: Some(p.y),
            ..Move::default()
        }
    }

    pub fn z(z: f64) -> Self {
        Move {
            z: Some(z),
            ..Move::default()
        }
    }

    /// Arc to `end`, with the centre given as an offset from the arc start
    pub fn arc(end: Point2, center_offset: Vector2<f64>) -> Self {
        Move {
            i: Some(center_offset.x),
            j: Some(center_offset.y),
            ..Move::xy(end)
        }
    }

    pub fn feed(self, feed: f64) -> Self {
        Move {
            feed: Some(feed),
            ..self
        }
    }

    /// Also move Z, for helical arcs
    pub fn at_z(self, z: f64) -> Self {
        Move { z: Some(z), ..self }
    }

    pub fn compensate(self, comp: Compensation) -> Self {
        Move {
            comp: Some(comp),
            ..self
        }
    }

    fn write_words(&self, file: &mut dyn Write) -> Result<()> {
        match self.comp {
            Some(Compensation::Left(d)) => write!(file, " G41 D{d}")?,
            Some(Compensation::Right(d)) => write!(file, " G42 D{d}")?,
            Some(Compensation::Off) => write!(file, " G40")?,
            None => {}
        }
        g_val(file, "X", self.x)?;
        g_val(file, "Y", self.y)?;
        g_val(file, "Z", self.z)?;
        g_val(file, "I", self.i)?;
        g_val(file, "J", self.j)?;
        g_val(file, "F", self.feed)?;
        Ok(())
    }
}

/// Emit a gcode parameter value, if `ov` is `Some`.
/// Numbers that round nicely are printed in their minimal form.
fn g_val(file: &mut dyn Write, name: &str, ov: Option<f64>) -> Result<()> {
    if let Some(v) = ov {
        if (v - v.round()).abs() < f64::EPSILON {
            write!(file, " {}{}.", name, v.round())
        } else {
            write!(file, " {name}{v:.4}")
        }
    } else {
        Ok(())
    }
}

fn g_move(file: &mut dyn Write, g: &str, m: &Move) -> Result<()> {
    write!(file, "{g}")?;
    m.write_words(file)?;
    writeln!(file)
}

pub fn g0(file: &mut dyn Write, m: Move) -> Result<()> {
    assert!(m.feed.is_none(), "g0 moves must not include a feed rate");
    if let Some(z) = m.z {
        assert!(z > 0.0, "Rapid move at negative z");
    }
    g_move(file, "G0", &m)
}

pub fn g1(file: &mut dyn Write, m: Move) -> Result<()> {
    assert!(m.feed.is_some(), "g1 moves must include a feed rate");
    assert!(m.i.is_none() && m.j.is_none(), "g1 moves have no arc centre");
    g_move(file, "G1", &m)
}

/// G2 clockwise arc move.
/// X, Y is endpoint, I, J is offset from start point to true arc center
pub fn g2(file: &mut dyn Write, m: Move) -> Result<()> {
    assert!(
        m.i.is_some() && m.j.is_some() && m.feed.is_some(),
        "Refusing to make illegal G2 move"
    );
    g_move(file, "G2", &m)
}

/// G3 counter-clockwise arc move.
/// X, Y is endpoint, I, J is offset from start point to true arc center
pub fn g3(file: &mut dyn Write, m: Move) -> Result<()> {
    assert!(
        m.i.is_some() && m.j.is_some() && m.feed.is_some(),
        "Refusing to make illegal G3 move"
    );
    g_move(file, "G3", &m)
}

/// Depths (positive, mm) of successive passes down to `total`.
///
/// Passes of `max_depth` until within two passes of the bottom, then two equal passes, so the last
///  pass is never a sliver. A `max_depth` that is not a positive number gives a single pass.
pub fn pass_depths(total: f64, max_depth: f64) -> Vec<f64> {
    if !total.is_finite() || total <= Z_TOLERANCE {
        return Vec::new();
    }
    if !(max_depth.is_finite() && max_depth > 0.0) {
        return vec![total];
    }
    let mut depths = Vec::new();
    let mut depth = 0.0;
    while total - depth > Z_TOLERANCE {
        let remaining = total - depth;
        if remaining > 2.0 * max_depth {
            depth += max_depth;
            depths.push(depth);
        } else if remaining > max_depth {
            depths.push(depth + remaining / 2.0);
            depths.push(total);
            depth = total;
        } else {
            depths.push(total);
            depth = total;
        }
    }
    depths
}

/// Tool, speeds and feeds for a job
#[derive(Debug, Clone)]
pub struct GcodeSettings {
    pub name: Option<String>,
    pub tool: u32,
    /// Cutter diameter, mm
    pub tool_dia: f64,
    pub rpm: f64,
    /// Cutting feed, mm/min
    pub feed: f64,
    /// Feed for moving down into the work, mm/min
    pub plunge_feed: f64,
    /// Deepest single pass, mm
    pub max_depth: f64,
    /// Clearance height above the stock, mm
    pub safe_z: f64,
    pub coolant: bool,
}

impl GcodeSettings {
    /// Every speed, feed and size must be a positive number
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("tool_dia", self.tool_dia),
            ("rpm", self.rpm),
            ("feed", self.feed),
            ("plunge_feed", self.plunge_feed),
            ("max_depth", self.max_depth),
            ("safe_z", self.safe_z),
        ];
        for (name, value) in values.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("{name} must be a positive number, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

impl Default for GcodeSettings {
    fn default() -> Self {
        GcodeSettings {
            name: None,
            tool: 1,
            tool_dia: 3.175,
            rpm: 12000.0,
            feed: 300.0,
            plunge_feed: 60.0,
            max_depth: 0.5,
            safe_z: 2.0,
            coolant: false,
        }
    }
}

/// Machining options shared by the command line tools
#[derive(Debug, StructOpt)]
pub struct GcodeOpt {
    /// Name for the job
    #[structopt(short, long)]
    pub name: Option<String>,

    /// Tool number for the cut
    #[structopt(long, default_value = "1")]
    pub tool: u32,

    /// Diameter of the end mill, in mm
    #[structopt(long, default_value = "3.175")]
    pub tool_dia: f64,

    /// Tool RPM
    #[structopt(long, default_value = "12000")]
    pub rpm: f64,

    /// Feed rate, in mm/min
    #[structopt(long, default_value = "300")]
    pub feed: f64,

    /// Plunge rate, in mm/min
    #[structopt(long, default_value = "60")]
    pub plunge_feed: f64,

    /// Max depth to cut, in mm
    #[structopt(long, default_value = "0.5")]
    pub max_depth: f64,

    /// Safe height above the stock, in mm
    #[structopt(long, default_value = "2")]
    pub safe_z: f64,

    #[structopt(long)]
    pub coolant: bool,
}

impl GcodeOpt {
    pub fn settings(&self) -> GcodeSettings {
        GcodeSettings {
            name: self.name.clone(),
            tool: self.tool,
            tool_dia: self.tool_dia,
            rpm: self.rpm,
            feed: self.feed,
            plunge_feed: self.plunge_feed,
            max_depth: self.max_depth,
            safe_z: self.safe_z,
            coolant: self.coolant,
        }
    }
}

/// Write a complete job for `part` to a new file at `output`.
///
/// Returns the number of operations that were skipped.
pub fn write_job<R: Realize>(
    output: &Path,
    settings: GcodeSettings,
    part: &R,
) -> anyhow::Result<usize> {
    let file = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(output)
            .with_context(|| format!("Opening {}", output.display()))?,
    );
    let mut host = GcodeHost::new(file, settings)?;
    part.realize(&mut host)
        .with_context(|| format!("Writing {}", output.display()))?;
    let skipped = host.skipped();
    host.finish()?;
    info!(output = %output.display(), skipped, "job written");
    Ok(skipped)
}

/// Writes G-code for each host operation, in millimetres
pub struct GcodeHost<W: Write> {
    file: W,
    settings: GcodeSettings,
    /// Height of the current body, mm
    body_height: Option<f64>,
    skipped: usize,
}

const NOT_REACHABLE: &str = "not reachable from the top";

/// Which side of a loop the material to cut away is on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    /// Body outlines: keep the inside
    Outside,
    /// Through cuts: clear the inside
    Inside,
}

fn to_mm(p: Point2) -> Point2 {
    Point2::new(from_internal_length(p.x), from_internal_length(p.y))
}

/// Rough width of a loop, in mm. Exact for long even slots, less than the true width for rounder
///  shapes.
fn cut_width(outline: &ToothProfile) -> f64 {
    from_internal_length(2.0 * outline.area().abs() / outline.perimeter())
}

/// A piece of tool path in mm, from wherever the last one ended
struct PathSegment {
    end: Point2,
    /// Centre and direction, for arcs
    arc: Option<(Point2, Winding)>,
}

/// Split the longest edge of `outline` in half and walk the loop from there. Returns the middle of
///  that edge, its direction of travel there, and the path back round to it.
fn lead_in_path(outline: &ToothProfile) -> (Point2, Vector2<f64>, Vec<PathSegment>) {
    let edges = outline.edges();
    let longest = (0..edges.len())
        .max_by(|&a, &b| edges[a].length().total_cmp(&edges[b].length()))
        .unwrap_or(0);
    let split = &edges[longest];
    let arc = match split {
        Edge::Arc { arc, winding } => Some((to_mm(arc.center()), *winding)),
        Edge::Line { .. } => None,
    };

    let (start, end) = (to_mm(split.start()), to_mm(split.end()));
    let (mid, tangent) = match (split, arc) {
        (Edge::Arc { arc: spec, .. }, Some((center, winding))) => {
            let half = match winding {
                Winding::Ccw => spec.sweep() / 2.0,
                Winding::Cw => -spec.sweep() / 2.0,
            };
            let radial = Rotation2::new(half) * (start - center);
            let along = match winding {
                Winding::Ccw => Vector2::new(-radial.y, radial.x),
                Winding::Cw => Vector2::new(radial.y, -radial.x),
            };
            (center + radial, along.normalize())
        }
        _ => (nalgebra::center(&start, &end), (end - start).normalize()),
    };

    let mut path = vec![PathSegment { end, arc }];
    for edge in edges[longest + 1..].iter().chain(&edges[..longest]) {
        path.push(PathSegment {
            end: to_mm(edge.end()),
            arc: match edge {
                Edge::Arc { arc, winding } => Some((to_mm(arc.center()), *winding)),
                Edge::Line { .. } => None,
            },
        });
    }
    path.push(PathSegment { end: mid, arc });
    (mid, tangent, path)
}

impl<W: Write> GcodeHost<W> {
    /// Start a job, writing the preamble
    pub fn new(mut file: W, settings: GcodeSettings) -> Result<Self> {
        settings.validate()?;
        preamble(
            &settings.name,
            settings.tool,
            &format!("T{} D={} end mill", settings.tool, settings.tool_dia),
            settings.rpm,
            settings.coolant,
            &mut file,
        )?;
        Ok(GcodeHost {
            file,
            settings,
            body_height: None,
            skipped: 0,
        })
    }

    /// Operations that could not be machined and were left as comments
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Write the trailer and hand back the writer
    pub fn finish(mut self) -> Result<W> {
        trailer(&mut self.file)?;
        self.file.flush()?;
        Ok(self.file)
    }

    fn current_height(&self) -> Result<f64> {
        self.body_height.ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                "cut requested before any body was created",
            )
        })
    }

    fn skip(&mut self, what: &str, why: &str) -> Result<()> {
        warn!("{what} {why}, skipped");
        self.skipped += 1;
        gcode_comment(&mut self.file, &format!("SKIPPED: {what}, {why}"))
    }

    /// Trace `outline` at each pass depth down to `depth` below the top of the stock, with the tool
    ///  kept on the outside of the loop for `Side::Outside` and the inside for `Side::Inside`.
    fn contour(&mut self, outline: &ToothProfile, depth: f64, side: Side) -> Result<()> {
        let s = self.settings.clone();
        let ccw = outline.area() > 0.0;
        let tool_right = (side == Side::Outside) == ccw;
        let comp = if tool_right {
            Compensation::Right(s.tool)
        } else {
            Compensation::Left(s.tool)
        };

        let (mid, tangent, path) = lead_in_path(outline);
        let waste = if tool_right {
            Vector2::new(tangent.y, -tangent.x)
        } else {
            Vector2::new(-tangent.y, tangent.x)
        };
        let lead_length = match side {
            Side::Outside => s.tool_dia,
            Side::Inside => s.tool_dia.min(cut_width(outline) / 2.0),
        };
        let lead = mid + waste * lead_length;

        for d in pass_depths(depth, s.max_depth) {
            gcode_comment(&mut self.file, &format!("Contour pass at depth {d:.4}"))?;
            g0(&mut self.file, Move::z(s.safe_z))?;
            g0(&mut self.file, Move::xy(lead))?;
            g1(&mut self.file, Move::z(-d).feed(s.plunge_feed))?;
            g1(&mut self.file, Move::xy(mid).compensate(comp).feed(s.feed))?;
            let mut from = mid;
            for seg in &path {
                match seg.arc {
                    None => g1(&mut self.file, Move::xy(seg.end).feed(s.feed))?,
                    Some((center, winding)) => {
                        let m = Move::arc(seg.end, center - from).feed(s.feed);
                        match winding {
                            Winding::Ccw => g3(&mut self.file, m)?,
                            Winding::Cw => g2(&mut self.file, m)?,
                        }
                    }
                }
                from = seg.end;
            }
            g1(
                &mut self.file,
                Move::xy(lead).compensate(Compensation::Off).feed(s.feed),
            )?;
        }
        g0(&mut self.file, Move::z(s.safe_z))
    }

    /// Mill out a round hole at `center` (mm) through `depth`
    fn bore(&mut self, center: Point2, radius: f64, depth: f64) -> Result<()> {
        let s = self.settings.clone();
        let path_radius = radius - s.tool_dia / 2.0;
        g0(&mut self.file, Move::z(s.safe_z))?;
        if path_radius <= Z_TOLERANCE {
            // Hole no bigger than the cutter, just plunge
            gcode_comment(&mut self.file, &format!("Plunge {:.3}mm hole", radius * 2.0))?;
            g0(&mut self.file, Move::xy(center))?;
            g1(&mut self.file, Move::z(-depth).feed(s.plunge_feed))?;
            return g0(&mut self.file, Move::z(s.safe_z));
        }
        gcode_comment(&mut self.file, &format!("Bore {:.3}mm hole", radius * 2.0))?;
        let start = Point2::new(center.x + path_radius, center.y);
        let to_center = Vector2::new(-path_radius, 0.0);
        g0(&mut self.file, Move::xy(start))?;
        g1(&mut self.file, Move::z(0.0).feed(s.plunge_feed))?;
        // One turn of the helix per pass, then a flat turn to clean up the bottom
        for d in pass_depths(depth, s.max_depth) {
            g3(
                &mut self.file,
                Move::arc(start, to_center).at_z(-d).feed(s.feed),
            )?;
        }
        g3(&mut self.file, Move::arc(start, to_center).feed(s.feed))?;
        g0(&mut self.file, Move::z(s.safe_z))
    }

    fn is_through(z_start: f64, depth: f64, height: f64) -> bool {
        z_start <= Z_TOLERANCE && z_start + depth >= height - Z_TOLERANCE
    }
}

impl<W: Write> ModelingHost for GcodeHost<W> {
    type Error = Error;

    fn new_body(&mut self, name: &str, face: &Face, height: f64) -> Result<()> {
        let height = from_internal_length(height);
        info!(name, height, "machining body");
        self.body_height = Some(height);
        gcode_comment(&mut self.file, &format!("Body {name}, {height:.3}mm thick"))?;
        // Holes first, while the part is still held by the surrounding stock
        for hole in &face.holes {
            self.bore(to_mm(hole.center), from_internal_length(hole.radius), height)?;
        }
        self.contour(&face.outer, height, Side::Outside)
    }

    fn cut(&mut self, cut: &CutSpec) -> Result<()> {
        let height = self.current_height()?;
        let (z_start, depth) = (
            from_internal_length(cut.z_start),
            from_internal_length(cut.depth),
        );
        if !Self::is_through(z_start, depth, height) {
            return self.skip(
                &format!("cut from z={z_start:.3} to z={:.3}", z_start + depth),
                NOT_REACHABLE,
            );
        }
        let width = cut_width(&cut.outline);
        if width < self.settings.tool_dia {
            return self.skip(
                &format!("{width:.3}mm wide cut"),
                &format!("narrower than the {}mm cutter", self.settings.tool_dia),
            );
        }
        gcode_comment(&mut self.file, "Through cut")?;
        self.contour(&cut.outline, height, Side::Inside)
    }

    fn drill(&mut self, hole: &HoleSpec) -> Result<()> {
        let height = self.current_height()?;
        let (z_start, depth) = (
            from_internal_length(hole.z_start),
            from_internal_length(hole.depth),
        );
        if !Self::is_through(z_start, depth, height) {
            return self.skip(
                &format!(
                    "{:.3}mm hole from z={z_start:.3}",
                    from_internal_length(hole.circle.radius) * 2.0
                ),
                NOT_REACHABLE,
            );
        }
        self.bore(
            to_mm(hole.circle.center),
            from_internal_length(hole.circle.radius),
            height,
        )
    }

    fn drill_radial(&mut self, hole: &RadialHole) -> Result<()> {
        self.skip(
            &format!(
                "{:.3}mm radial hole at {:.2} degrees, {:.3}mm up",
                from_internal_length(hole.radius) * 2.0,
                hole.angle.to_degrees(),
                from_internal_length(hole.height)
            ),
            NOT_REACHABLE,
        )
    }
}
