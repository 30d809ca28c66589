//! G-Code generator for cutting straight flanked gears and pinions from sheet stock
use anyhow::Result;
use profile::gcode::{write_job, GcodeOpt};
use profile::params::PartFile;
use profile::{init_logging, GearParameters, ProfileBuilder};
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::warn;

#[derive(Debug, StructOpt)]
#[structopt(name = "gear_gen", about = "A simple straight flanked gear generator")]
struct Opt {
    /// Part file to take the [gear] table from. Flags below override it.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Number of gear teeth
    #[structopt(short, long)]
    teeth: Option<u32>,

    /// Tip circle diameter, in mm
    #[structopt(long)]
    outer_dia: Option<f64>,

    /// Root circle diameter, in mm
    #[structopt(long)]
    root_dia: Option<f64>,

    /// Tooth chord width at the tip, in mm
    #[structopt(long)]
    tip_width: Option<f64>,

    /// Tooth chord width at the root, in mm
    #[structopt(long)]
    root_width: Option<f64>,

    /// Shaft hole diameter, in mm
    #[structopt(long)]
    bore_dia: Option<f64>,

    /// Thickness of the gear, in mm
    #[structopt(short, long)]
    width: Option<f64>,

    #[structopt(flatten)]
    gcode: GcodeOpt,

    /// Output file for the resulting G code
    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,
}

impl Opt {
    fn params(&self) -> Result<GearParameters> {
        let mut params = match &self.config {
            Some(path) => PartFile::load(path)?.gear.unwrap_or_default(),
            None => GearParameters::default(),
        };
        if let Some(teeth) = self.teeth {
            params.tooth_count = teeth;
        }
        if let Some(d) = self.outer_dia {
            params.outer_diameter = d;
        }
        if let Some(d) = self.root_dia {
            params.root_diameter = d;
        }
        if let Some(w) = self.tip_width {
            params.tip_chord_width = w;
        }
        if let Some(w) = self.root_width {
            params.root_chord_width = w;
        }
        if let Some(d) = self.bore_dia {
            params.bore_diameter = d;
        }
        if let Some(w) = self.width {
            params.thickness = w;
        }
        Ok(params)
    }
}

fn help_text(params: &GearParameters) {
    println!(
        "Before cut:
        - Fix stock at least {}mm square and {}mm thick
        - Set home to the gear centre, Z0 on the top face
        - Drill the {}mm grub screw hole by hand afterwards",
        params.outer_diameter.ceil() + 10.0,
        params.thickness,
        params.screw_hole_diameter
    )
}

fn main() -> Result<()> {
    init_logging()?;
    let opt = Opt::from_args();
    let params = opt.params()?;
    let gear = params.build()?;
    help_text(&params);

    let skipped = write_job(&opt.output, opt.gcode.settings(), &gear)?;
    if skipped > 0 {
        warn!(skipped, "some features need finishing by hand");
    }
    Ok(())
}
