//! G-Code generator for a single piece curved rack with a back plate for bolting down
use anyhow::Result;
use profile::gcode::{write_job, GcodeOpt};
use profile::params::PartFile;
use profile::{init_logging, MountingRackParameters, ProfileBuilder};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "mount_rack_gen", about = "A curved mounting rack generator")]
struct Opt {
    /// Part file to take the [mounting_rack] table from. Flags below override it.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Pitch radius, in mm
    #[structopt(short, long)]
    radius: Option<f64>,

    /// Number of tooth windows
    #[structopt(long)]
    holes: Option<usize>,

    /// Height of the rack, in mm
    #[structopt(long)]
    height: Option<f64>,

    /// Bolt hole diameter, in mm
    #[structopt(long)]
    screw_dia: Option<f64>,

    #[structopt(flatten)]
    gcode: GcodeOpt,

    /// Output file for the resulting G code
    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,
}

impl Opt {
    fn params(&self) -> Result<MountingRackParameters> {
        let mut params = match &self.config {
            Some(path) => PartFile::load(path)?.mounting_rack.unwrap_or_default(),
            None => MountingRackParameters::default(),
        };
        if let Some(r) = self.radius {
            params.radius = r;
        }
        if let Some(h) = self.holes {
            params.hole_count = h;
        }
        if let Some(h) = self.height {
            params.rack_height = h;
        }
        if let Some(d) = self.screw_dia {
            params.screw_diameter = d;
        }
        Ok(params)
    }
}

fn help_text(params: &MountingRackParameters) {
    println!(
        "Before cut:
        - Set home to the centre of the rack circle, {}mm from the part, Z0 on the top face
        - The windows and the {}mm plate slit are blind, cut them separately",
        params.radius, params.slit_width
    )
}

fn main() -> Result<()> {
    init_logging()?;
    let opt = Opt::from_args();
    let params = opt.params()?;
    let rack = params.build()?;
    help_text(&params);

    write_job(&opt.output, opt.gcode.settings(), &rack)?;
    Ok(())
}
