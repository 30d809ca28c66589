//! G-Code generator for straight racks with trapezoidal teeth
use anyhow::Result;
use profile::gcode::{write_job, GcodeOpt};
use profile::params::PartFile;
use profile::{init_logging, ProfileBuilder, RackParameters};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "rack_gen", about = "A straight rack generator")]
struct Opt {
    /// Part file to take the [rack] table from. Flags below override it.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Tooth pitch, in mm
    #[structopt(short, long)]
    pitch: Option<f64>,

    /// Number of teeth
    #[structopt(short, long)]
    teeth: Option<u32>,

    /// Height of the teeth, in mm
    #[structopt(long)]
    tooth_height: Option<f64>,

    /// Height of the solid strip under the teeth, in mm
    #[structopt(long)]
    base_height: Option<f64>,

    /// Thickness of the rack, in mm
    #[structopt(short, long)]
    width: Option<f64>,

    #[structopt(flatten)]
    gcode: GcodeOpt,

    /// Output file for the resulting G code
    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,
}

impl Opt {
    fn params(&self) -> Result<RackParameters> {
        let mut params = match &self.config {
            Some(path) => PartFile::load(path)?.rack.unwrap_or_default(),
            None => RackParameters::default(),
        };
        if let Some(p) = self.pitch {
            params.pitch = p;
        }
        if let Some(teeth) = self.teeth {
            params.tooth_count = teeth;
        }
        if let Some(h) = self.tooth_height {
            params.tooth_height = h;
        }
        if let Some(h) = self.base_height {
            params.base_height = h;
        }
        if let Some(w) = self.width {
            params.thickness = w;
        }
        Ok(params)
    }
}

fn help_text(params: &RackParameters) {
    println!(
        "Before cut:
        - Fix stock at least {:.1}mm long, {:.1}mm wide and {}mm thick
        - Set home to the bottom left corner of the rack, Z0 on the top face",
        params.pitch * params.tooth_count as f64,
        params.base_height + params.tooth_height,
        params.thickness
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
