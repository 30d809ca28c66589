//! G-Code generator for curved racks made in several divisions, one output file per division
use anyhow::{anyhow, Result};
use profile::gcode::{write_job, GcodeOpt};
use profile::params::PartFile;
use profile::{init_logging, ArcRackParameters, PartitionPolicy, ProfileBuilder};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tracing::{info, warn};

#[derive(Debug, StructOpt)]
#[structopt(name = "arc_rack_gen", about = "Curved rack divisions with tooth windows")]
struct Opt {
    /// Part file to take the [arc_rack] table from. Flags below override it.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Pitch radius, in mm
    #[structopt(short, long)]
    radius: Option<f64>,

    /// Start angle, in degrees
    #[structopt(long)]
    start: Option<f64>,

    /// End angle, in degrees
    #[structopt(long)]
    end: Option<f64>,

    /// Number of divisions
    #[structopt(short, long)]
    divisions: Option<usize>,

    /// Share leftover holes out one at a time instead of giving them all to the last division
    #[structopt(long)]
    balanced: bool,

    #[structopt(flatten)]
    gcode: GcodeOpt,

    /// Output file for the resulting G code. Each division gets `_part<N>` added to the name.
    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,
}

impl Opt {
    fn params(&self) -> Result<ArcRackParameters> {
        let mut params = match &self.config {
            Some(path) => PartFile::load(path)?.arc_rack.unwrap_or_default(),
            None => ArcRackParameters::default(),
        };
        if let Some(r) = self.radius {
            params.radius = r;
        }
        if let Some(a) = self.start {
            params.start_angle = a;
        }
        if let Some(a) = self.end {
            params.end_angle = a;
        }
        if let Some(d) = self.divisions {
            params.divisions = d;
        }
        if self.balanced {
            params.partition = PartitionPolicy::Balanced;
        }
        Ok(params)
    }
}

/// `rack.nc` becomes `rack_part3.nc`
fn division_path(output: &Path, part: usize) -> Result<PathBuf> {
    let stem = output
        .file_stem()
        .ok_or_else(|| anyhow!("Output {} has no file name", output.display()))?
        .to_string_lossy();
    let name = match output.extension() {
        Some(ext) => format!("{stem}_part{part}.{}", ext.to_string_lossy()),
        None => format!("{stem}_part{part}"),
    };
    Ok(output.with_file_name(name))
}

fn help_text(params: &ArcRackParameters) {
    println!(
        "Before cut:
        - Set home to the centre of the rack circle, {}mm from the parts, Z0 on the top face
        - Windows do not go through the full height, cut them separately",
        params.radius
    )
}

fn main() -> Result<()> {
    init_logging()?;
    let opt = Opt::from_args();
    let params = opt.params()?;
    let divisions = params.build()?;
    help_text(&params);

    for division in &divisions {
        let path = division_path(&opt.output, division.index + 1)?;
        info!(
            part = division.index + 1,
            holes = division.hole_count,
            start = division.start_angle.to_degrees(),
            "division"
        );
        if division.hole_count == 0 {
            warn!(part = division.index + 1, "division has no windows");
        }
        write_job(&path, opt.gcode.settings(), division)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_path() {
        assert_eq!(
            division_path(Path::new("out/rack.nc"), 3).unwrap(),
            PathBuf::from("out/rack_part3.nc")
        );
        assert_eq!(
            division_path(Path::new("rack"), 1).unwrap(),
            PathBuf::from("rack_part1")
        );
    }
}
