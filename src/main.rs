//! Build every part described in a TOML part file and dump the profiles as JSON
use anyhow::{bail, Context, Result};
use profile::host::RecordingHost;
use profile::params::PartFile;
use profile::{init_logging, Realize};
use std::fs::OpenOptions;
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::info;

#[derive(Debug, StructOpt)]
#[structopt(name = "profile_gen", about = "Gear and rack profile generator")]
struct Opt {
    /// Part file with [gear], [rack], [arc_rack] and [mounting_rack] tables
    #[structopt(short, long, parse(from_os_str))]
    config: PathBuf,

    /// Dump the modeling operations for each part instead of the profiles
    #[structopt(long)]
    operations: bool,

    /// Output file for the JSON, stdout if not given
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging()?;
    let opt = Opt::from_args();
    let parts_file = PartFile::load(&opt.config)?;
    if parts_file.is_empty() {
        bail!("{} describes no parts", opt.config.display());
    }
    let parts = parts_file.build()?;

    let mut out: Box<dyn Write> = match &opt.output {
        Some(path) => Box::new(BufWriter::new(
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("Opening {}", path.display()))?,
        )),
        None => Box::new(stdout()),
    };
    if opt.operations {
        let mut host = RecordingHost::default();
        match parts.realize(&mut host) {
            Ok(()) => {}
            Err(never) => match never {},
        }
        info!(calls = host.calls.len(), "recorded operations");
        serde_json::to_writer_pretty(&mut out, &host.calls)?;
    } else {
        serde_json::to_writer_pretty(&mut out, &parts)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
