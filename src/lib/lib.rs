//! Parametric tooth and rack profile generation.
//!
//! Every builder is a pure function from a parameter struct (millimetres) to closed profiles in
//!  internal units (centimetres). What happens to a profile afterwards is up to a `ModelingHost`.
use thiserror::Error;

pub mod arc_rack;
pub mod gcode;
pub mod gear;
pub mod geometry;
pub mod host;
pub mod params;
pub mod profile;
pub mod rack;
pub mod units;

pub use arc_rack::{
    build_arc_rack_divisions, build_mounting_rack, partition_holes, ArcRackParameters,
    MountingRack, MountingRackParameters, PartitionPolicy, RackDivision,
};
pub use gear::{build_gear_profile, GearAngles, GearParameters, GearProfile};
pub use geometry::{ArcSpec, Circle, Edge, Point2, Winding};
pub use host::{HostCall, ModelingHost, Realize, RecordingHost};
pub use profile::{CutSpec, Face, HoleSpec, ProfileAccumulator, RadialHole, ToothProfile};
pub use rack::{build_rack_profile, RackParameters, RackProfile};

/// Errors from building a profile
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// A parameter breaks one of its invariants. Nothing has been computed yet.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The parameters are individually fine, but the geometry they produce is not
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The accumulated loop does not come back to its first point
    #[error("profile is not closed after edge {index}: gap of {gap:.9}")]
    OpenProfile { index: usize, gap: f64 },
}

impl ProfileError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ProfileError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Something that can be turned into profiles
pub trait ProfileBuilder {
    type Output;

    fn build(&self) -> Result<Self::Output, ProfileError>;
}

/// Check that `value` is a finite, strictly positive number
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), ProfileError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProfileError::invalid(
            name,
            format!("must be a positive number, got {value}"),
        ))
    }
}

/// Set up `tracing` output for the command line tools.
///
/// Honours `RUST_LOG`, defaulting to `info`. Logs go to stderr, so generated G-code or JSON on
///  stdout is left alone.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}
