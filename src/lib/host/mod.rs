//! The narrow interface between the profile builders and whatever turns profiles into parts.
use serde::Serialize;
use std::convert::Infallible;

use crate::profile::{CutSpec, Face, HoleSpec, RadialHole};

/// A solid modeling backend. Lengths are internal units.
///
/// Operations apply to the most recently created body.
pub trait ModelingHost {
    type Error;

    /// Extrude `face` by `height` into a new body
    fn new_body(&mut self, name: &str, face: &Face, height: f64) -> Result<(), Self::Error>;

    /// Remove the material swept by `cut`
    fn cut(&mut self, cut: &CutSpec) -> Result<(), Self::Error>;

    /// Drill a hole along the extrusion axis
    fn drill(&mut self, hole: &HoleSpec) -> Result<(), Self::Error>;

    /// Drill a hole in from the rim
    fn drill_radial(&mut self, hole: &RadialHole) -> Result<(), Self::Error>;
}

/// A built part that knows which host operations make it
pub trait Realize {
    fn realize<H: ModelingHost>(&self, host: &mut H) -> Result<(), H::Error>;
}

/// One recorded host operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostCall {
    NewBody {
        name: String,
        face: Face,
        height: f64,
    },
    Cut(CutSpec),
    Drill(HoleSpec),
    DrillRadial(RadialHole),
}

/// A host that records what it is asked to do, and nothing else
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
}

impl RecordingHost {
    pub fn bodies(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HostCall::NewBody { .. }))
            .count()
    }

    pub fn cuts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HostCall::Cut(_)))
            .count()
    }

    pub fn holes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HostCall::Drill(_) | HostCall::DrillRadial(_)))
            .count()
    }
}

impl ModelingHost for RecordingHost {
    type Error = Infallible;

    fn new_body(&mut self, name: &str, face: &Face, height: f64) -> Result<(), Infallible> {
        self.calls.push(HostCall::NewBody {
            name: name.to_string(),
            face: face.clone(),
            height,
        });
        Ok(())
    }

    fn cut(&mut self, cut: &CutSpec) -> Result<(), Infallible> {
        self.calls.push(HostCall::Cut(cut.clone()));
        Ok(())
    }

    fn drill(&mut self, hole: &HoleSpec) -> Result<(), Infallible> {
        self.calls.push(HostCall::Drill(*hole));
        Ok(())
    }

    fn drill_radial(&mut self, hole: &RadialHole) -> Result<(), Infallible> {
        self.calls.push(HostCall::DrillRadial(*hole));
        Ok(())
    }
}
