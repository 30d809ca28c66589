//! Part files: TOML descriptions of one or more parts to generate.
//!
//! ```toml
//! [gear]
//! tooth_count = 12
//! outer_diameter = 50.0
//!
//! [arc_rack]
//! divisions = 3
//! partition = "balanced"
//! ```
//!
//! Any field left out takes the same default as the command line tools.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

use crate::arc_rack::{ArcRackParameters, MountingRack, MountingRackParameters, RackDivision};
use crate::gear::{GearParameters, GearProfile};
use crate::host::{ModelingHost, Realize};
use crate::rack::{RackParameters, RackProfile};
use crate::ProfileBuilder;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartFile {
    pub gear: Option<GearParameters>,
    pub rack: Option<RackParameters>,
    pub arc_rack: Option<ArcRackParameters>,
    pub mounting_rack: Option<MountingRackParameters>,
}

/// Everything built from a part file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gear: Option<GearProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rack: Option<RackProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arc_rack: Option<Vec<RackDivision>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mounting_rack: Option<MountingRack>,
}

fn build_section<P: ProfileBuilder>(section: &str, params: &Option<P>) -> Result<Option<P::Output>> {
    params
        .as_ref()
        .map(|p| p.build().with_context(|| format!("Building [{section}]")))
        .transpose()
}

impl PartFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_to_string(path)
            .with_context(|| format!("Reading part file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Parsing part file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn is_empty(&self) -> bool {
        self.gear.is_none()
            && self.rack.is_none()
            && self.arc_rack.is_none()
            && self.mounting_rack.is_none()
    }

    /// Build every part in the file. Stops at the first part that fails.
    pub fn build(&self) -> Result<PartSet> {
        Ok(PartSet {
            gear: build_section("gear", &self.gear)?,
            rack: build_section("rack", &self.rack)?,
            arc_rack: build_section("arc_rack", &self.arc_rack)?,
            mounting_rack: build_section("mounting_rack", &self.mounting_rack)?,
        })
    }
}

impl Realize for PartSet {
    fn realize<H: ModelingHost>(&self, host: &mut H) -> std::result::Result<(), H::Error> {
        if let Some(gear) = &self.gear {
            gear.realize(host)?;
        }
        if let Some(rack) = &self.rack {
            rack.realize(host)?;
        }
        for division in self.arc_rack.iter().flatten() {
            division.realize(host)?;
        }
        if let Some(rack) = &self.mounting_rack {
            rack.realize(host)?;
        }
        Ok(())
    }
}
