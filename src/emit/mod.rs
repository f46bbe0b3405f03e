//! Artifact emitters.
//!
//! Every artifact is rendered completely in memory from a [`ProbeSet`];
//! writing it to disk is left to [`crate::output`], so a failure halfway
//! through rendering never leaves a partial file behind.
//!
//! - [`cpp`]: the C++ data tables
//! - [`json`]: the JSON probe listing
//! - [`enums`]: the C++ histogram and event ID enums

pub mod cpp;
pub mod enums;
pub mod json;

use std::fmt;

use crate::config::Limits;
use crate::error::Result;
use crate::order::ProbeSet;

pub use cpp::CppDataEmitter;
pub use enums::EnumsEmitter;
pub use json::JsonEmitter;

/// Banner placed at the top of every generated C++ file.
pub(crate) const GENERATED_BANNER: &str =
    "/* This file is auto-generated by probe-codegen. DO NOT EDIT! */";

/// Trait implemented by each artifact format.
pub trait Emitter {
    /// Render the artifact for `probes`.
    fn emit(&self, probes: &ProbeSet) -> Result<String>;
}

/// The artifact a binary produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// `TelemetryProbeData.h`-style C++ tables.
    CppData,
    Json,
    /// C++ `HistogramID`/`EventID` enums.
    CppEnums,
}

impl Artifact {
    pub fn emitter(self, limits: &Limits) -> Box<dyn Emitter> {
        match self {
            Artifact::CppData => Box::new(CppDataEmitter::new(limits.clone())),
            Artifact::Json => Box::new(JsonEmitter),
            Artifact::CppEnums => Box::new(EnumsEmitter),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::CppData => write!(f, "C++ probe data"),
            Artifact::Json => write!(f, "JSON probe listing"),
            Artifact::CppEnums => write!(f, "C++ probe enums"),
        }
    }
}
