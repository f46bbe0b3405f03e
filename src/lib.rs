//! probe-codegen library - shared by the artifact binaries.
//!
//! Telemetry probes (histograms and events) are declared in JSON or YAML
//! definition files. This crate validates them, numbers them, packs their
//! strings and bucket layouts into compact tables and renders those tables
//! as C++ or JSON.
//!
//! # Modules
//!
//! - [`loader`] - reading definition files in order
//! - [`probe`] - the typed probe model and its validation rules
//! - [`validate`] - raw definitions to validated probes
//! - [`order`] - deterministic numbering
//! - [`interner`] - deduplicated C string tables
//! - [`tables`] - auxiliary tables for histograms and events
//! - [`emit`] - artifact renderers
//! - [`output`] - atomic artifact writing
//!
//! # Example
//!
//! ```no_run
//! use probe_codegen::{generate, Artifact, Config};
//! use std::path::PathBuf;
//!
//! let config = Config {
//!     output: PathBuf::from("TelemetryProbeData.h"),
//!     inputs: vec![PathBuf::from("Histograms.json"), PathBuf::from("Events.yaml")],
//!     ..Config::default()
//! };
//! let report = generate(&config, Artifact::CppData).expect("generation failed");
//! println!("{} histograms, {} events", report.histograms, report.events);
//! ```

pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod interner;
pub mod loader;
pub mod order;
pub mod output;
pub mod probe;
pub mod tables;
pub mod validate;

use tracing::{info, warn};

pub use config::{Config, Limits};
pub use emit::{Artifact, Emitter};
pub use error::{ProbeError, Rule, Warning};
pub use order::ProbeSet;

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub histograms: usize,
    pub events: usize,
    pub bytes: usize,
    pub warnings: Vec<Warning>,
}

/// Load, validate and render `config.inputs` into `config.output`.
///
/// Nothing is written unless every probe validates and the artifact
/// renders completely.
pub fn generate(config: &Config, artifact: Artifact) -> error::Result<Report> {
    let raw = loader::load(&config.inputs)?;
    let validated =
        validate::Validator::new(&config.limits, config.app_version.as_ref()).validate(&raw)?;
    for warning in &validated.warnings {
        warn!("{warning}");
    }

    let probes = ProbeSet::new(validated.probes);
    if probes.is_empty() {
        warn!("No probes defined in {} input file(s)", config.inputs.len());
    }
    info!(
        "Generating {artifact} for {} probes ({} histograms, {} events)",
        probes.len(),
        probes.histograms().len(),
        probes.events().len()
    );
    let contents = artifact.emitter(&config.limits).emit(&probes)?;
    output::write_artifact(&config.output, contents.as_bytes())?;
    info!("Wrote {} ({} bytes)", config.output.display(), contents.len());

    Ok(Report {
        histograms: probes.histograms().len(),
        events: probes.events().len(),
        bytes: contents.len(),
        warnings: validated.warnings,
    })
}
