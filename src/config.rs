//! Generator configuration.

use std::path::PathBuf;

use crate::probe::Version;

/// Policy limits enforced while validating and packing probes.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum length of a probe name.
    pub max_name_len: usize,
    /// Maximum length of an event's own name, methods and objects.
    pub max_identifier_len: usize,
    /// Maximum number of labels of a categorical histogram.
    pub max_labels: usize,
    /// Maximum number of allowed keys of a keyed histogram.
    pub max_keys: usize,
    /// Maximum number of extra keys of an event.
    pub max_extra_keys: usize,
    /// Largest index into the bucket lower bound table (`int16_t`).
    pub max_range_offset: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: 80,
            max_identifier_len: 40,
            max_labels: 100,
            max_keys: 30,
            max_extra_keys: 10,
            max_range_offset: i16::MAX as usize,
        }
    }
}

/// Configuration for one generator run.
/// This struct contains all the runtime options needed by `generate()`,
/// separated from the CLI parsing concerns.
#[derive(Debug)]
pub struct Config {
    /// Verbosity level (0 = warn, 1 = info, 2 = debug, 3+ = trace)
    pub verbosity: u8,
    /// Artifact to write
    pub output: PathBuf,
    /// Probe definition files, in processing order
    pub inputs: Vec<PathBuf>,
    /// Application version used to report expired probes
    pub app_version: Option<Version>,
    pub limits: Limits,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbosity: 0,
            output: PathBuf::from("TelemetryProbeData.h"),
            inputs: Vec::new(),
            app_version: None,
            limits: Limits::default(),
        }
    }
}
