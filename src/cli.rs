//! Command-line surface shared by the artifact binaries.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Args};
use tracing::Level;

use crate::config::Config;
use crate::emit::Artifact;
use crate::probe::Version;

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Path of the artifact to generate
    pub output: PathBuf,

    /// Probe definition files (JSON, or YAML with a .yaml/.yml extension), in order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Application version; probes expiring at or before it produce warnings
    #[arg(long, value_name = "VERSION")]
    pub app_version: Option<Version>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl From<GenerateArgs> for Config {
    fn from(args: GenerateArgs) -> Self {
        Config {
            verbosity: args.verbose,
            output: args.output,
            inputs: args.inputs,
            app_version: args.app_version,
            ..Config::default()
        }
    }
}

/// Install a stderr `tracing` subscriber for the given verbosity.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

pub fn run(args: GenerateArgs, artifact: Artifact) -> Result<()> {
    let config = Config::from(args);
    init_logging(config.verbosity)?;
    crate::generate(&config, artifact)?;
    Ok(())
}

/// Run a binary to completion, printing a single diagnostic line on failure.
pub fn main_with(args: GenerateArgs, artifact: Artifact) -> ExitCode {
    match run(args, artifact) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
