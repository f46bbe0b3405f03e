//! probe-codegen-enums: generate the histogram and event ID enums.

use std::process::ExitCode;

use clap::Parser;
use probe_codegen::cli::{main_with, GenerateArgs};
use probe_codegen::Artifact;

#[derive(Parser)]
#[command(name = "probe-codegen-enums")]
#[command(about = "Validate telemetry probe definitions and generate the probe ID enums")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    args: GenerateArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    main_with(cli.args, Artifact::CppEnums)
}
