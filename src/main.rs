//! probe-codegen: generate the C++ probe data tables.

use std::process::ExitCode;

use clap::Parser;
use probe_codegen::cli::{main_with, GenerateArgs};
use probe_codegen::Artifact;

#[derive(Parser)]
#[command(name = "probe-codegen")]
#[command(about = "Validate telemetry probe definitions and generate the C++ data tables")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    args: GenerateArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    main_with(cli.args, Artifact::CppData)
}
