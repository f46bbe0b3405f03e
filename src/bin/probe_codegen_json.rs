//! probe-codegen-json: generate the JSON probe listing.

use std::process::ExitCode;

use clap::Parser;
use probe_codegen::cli::{main_with, GenerateArgs};
use probe_codegen::Artifact;

#[derive(Parser)]
#[command(name = "probe-codegen-json")]
#[command(about = "Validate telemetry probe definitions and write them out as JSON")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    args: GenerateArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    main_with(cli.args, Artifact::Json)
}
