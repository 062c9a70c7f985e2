mod cli;
mod commands;
mod error;
mod output;

use std::panic;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

const EXIT_TOOL_FAILURE: u8 = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match panic::catch_unwind(|| run(&cli)) {
        Ok(Ok(code)) => ExitCode::from(code),
        Ok(Err(err)) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
        Err(_) => ExitCode::from(EXIT_TOOL_FAILURE),
    }
}

fn run(cli: &Cli) -> Result<u8, CliError> {
    let output = commands::run(cli)?;
    output::render(&output, cli.format, cli.pretty)?;
    Ok(output.exit_code)
}

/// Logs go to stderr so stdout carries only the command output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
