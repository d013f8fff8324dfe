//! Whitelist CLI - Command-line interface for Merkle whitelists.
//!
//! Builds whitelist artifacts, hands out proofs and verifies membership.

pub mod commands;
pub mod config;
pub mod output;
pub mod telemetry;

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = commands::Cli::parse();

    let config = match config::CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("Error: invalid config: {e:#}"));
            return ExitCode::FAILURE;
        }
    };

    let log_level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    if let Err(e) = telemetry::init_telemetry(log_level, config.json_logs) {
        output::print_warning(&format!("logging disabled: {e}"));
    }

    // Execute command
    match commands::execute(cli, config) {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}
