//! dtobind CLI - check XML DTO mappings and bind JSON documents through them
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

mod cli;
mod error;
mod handlers;
mod logging;

use cli::{Cli, Commands};
use colored::control;
use error::Result;
use logging::LoggingConfig;
use std::io::{self, Write};
use std::process;
use tracing::instrument;

fn main() {
    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));
            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli), fields(command = ?cli.command))]
fn run(cli: Cli) -> Result<()> {
    let config = handlers::load_config(cli.config.as_deref())?;
    tracing::info!(verbosity = cli.verbosity_level(), "Executing command");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Check(args) => handlers::handle_check(args, &config, cli.output, &mut out)?,
        Commands::Bind(args) => handlers::handle_bind(args, &config, cli.output, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
    }
    logging_config.ansi = cli.use_color();

    logging::init_logging(logging_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["dtobind", "-v", "check", "mappings.xml"]);
        assert_eq!(cli.verbosity_level(), 1);

        let cli = Cli::parse_from(["dtobind", "--no-color", "bind", "-t", "PersonDTO", "a.json"]);
        assert!(!cli.use_color());
        assert!(matches!(cli.command, Commands::Bind(_)));
    }
}
