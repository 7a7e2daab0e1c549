//! Command-line interface argument parsing and definitions
//!
//! The CLI is defined with clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// dtobind - bind source documents into DTOs described by XML mappings
#[derive(Parser, Debug)]
#[command(
    name = "dtobind",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a binder configuration file (JSON)
    #[arg(short, long, global = true, env = "DTOBIND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse an XML mapping document and inspect every DTO it describes
    Check(CheckArgs),

    /// Bind JSON source documents into a DTO and print the result
    Bind(BindArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the XML mapping document
    #[arg(value_name = "MAPPING")]
    pub mapping: PathBuf,
}

/// Arguments for the bind command
#[derive(Parser, Debug)]
pub struct BindArgs {
    /// XML mapping document, overriding the configured mapping source
    #[arg(short, long, value_name = "MAPPING")]
    pub mapping: Option<PathBuf>,

    /// DTO type to bind into
    #[arg(short, long, value_name = "TYPE")]
    pub target: String,

    /// Source JSON documents, in source bean order
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Treat each source document as a list and bind element-wise
    #[arg(long)]
    pub each: bool,

    /// Do not create missing intermediate objects while writing nested paths
    #[arg(long)]
    pub no_make_up: bool,
}

/// How results are rendered on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Readable text, pretty-printed JSON
    Human,
    /// Compact JSON
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}
