// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `somaticdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "somaticdag",
    version,
    about = "Compile a somatic variant-calling run configuration into a resource-annotated task graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the run configuration (TOML).
    #[arg(long, value_name = "PATH", default_value = "Somatic.toml")]
    pub config: String,

    /// Write the graph (JSON) here instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SOMATICDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build and validate the graph, print a per-stage summary, write nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
