// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::StreamBackend;

/// Command-line arguments for `logtap`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "logtap",
    version,
    about = "Follow the stdout/stderr of every task on this host and forward each line as a structured record.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). Missing file means all defaults.
    #[arg(long, value_name = "PATH", default_value = "Logtap.toml")]
    pub config: PathBuf,

    /// Manifest file to watch; overrides `[agent].manifest`.
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Stream backend; overrides `[agent].backend`.
    #[arg(long, value_enum, value_name = "BACKEND")]
    pub backend: Option<BackendArg>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LOGTAP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Read the manifest once, print the declared tasks, and exit.
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

/// Stream backend as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum BackendArg {
    Socket,
    File,
}

impl From<BackendArg> for StreamBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Socket => StreamBackend::Socket,
            BackendArg::File => StreamBackend::File,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
