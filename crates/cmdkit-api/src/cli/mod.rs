//! CLI command definitions for the `cmdkit` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod operations;
pub mod run;
pub mod vars;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run command documents against persisted, scoped variables.
#[derive(Parser)]
#[command(name = "cmdkit", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit diagnostics as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Data directory holding config.toml and persisted variables.
    #[arg(long, global = true, env = "CMDKIT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command document (YAML or JSON).
    Run {
        /// Path to the command document.
        file: PathBuf,

        /// Session whose variables are loaded and saved.
        #[arg(long)]
        session: Option<String>,

        /// Command argument; the value is parsed as JSON when it is valid JSON.
        #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },

    /// List persisted variables.
    #[command(alias = "ls")]
    Vars {
        /// Only this scope (builtin, application, session).
        #[arg(long)]
        scope: Option<String>,

        /// Session to list.
        #[arg(long)]
        session: Option<String>,
    },

    /// Write a variable and persist it.
    Set {
        /// Variable path, e.g. `name` or `list[key]`.
        path: String,

        /// Value; parsed as JSON when it is valid JSON.
        value: String,

        /// Target scope (session or application).
        #[arg(long, default_value = "session")]
        scope: String,

        /// Session to write to.
        #[arg(long)]
        session: Option<String>,
    },

    /// List the registered operations and their parameters.
    Operations,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Parse `KEY=VALUE`. Only the first `=` splits.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
