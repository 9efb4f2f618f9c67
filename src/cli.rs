//! CLI arguments and subcommands for lsfd.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use lsfd::OutputFormat;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "lsfd",
    about = "List file descriptors",
    long_about = "List file descriptors.\n\n\
                  Lists the open files of every process: descriptors, file-backed memory \
                  mappings, the executable, the working and root directories and the \
                  namespace handles.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// List in threads level
    #[arg(short = 'l', long)]
    pub threads: bool,

    /// Use JSON output format
    #[arg(short = 'J', long, conflicts_with = "raw")]
    pub json: bool,

    /// Use raw output format
    #[arg(short = 'r', long)]
    pub raw: bool,

    /// Don't print headings
    #[arg(short = 'n', long)]
    pub noheadings: bool,

    /// Output columns (a leading '+' appends to the default list)
    #[arg(short = 'o', long, value_name = "LIST")]
    pub output: Option<String>,

    /// Don't truncate text in columns
    #[arg(short = 'u', long)]
    pub notruncate: bool,

    /// Use specified directory as system root
    #[arg(long, value_name = "DIR")]
    pub sysroot: Option<PathBuf>,

    /// Maximum number of processes to scan
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

impl Args {
    /// Output format selected by -J / -r, if any.
    pub fn output_format(&self) -> Option<OutputFormat> {
        if self.json {
            Some(OutputFormat::Json)
        } else if self.raw {
            Some(OutputFormat::Raw)
        } else {
            None
        }
    }
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the available output columns
    Columns {
        /// Show the JSON type of each column
        #[arg(long)]
        types: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ('-' for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Check runtime requirements and permissions
    CheckRequirements,
}
