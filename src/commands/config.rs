//! Config command implementation.
//!
//! Generates configuration files in various formats.

use anyhow::Context;
use std::fs;
use std::path::PathBuf;

use crate::cli::{ConfigFormat, LogLevel};
use crate::config::{render_config, Config};
use lsfd::OutputFormat;

/// Configuration written by `lsfd config`: every field set to its default.
pub fn sample_config() -> Config {
    Config {
        columns: None,
        output: Some(OutputFormat::Table),
        noheadings: Some(false),
        notruncate: Some(false),
        threads: Some(false),
        sysroot: None,
        max_processes: None,
        log_level: Some(LogLevel::Warn),
    }
}

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = sample_config();
    let output = output.unwrap_or_else(|| PathBuf::from("lsfd.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# lsfd Configuration
# ===================
#
# Output
# ------
# columns: null                # Column list, e.g. "PID,FD,NAME" or "+POS,FLAGS"
# output: "table"              # table, raw, json
# noheadings: false            # Don't print headings
# notruncate: false            # Don't truncate text in columns
#
# Collection
# ----------
# threads: false               # List in threads level
# sysroot: null                # Directory used as system root
# max_processes: null          # Maximum processes to scan
#
# Logging
# -------
# log_level: "warn"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
