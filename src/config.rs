//! Configuration management for lsfd.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat, LogLevel};
use lsfd::{ColumnSet, OutputFormat};

/// Locations searched when no config file is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/lsfd/lsfd.yaml",
    "/etc/lsfd/lsfd.yml",
    "/etc/lsfd/lsfd.json",
    "./lsfd.yaml",
    "./lsfd.yml",
    "./lsfd.json",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Output
    /// Comma separated column list; a leading '+' appends to the defaults.
    pub columns: Option<String>,
    pub output: Option<OutputFormat>,
    pub noheadings: Option<bool>,
    pub notruncate: Option<bool>,

    // Collection
    pub threads: Option<bool>,
    pub sysroot: Option<PathBuf>,
    #[serde(alias = "max-processes")]
    pub max_processes: Option<usize>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<LogLevel>,
}

impl Config {
    pub fn threads(&self) -> bool {
        self.threads.unwrap_or(false)
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level.unwrap_or(LogLevel::Warn)
    }

    /// The effective column set. TID in the list also enables threads.
    pub fn column_set(&self) -> lsfd::Result<ColumnSet> {
        match self.columns.as_deref() {
            Some(list) => ColumnSet::from_list(list, self.threads()),
            None => Ok(ColumnSet::defaults(self.threads())),
        }
    }
}

pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    cfg.column_set().context("invalid column list")?;

    if cfg.max_processes == Some(0) {
        bail!("max_processes must be greater than 0");
    }

    if let Some(root) = cfg.sysroot.as_deref() {
        if !root.is_dir() {
            bail!("sysroot is not a directory: {}", root.display());
        }
        let proc_dir = root.join("proc");
        if !proc_dir.is_dir() {
            bail!("sysroot has no proc directory: {}", proc_dir.display());
        }
    }

    Ok(())
}

/// Merges CLI arguments over the loaded config (CLI > file > defaults).
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(columns) = &args.output {
        config.columns = Some(columns.clone());
    }
    if let Some(format) = args.output_format() {
        config.output = Some(format);
    }
    if args.noheadings {
        config.noheadings = Some(true);
    }
    if args.notruncate {
        config.notruncate = Some(true);
    }
    if args.threads {
        config.threads = Some(true);
    }
    if let Some(root) = &args.sysroot {
        config.sysroot = Some(root.clone());
    }
    if let Some(max) = args.max_processes {
        config.max_processes = Some(max);
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(level);
    }

    Ok(config)
}

/// Loads a config file, or the first existing default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
        {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("invalid TOML in {}", path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
    };
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Serializes a config in the requested format.
pub fn render_config(config: &Config, format: &ConfigFormat) -> Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use lsfd::Column;
    use std::io::Write;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    // -------------------------------------------------------------------------
    // Tests for load_config
    // -------------------------------------------------------------------------

    #[test]
    fn test_load_yaml_config() {
        let file = write_config(
            ".yaml",
            "columns: PID,FD,NAME\noutput: json\nthreads: true\nlog_level: debug\n",
        );
        let cfg = load_config(Some(file.path())).expect("valid config");
        assert_eq!(cfg.columns.as_deref(), Some("PID,FD,NAME"));
        assert_eq!(cfg.output, Some(OutputFormat::Json));
        assert!(cfg.threads());
        assert_eq!(cfg.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_load_json_and_toml_config() {
        let file = write_config(".json", r#"{"noheadings": true, "max_processes": 10}"#);
        let cfg = load_config(Some(file.path())).expect("valid config");
        assert_eq!(cfg.noheadings, Some(true));
        assert_eq!(cfg.max_processes, Some(10));

        let file = write_config(".toml", "output = \"raw\"\nnotruncate = true\n");
        let cfg = load_config(Some(file.path())).expect("valid config");
        assert_eq!(cfg.output, Some(OutputFormat::Raw));
        assert_eq!(cfg.notruncate, Some(true));
    }

    #[test]
    fn test_unknown_output_format_is_rejected() {
        let file = write_config(".yaml", "output: xml\n");
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/lsfd.yaml"))).is_err());
    }

    // -------------------------------------------------------------------------
    // Tests for resolve_config / validate_effective_config
    // -------------------------------------------------------------------------

    #[test]
    fn test_cli_overrides_config_file() {
        let file = write_config(".yaml", "columns: PID\noutput: raw\n");
        let path = file.path().to_string_lossy().to_string();
        let args = Args::try_parse_from(["lsfd", "-c", &path, "-J", "-o", "FD,NAME"])
            .expect("valid arguments");
        let cfg = resolve_config(&args).expect("resolvable config");
        assert_eq!(cfg.columns.as_deref(), Some("FD,NAME"));
        assert_eq!(cfg.output, Some(OutputFormat::Json));
    }

    #[test]
    fn test_no_config_uses_defaults() {
        let args = Args::try_parse_from(["lsfd", "--no-config"]).expect("valid arguments");
        let cfg = resolve_config(&args).expect("resolvable config");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_validate_rejects_unknown_columns() {
        let cfg = Config {
            columns: Some("PID,NOPE".into()),
            ..Default::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_sysroot_and_limit() {
        let cfg = Config {
            sysroot: Some(PathBuf::from("/nonexistent-sysroot")),
            ..Default::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            max_processes: Some(0),
            ..Default::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
        assert!(validate_effective_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_tid_column_enables_threads() {
        let cfg = Config {
            columns: Some("PID,TID,NAME".into()),
            ..Default::default()
        };
        let set = cfg.column_set().expect("valid columns");
        assert!(set.threads());
        assert_eq!(set.columns()[1], Column::Tid);
    }

    #[test]
    fn test_render_config_formats() {
        let cfg = Config {
            columns: Some("+POS".into()),
            output: Some(OutputFormat::Json),
            ..Default::default()
        };
        let yaml = render_config(&cfg, &ConfigFormat::Yaml).expect("yaml");
        assert!(yaml.contains("+POS"));
        let json = render_config(&cfg, &ConfigFormat::Json).expect("json");
        assert!(json.contains("\"output\": \"json\""));
        let toml = render_config(&cfg, &ConfigFormat::Toml).expect("toml");
        assert!(toml.contains("output = \"json\""));
    }
}
