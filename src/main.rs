//! lsfd - version 0.1.0
//!
//! Lists the open files of every process.
//! This is the main entry point that resolves configuration, runs a collection pass
//! and renders the rows, or handles subcommands.

mod cli;
mod commands;
mod config;
mod startup_checks;

use anyhow::Context;
use clap::Parser;
use std::io::{self, BufWriter, Write};
use tracing::{debug, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{command_columns, command_config};
use config::{resolve_config, show_config, validate_effective_config, Config};
use lsfd::{Collection, Renderer, SysProcFs};

/// Initializes tracing logging subsystem with configured log level.
///
/// Log output goes to stderr so that stdout carries only the listing.
fn setup_logging(config: &Config) {
    let log_level = match config.log_level() {
        LogLevel::Off => return,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("lsfd: tracing subscriber already installed");
        return;
    }

    debug!("Logging initialized with level: {:?}", config.log_level());
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> anyhow::Result<Config> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {:#}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Terminal width from `COLUMNS`, used to truncate long table cells.
fn terminal_width() -> Option<usize> {
    std::env::var("COLUMNS").ok()?.trim().parse().ok()
}

/// One collection pass followed by rendering.
fn run(config: &Config) -> anyhow::Result<()> {
    let columns = config.column_set()?;
    let source = SysProcFs::new(config.sysroot.as_deref());

    let mut collection =
        Collection::new(columns.threads()).with_max_processes(config.max_processes);
    collection.run(&source)?;

    let rows = collection.rows(columns.columns());
    info!("{} rows", rows.len());

    let renderer = Renderer::new(config.output.unwrap_or_default(), columns.columns())
        .noheadings(config.noheadings.unwrap_or(false))
        .notruncate(config.notruncate.unwrap_or(false))
        .width(terminal_width());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    renderer
        .render(&rows, &mut out)
        .and_then(|_| out.flush())
        .context("failed to write output")?;

    collection.finish();
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {:#}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, &args.config_format);
    }

    let mut config = load_validated_config(&args)?;
    if matches!(args.command, Some(Commands::CheckRequirements)) && config.log_level.is_none() {
        config.log_level = Some(LogLevel::Info);
    }
    setup_logging(&config);

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Columns { types } => command_columns(*types),

            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), format.clone(), *commented),

            Commands::CheckRequirements => {
                println!("🔍 Checking Runtime Requirements");
                println!("================================\n");

                match startup_checks::validate_requirements(config.sysroot.as_deref()) {
                    Ok(_) => {
                        println!("\n✅ All requirements met");
                        std::process::exit(0);
                    }
                    Err(e) => {
                        eprintln!("\n❌ Requirements check failed: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        };
    }

    if let Err(e) = run(&config) {
        eprintln!("lsfd: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
