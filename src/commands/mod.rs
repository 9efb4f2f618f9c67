//! CLI command implementations for lsfd.
//!
//! This module provides implementations for the CLI subcommands:
//! - `columns`: Column catalogue listing
//! - `config`: Configuration file generation

pub mod columns;
pub mod config;

// Re-export command functions
pub use columns::command_columns;
pub use config::command_config;
