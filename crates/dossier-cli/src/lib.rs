//! Dossier CLI library.
//!
//! Configuration loading, command execution and output formatting for the
//! `dossier` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, CliFormat, Command, ReportArgs};
pub use config::{Config, OutputFormat};
pub use error::{CliError, Result};
pub use output::Formatter;
