//! helmscan CLI library
//!
//! Exposes the CLI building blocks so the binary and the integration tests
//! share one implementation.
//!
//! # Module Structure
//!
//! - [`cli`]: clap argument definitions
//! - [`commands`]: subcommand handlers (`scan`, `config`)
//! - [`output`]: text / JSON rendering (`OutputWriter`, `Render`)
//! - [`csv`]: CSV report sink
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: `CliError` and exit codes

pub mod cli;
pub mod commands;
pub mod csv;
pub mod error;
pub mod logging;
pub mod output;
