//! Episode duration analyzer CLI library.
//!
//! This crate provides the CLI interface for reconstructing and comparing
//! episode durations.

mod cli;
pub mod commands;
mod config;
pub mod pipeline;

pub use cli::{Cli, Commands, InputArgs};
pub use config::{ComparisonConfig, Config};
