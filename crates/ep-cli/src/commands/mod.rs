//! CLI subcommand implementations.

pub mod analyze;
pub mod episodes;
mod util;
