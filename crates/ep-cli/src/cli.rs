//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Episode duration analyzer.
///
/// Reconstructs open/close episodes from a per-user event log and compares
/// their durations across categories.
#[derive(Debug, Parser)]
#[command(name = "ep", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconstruct episodes and report duration statistics.
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write the reconstructed episode table as CSV.
    Episodes {
        #[command(flatten)]
        input: InputArgs,

        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Input log and reconstruction options shared by subcommands.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// CSV log with `user_id`, `event`, `timestamp` and optional `open_type` columns.
    pub path: PathBuf,

    /// Close opens that never saw a close at the last timestamp in the log.
    #[arg(long, overrides_with = "no_close_unmatched_at_end")]
    pub close_unmatched_at_end: bool,

    /// Discard opens that never saw a close, even if configuration enables closing them.
    #[arg(long, overrides_with = "close_unmatched_at_end")]
    pub no_close_unmatched_at_end: bool,

    /// Skip rows whose event is neither open nor close instead of failing.
    #[arg(long)]
    pub skip_malformed: bool,
}

impl InputArgs {
    /// The horizon policy requested on the command line, if any.
    /// The last of `--close-unmatched-at-end` and `--no-close-unmatched-at-end` wins.
    pub const fn close_unmatched_override(&self) -> Option<bool> {
        if self.no_close_unmatched_at_end {
            Some(false)
        } else if self.close_unmatched_at_end {
            Some(true)
        } else {
            None
        }
    }
}
