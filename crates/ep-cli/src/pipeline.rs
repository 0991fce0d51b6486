//! Reading a CSV event log and reconstructing its episodes.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use ep_core::{
    MalformedPolicy, RawRow, ReconstructConfig, Reconstruction, normalize, reconstruct,
};

use crate::cli::InputArgs;
use crate::config::Config;

/// Columns every log must carry. `open_type` is optional.
const REQUIRED_COLUMNS: [&str; 3] = ["user_id", "event", "timestamp"];

/// Effective reconstruction options: command-line flags over configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub close_unmatched_at_end: bool,
    pub malformed: MalformedPolicy,
}

impl Options {
    pub fn resolve(args: &InputArgs, config: &Config) -> Self {
        Self {
            close_unmatched_at_end: args
                .close_unmatched_override()
                .unwrap_or(config.close_unmatched_at_end),
            malformed: if args.skip_malformed {
                MalformedPolicy::Skip
            } else {
                config.malformed
            },
        }
    }
}

/// Reconstructed episodes plus what normalization dropped.
#[derive(Debug)]
pub struct Analysis {
    pub reconstruction: Reconstruction,
    pub skipped_rows: usize,
}

/// Parses CSV rows. Headers are matched by name; extra columns are ignored.
///
/// Rows may stop short of trailing optional columns, so close rows can omit
/// the `open_type` cell entirely.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().context("failed to read CSV header")?;
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            anyhow::bail!("missing required column `{column}`");
        }
    }

    reader
        .deserialize::<RawRow>()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("failed to parse row {}", i + 1)))
        .collect()
}

/// Normalizes and reconstructs already-parsed rows.
pub fn analyze_rows(rows: Vec<RawRow>, options: &Options) -> Result<Analysis> {
    let log = normalize(rows, options.malformed)?;
    let config = ReconstructConfig {
        close_unmatched_at_end: options.close_unmatched_at_end,
    };
    let reconstruction = reconstruct(&log, &config);

    Ok(Analysis {
        reconstruction,
        skipped_rows: log.skipped_rows(),
    })
}

/// Reads a log file and reconstructs its episodes.
pub fn analyze_file(path: &Path, options: &Options) -> Result<Analysis> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let rows = read_rows(file).with_context(|| format!("failed to read {}", path.display()))?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "loaded event log");

    analyze_rows(rows, options).with_context(|| format!("invalid event log {}", path.display()))
}
