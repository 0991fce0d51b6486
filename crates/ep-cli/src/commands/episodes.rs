//! Episodes command: dump the reconstructed episode table as CSV.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use ep_core::Episode;

use crate::cli::InputArgs;
use crate::config::Config;
use crate::pipeline::{self, Options};

const HEADER: [&str; 5] = ["user_id", "open_type", "start_time", "end_time", "duration_ms"];

/// Writes episodes as CSV, matched episodes first. Returns the row count.
pub fn write_episodes<'a, W, I>(writer: W, episodes: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Episode>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    let mut count = 0;
    for episode in episodes {
        let start = episode.start_time.to_rfc3339_opts(SecondsFormat::Millis, true);
        let end = episode.end_time.to_rfc3339_opts(SecondsFormat::Millis, true);
        let duration = episode.duration_ms().to_string();
        wtr.write_record([
            episode.user_id.as_str(),
            episode.category_name().unwrap_or(""),
            start.as_str(),
            end.as_str(),
            duration.as_str(),
        ])?;
        count += 1;
    }

    wtr.flush()?;
    Ok(count)
}

/// Runs the episodes command, writing to `output` or else to `writer`.
pub fn run<W: Write>(
    writer: &mut W,
    input: &InputArgs,
    output: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let options = Options::resolve(input, config);
    let analysis = pipeline::analyze_file(&input.path, &options)?;
    let episodes = analysis.reconstruction.episodes();

    let count = if let Some(path) = output {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        write_episodes(file, episodes)
            .with_context(|| format!("failed to write {}", path.display()))?
    } else {
        write_episodes(writer, episodes)?
    };

    tracing::debug!(count, "wrote episodes");
    Ok(())
}
