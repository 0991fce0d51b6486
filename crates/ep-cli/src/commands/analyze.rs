//! Analyze command: duration statistics, data quality and the significance test.
//!
//! This module implements `ep analyze` with human-readable and JSON output.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use ep_core::{
    CategorySummary, Comparison, DataQuality, Episode, TestOutcome, TestSkip, UserTally, compare,
    summarize,
};
use serde::Serialize;

use super::util::{box_plot, format_ms, heading};
use crate::cli::InputArgs;
use crate::config::Config;
use crate::pipeline::{self, Analysis, Options};

/// Character width of the distribution plot.
const PLOT_WIDTH: usize = 40;

/// Everything the analyze command reports.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub categories: Vec<CategorySummary>,
    pub quality: QualityReport,
    /// `None` when no episodes were reconstructed.
    pub comparison: Option<Comparison>,
    pub users: Vec<UserTally>,
}

/// Reconstruction counters plus rows dropped during normalization.
#[derive(Debug, Serialize)]
pub struct QualityReport {
    #[serde(flatten)]
    pub counts: DataQuality,
    pub skipped_rows: usize,
}

/// Summarizes an analysis and runs the configured comparison.
pub fn build_report(analysis: &Analysis, config: &Config) -> AnalysisReport {
    let episodes: Vec<&Episode> = analysis.reconstruction.episodes().collect();
    let categories = summarize(episodes.iter().copied());
    let comparison = (!episodes.is_empty()).then(|| {
        compare(
            episodes.iter().copied(),
            &config.comparison.left,
            &config.comparison.right,
            config.alpha,
        )
    });

    AnalysisReport {
        categories,
        quality: QualityReport {
            counts: *analysis.reconstruction.quality(),
            skipped_rows: analysis.skipped_rows,
        },
        comparison,
        users: analysis.reconstruction.per_user().to_vec(),
    }
}

// ========== Human Output ==========

/// Formats the human-readable report.
pub fn format_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    if report.categories.is_empty() {
        writeln!(output, "No complete open/close episodes found.").unwrap();
        writeln!(output).unwrap();
        write_quality(&mut output, &report.quality);
        return output;
    }

    write_summary(&mut output, &report.categories);
    writeln!(output).unwrap();
    write_quality(&mut output, &report.quality);

    if let Some(comparison) = &report.comparison {
        writeln!(output).unwrap();
        write_comparison(&mut output, comparison);
    }

    writeln!(output).unwrap();
    write_distribution(&mut output, &report.categories);

    output
}

fn label_width(categories: &[CategorySummary]) -> usize {
    categories
        .iter()
        .map(|c| c.label().chars().count())
        .max()
        .unwrap_or(0)
        .max("category".len())
}

fn write_summary(output: &mut String, categories: &[CategorySummary]) {
    let width = label_width(categories);
    writeln!(output, "{}", heading("EPISODE DURATIONS BY CATEGORY")).unwrap();
    writeln!(
        output,
        "{:<width$}{:>7}{:>14}{:>14}{:>14}",
        "category", "count", "mean (ms)", "median (ms)", "std dev (ms)"
    )
    .unwrap();

    for summary in categories {
        let stats = &summary.stats;
        let std_dev = stats.std_dev_ms.map_or_else(|| "-".to_string(), format_ms);
        writeln!(
            output,
            "{:<width$}{:>7}{:>14}{:>14}{:>14}",
            summary.label(),
            stats.count,
            format_ms(stats.mean_ms),
            format_ms(stats.median_ms),
            std_dev
        )
        .unwrap();
    }
}

fn write_quality(output: &mut String, quality: &QualityReport) {
    let counts = &quality.counts;
    writeln!(output, "{}", heading("DATA QUALITY")).unwrap();
    for (label, value) in [
        ("Matched episodes:", counts.matched_episodes),
        ("Synthesized episodes:", counts.synthesized_episodes),
        ("Orphan closes ignored:", counts.orphan_closes),
        ("Unmatched opens:", counts.unmatched_opens),
        ("Malformed rows skipped:", quality.skipped_rows),
    ] {
        writeln!(output, "{label:<24}{value}").unwrap();
    }
}

fn write_comparison(output: &mut String, comparison: &Comparison) {
    let title = format!(
        "SIGNIFICANCE TEST ({} vs {})",
        comparison.left, comparison.right
    );
    writeln!(output, "{}", heading(&title)).unwrap();

    match &comparison.outcome {
        TestOutcome::Tested { test, significant } => {
            writeln!(output, "{:<22}{:.3}", "Welch t-statistic:", test.statistic).unwrap();
            writeln!(output, "{:<22}{:.5}", "p-value:", test.p_value).unwrap();
            let verdict = if *significant {
                "Significant difference (reject H0"
            } else {
                "No significant difference (fail to reject H0"
            };
            writeln!(output, "{verdict} at alpha = {})", comparison.alpha).unwrap();
        }
        TestOutcome::Skipped {
            skip: TestSkip::InsufficientData { left, right },
        } => {
            writeln!(
                output,
                "Not enough data for t-test (need at least 2 samples per group, got {left} and {right})."
            )
            .unwrap();
        }
        TestOutcome::Skipped { skip } => {
            writeln!(output, "Test skipped: {skip}.").unwrap();
        }
    }
}

fn write_distribution(output: &mut String, categories: &[CategorySummary]) {
    let width = label_width(categories);
    let hi = categories
        .iter()
        .map(|c| c.stats.max_ms)
        .fold(0.0_f64, f64::max);

    let title = format!("DISTRIBUTION (0.00 to {} ms)", format_ms(hi));
    writeln!(output, "{}", heading(&title)).unwrap();
    for summary in categories {
        let plot = box_plot(&summary.stats, 0.0, hi, PLOT_WIDTH);
        let line = format!("{:<width$}  {plot}", summary.label());
        writeln!(output, "{}", line.trim_end()).unwrap();
    }
}

// ========== JSON Output ==========

/// Formats the report as JSON.
pub fn format_report_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

// ========== Public Interface ==========

/// Runs the analyze command.
pub fn run<W: Write>(writer: &mut W, input: &InputArgs, json: bool, config: &Config) -> Result<()> {
    let options = Options::resolve(input, config);
    let analysis = pipeline::analyze_file(&input.path, &options)?;
    let report = build_report(&analysis, config);

    if json {
        writeln!(writer, "{}", format_report_json(&report)?)?;
    } else {
        write!(writer, "{}", format_report(&report))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ep_core::MalformedPolicy;
    use insta::assert_snapshot;

    const TWO_GROUPS: &str = "\
user_id,event,timestamp,open_type
u1,close,0,
u1,open,1000,manual
u1,close,1100,
u1,open,2000,manual
u1,close,2200,
u1,open,3000,manual
u1,close,3150,
u1,open,4000,manual
u1,close,4120,
u2,open,0,auto
u2,close,1000,
u2,open,2000,auto
u2,close,3100,
u2,open,4000,auto
u2,close,4900,
u2,open,5000,auto
u2,close,6050,
";

    fn report_for(csv: &str, close_unmatched_at_end: bool) -> AnalysisReport {
        let rows = pipeline::read_rows(csv.as_bytes()).unwrap();
        let options = Options {
            close_unmatched_at_end,
            malformed: MalformedPolicy::Reject,
        };
        let analysis = pipeline::analyze_rows(rows, &options).unwrap();
        build_report(&analysis, &Config::default())
    }

    #[test]
    fn test_report_two_groups() {
        let output = format_report(&report_for(TWO_GROUPS, false));
        assert_snapshot!(output, @r"
        EPISODE DURATIONS BY CATEGORY
        ─────────────────────────────
        category  count     mean (ms)   median (ms)  std dev (ms)
        auto          4      1,012.50      1,025.00         85.39
        manual        4        142.50        135.00         43.49

        DATA QUALITY
        ────────────
        Matched episodes:       8
        Synthesized episodes:   0
        Orphan closes ignored:  1
        Unmatched opens:        0
        Malformed rows skipped: 0

        SIGNIFICANCE TEST (manual vs auto)
        ──────────────────────────────────
        Welch t-statistic:    -18.157
        p-value:              0.00002
        Significant difference (reject H0 at alpha = 0.05)

        DISTRIBUTION (0.00 to 1,100.00 ms)
        ──────────────────────────────────
        auto                                      ├──█┃██┤
        manual        █┃█┤
        ");
    }

    #[test]
    fn test_report_no_episodes() {
        let csv = "user_id,event,timestamp,open_type\nu1,close,0,\nu1,close,5,\nu2,open,10,manual\n";
        let output = format_report(&report_for(csv, false));
        assert_snapshot!(output, @r"
        No complete open/close episodes found.

        DATA QUALITY
        ────────────
        Matched episodes:       0
        Synthesized episodes:   0
        Orphan closes ignored:  2
        Unmatched opens:        1
        Malformed rows skipped: 0
        ");
    }

    #[test]
    fn test_report_insufficient_data_message() {
        let csv = "user_id,event,timestamp,open_type\nu1,open,0,manual\nu1,close,100,\n";
        let output = format_report(&report_for(csv, false));
        assert!(output.contains(
            "Not enough data for t-test (need at least 2 samples per group, got 1 and 0)."
        ));
        assert!(output.contains("manual        1"));
        assert!(output.contains(&format!("{:>14}\n", "-")));
    }

    #[test]
    fn test_report_uncategorized_group_last() {
        let csv = "user_id,event,timestamp,open_type\n\
                   u1,open,0,\n\
                   u1,close,10,\n\
                   u2,open,0,auto\n\
                   u2,close,20,\n";
        let report = report_for(csv, false);
        let labels: Vec<_> = report.categories.iter().map(CategorySummary::label).collect();
        assert_eq!(labels, vec!["auto", "(none)"]);
    }

    #[test]
    fn test_report_horizon_policy_synthesizes() {
        let csv = "user_id,event,timestamp,open_type\n\
                   u1,open,0,manual\n\
                   u2,open,100,auto\n\
                   u2,close,500,\n";
        let report = report_for(csv, true);
        assert_eq!(report.quality.counts.synthesized_episodes, 1);
        assert_eq!(report.quality.counts.unmatched_opens, 1);
        let manual = &report.categories[1];
        assert_eq!(manual.label(), "manual");
        assert!((manual.stats.mean_ms - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_report_json_output() {
        let report = report_for(TWO_GROUPS, false);
        let json = format_report_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["categories"][0]["category"], "auto");
        assert_eq!(value["categories"][0]["count"], 4);
        assert_eq!(value["categories"][1]["mean_duration_ms"], 142.5);
        assert_eq!(value["quality"]["matched_episodes"], 8);
        assert_eq!(value["quality"]["orphan_closes"], 1);
        assert_eq!(value["quality"]["skipped_rows"], 0);
        assert_eq!(value["comparison"]["left"], "manual");
        assert_eq!(value["comparison"]["outcome"]["status"], "tested");
        assert_eq!(value["comparison"]["outcome"]["significant"], true);
        assert!(value["comparison"]["outcome"]["p_value"].as_f64().unwrap() < 0.001);
        assert_eq!(value["users"][0]["user_id"], "u1");
    }

    #[test]
    fn test_report_json_empty_has_null_comparison() {
        let csv = "user_id,event,timestamp\nu1,close,0\n";
        let json = format_report_json(&report_for(csv, false)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["comparison"].is_null());
        assert_eq!(value["categories"].as_array().unwrap().len(), 0);
    }
}
