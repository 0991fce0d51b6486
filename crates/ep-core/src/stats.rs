//! Per-category duration statistics and the two-group comparison.
//!
//! Durations are aggregated in milliseconds as `f64`. Quantiles use linear
//! interpolation between closest ranks, so the median of an even-sized
//! group is the mean of its two middle values.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::episode::Episode;
use crate::welch::{TestSkip, WelchTest};

/// Descriptive statistics for one group of durations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationStats {
    pub count: usize,
    #[serde(rename = "mean_duration_ms")]
    pub mean_ms: f64,
    #[serde(rename = "median_duration_ms")]
    pub median_ms: f64,
    /// Sample standard deviation; undefined for a single observation.
    pub std_dev_ms: Option<f64>,
    pub min_ms: f64,
    pub q1_ms: f64,
    pub q3_ms: f64,
    pub max_ms: f64,
}

impl DurationStats {
    /// Computes statistics from unsorted values. `None` if empty.
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes statistics from values sorted ascending.
    #[expect(clippy::cast_precision_loss, reason = "group sizes fit in f64")]
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        debug_assert!(
            sorted.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min_ms = *sorted.first()?;
        let max_ms = *sorted.last()?;
        let count = sorted.len();
        let n = count as f64;
        let mean_ms = sorted.iter().sum::<f64>() / n;
        let std_dev_ms = (count > 1).then(|| {
            let ss = sorted.iter().map(|v| (v - mean_ms).powi(2)).sum::<f64>();
            (ss / (n - 1.0)).sqrt()
        });

        Some(Self {
            count,
            mean_ms,
            median_ms: quantile(sorted, 0.5),
            std_dev_ms,
            min_ms,
            q1_ms: quantile(sorted, 0.25),
            q3_ms: quantile(sorted, 0.75),
            max_ms,
        })
    }
}

/// Linear-interpolation quantile of a non-empty sorted slice.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "rank is within 0..len"
)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - rank.floor();
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Statistics for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    /// `None` groups episodes that carried no category.
    pub category: Option<String>,
    #[serde(flatten)]
    pub stats: DurationStats,
}

impl CategorySummary {
    /// Display label, `(none)` for the uncategorized group.
    pub fn label(&self) -> &str {
        self.category.as_deref().unwrap_or("(none)")
    }
}

/// Groups episodes by category and computes per-group statistics.
///
/// Named categories come first in name order; uncategorized episodes form
/// a trailing group.
pub fn summarize<'a, I>(episodes: I) -> Vec<CategorySummary>
where
    I: IntoIterator<Item = &'a Episode>,
{
    let mut named: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut uncategorized: Vec<f64> = Vec::new();

    for episode in episodes {
        let duration = duration_f64(episode);
        match episode.category_name() {
            Some(name) => named.entry(name.to_string()).or_default().push(duration),
            None => uncategorized.push(duration),
        }
    }

    let groups = named
        .into_iter()
        .map(|(name, values)| (Some(name), values))
        .chain((!uncategorized.is_empty()).then_some((None, uncategorized)));

    groups
        .filter_map(|(category, values)| {
            DurationStats::new(values).map(|stats| CategorySummary { category, stats })
        })
        .collect()
}

/// Durations (ms) of episodes in the given category.
pub fn durations_for<'a, I>(episodes: I, category: &str) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Episode>,
{
    episodes
        .into_iter()
        .filter(|e| e.category_name() == Some(category))
        .map(duration_f64)
        .collect()
}

#[expect(clippy::cast_precision_loss, reason = "durations are far below 2^53 ms")]
fn duration_f64(episode: &Episode) -> f64 {
    episode.duration_ms() as f64
}

/// Result of comparing two categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub left: String,
    pub right: String,
    pub alpha: f64,
    pub outcome: TestOutcome,
}

/// Whether the test ran, and what it found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Tested {
        #[serde(flatten)]
        test: WelchTest,
        significant: bool,
    },
    Skipped { skip: TestSkip },
}

impl Comparison {
    pub const fn test(&self) -> Option<&WelchTest> {
        match &self.outcome {
            TestOutcome::Tested { test, .. } => Some(test),
            TestOutcome::Skipped { .. } => None,
        }
    }

    pub const fn is_significant(&self) -> bool {
        matches!(
            self.outcome,
            TestOutcome::Tested {
                significant: true,
                ..
            }
        )
    }
}

/// Compares the durations of two categories with Welch's t-test.
pub fn compare<'a, I>(episodes: I, left: &str, right: &str, alpha: f64) -> Comparison
where
    I: IntoIterator<Item = &'a Episode> + Clone,
{
    let left_values = durations_for(episodes.clone(), left);
    let right_values = durations_for(episodes, right);

    let outcome = match WelchTest::compute(&left_values, &right_values) {
        Ok(test) => TestOutcome::Tested {
            significant: test.is_significant(alpha),
            test,
        },
        Err(skip) => {
            tracing::debug!(left, right, reason = %skip, "significance test skipped");
            TestOutcome::Skipped { skip }
        }
    };

    Comparison {
        left: left.to_string(),
        right: right.to_string(),
        alpha,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, UserId};
    use chrono::DateTime;

    fn episode(category: Option<&str>, start: i64, end: i64) -> Episode {
        Episode {
            user_id: UserId::new("u1").unwrap(),
            category: Category::from_cell(category),
            start_time: DateTime::from_timestamp_millis(start).unwrap(),
            end_time: DateTime::from_timestamp_millis(end).unwrap(),
            synthetic: false,
        }
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn stats_for_odd_group() {
        let stats = DurationStats::new([300.0, 100.0, 200.0]).unwrap();
        assert_eq!(stats.count, 3);
        assert!(approx_eq(stats.mean_ms, 200.0));
        assert!(approx_eq(stats.median_ms, 200.0));
        assert!(approx_eq(stats.std_dev_ms.unwrap(), 100.0));
        assert!(approx_eq(stats.q1_ms, 150.0));
        assert!(approx_eq(stats.q3_ms, 250.0));
    }

    #[test]
    fn median_of_even_group_interpolates() {
        let stats = DurationStats::new([1.0, 2.0, 3.0, 10.0]).unwrap();
        assert!(approx_eq(stats.median_ms, 2.5));
        assert!(approx_eq(stats.min_ms, 1.0));
        assert!(approx_eq(stats.max_ms, 10.0));
    }

    #[test]
    fn single_value_has_no_std_dev() {
        let stats = DurationStats::new([42.0]).unwrap();
        assert_eq!(stats.std_dev_ms, None);
        assert!(approx_eq(stats.median_ms, 42.0));
    }

    #[test]
    fn empty_group_has_no_stats() {
        assert_eq!(DurationStats::new(Vec::new()), None);
    }

    #[test]
    fn summarize_groups_by_category_with_uncategorized_last() {
        let episodes = vec![
            episode(None, 0, 50),
            episode(Some("manual"), 0, 100),
            episode(Some("auto"), 0, 10),
            episode(Some("manual"), 0, 300),
        ];
        let summary = summarize(&episodes);
        let labels: Vec<_> = summary.iter().map(CategorySummary::label).collect();
        assert_eq!(labels, vec!["auto", "manual", "(none)"]);
        assert_eq!(summary[1].stats.count, 2);
        assert!(approx_eq(summary[1].stats.mean_ms, 200.0));
    }

    #[test]
    fn summarize_empty_is_empty() {
        assert!(summarize(&Vec::<Episode>::new()).is_empty());
    }

    #[test]
    fn compare_skips_with_insufficient_data() {
        let episodes = vec![
            episode(Some("manual"), 0, 100),
            episode(Some("auto"), 0, 10),
            episode(Some("auto"), 0, 20),
        ];
        let comparison = compare(&episodes, "manual", "auto", 0.05);
        assert_eq!(
            comparison.outcome,
            TestOutcome::Skipped {
                skip: TestSkip::InsufficientData { left: 1, right: 2 }
            }
        );
        assert!(comparison.test().is_none());
        assert!(!comparison.is_significant());
    }

    #[test]
    fn compare_runs_welch_test() {
        let episodes = vec![
            episode(Some("manual"), 0, 100),
            episode(Some("manual"), 0, 200),
            episode(Some("manual"), 0, 150),
            episode(Some("manual"), 0, 120),
            episode(Some("auto"), 0, 1000),
            episode(Some("auto"), 0, 1100),
            episode(Some("auto"), 0, 900),
            episode(Some("auto"), 0, 1050),
            episode(None, 0, 5),
        ];
        let comparison = compare(&episodes, "manual", "auto", 0.05);
        let test = comparison.test().unwrap();
        assert!(test.statistic < 0.0);
        assert!(comparison.is_significant());
    }

    #[test]
    fn comparison_serializes_flat_outcome() {
        let comparison = Comparison {
            left: "manual".to_string(),
            right: "auto".to_string(),
            alpha: 0.05,
            outcome: TestOutcome::Skipped {
                skip: TestSkip::InsufficientData { left: 0, right: 3 },
            },
        };
        let value = serde_json::to_value(&comparison).unwrap();
        assert_eq!(value["outcome"]["status"], "skipped");
        assert_eq!(value["outcome"]["skip"]["reason"], "insufficient_data");
        assert_eq!(value["outcome"]["skip"]["right"], 3);
    }

    #[test]
    fn summary_serializes_report_column_names() {
        let summary = summarize(&[episode(Some("auto"), 0, 10)]);
        let value = serde_json::to_value(&summary[0]).unwrap();
        assert_eq!(value["category"], "auto");
        assert_eq!(value["count"], 1);
        assert_eq!(value["mean_duration_ms"], 10.0);
        assert_eq!(value["median_duration_ms"], 10.0);
        assert!(value["std_dev_ms"].is_null());
    }
}
