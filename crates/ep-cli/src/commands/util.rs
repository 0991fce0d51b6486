//! Shared formatting helpers for command output.

use ep_core::DurationStats;

/// Formats milliseconds with thousands separators and two decimals.
pub fn format_ms(ms: f64) -> String {
    let formatted = format!("{:.2}", ms.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if ms < 0.0 && formatted.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// A section title underlined to its width.
pub fn heading(title: &str) -> String {
    format!("{title}\n{}", "─".repeat(title.chars().count()))
}

/// Renders a one-line box plot of `stats` on the scale `lo..=hi`.
///
/// Whiskers span min to max, the box spans Q1 to Q3 and `┃` marks the
/// median. Trailing blanks are trimmed.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "cell positions are clamped to 0..width"
)]
pub fn box_plot(stats: &DurationStats, lo: f64, hi: f64, width: usize) -> String {
    let width = width.max(1);
    let last = width - 1;
    let pos = |value: f64| -> usize {
        if hi <= lo {
            return 0;
        }
        let ratio = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
        ((ratio * last as f64).round() as usize).min(last)
    };

    let min = pos(stats.min_ms);
    let q1 = pos(stats.q1_ms);
    let median = pos(stats.median_ms);
    let q3 = pos(stats.q3_ms);
    let max = pos(stats.max_ms);

    let mut cells = vec![' '; width];
    cells[min..=max].fill('─');
    cells[q1..=q3].fill('█');
    if min < q1 {
        cells[min] = '├';
    }
    if max > q3 {
        cells[max] = '┤';
    }
    cells[median] = '┃';

    let line: String = cells.into_iter().collect();
    line.trim_end().to_string()
}
