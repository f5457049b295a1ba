//! Percentage helpers for dashboard figures.
//!
//! Results are always finite so they can be rendered without special cases.

/// What percent `part` is of `whole`; `0` when `whole` is zero.
///
/// `percent(300, 2400) == 12.5`
pub fn percent(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

/// Percent increase or decrease from `before` to `after`.
///
/// `percent_change(20, 60) == 200.0`. Growth from zero is clamped to `+100`
/// and a drop below zero from zero to `-100`; zero to zero is no change.
pub fn percent_change(before: i64, after: i64) -> f64 {
    let change = 100.0 * ((after as f64 - before as f64) / before as f64);
    if change.is_nan() {
        0.0
    } else if change == f64::INFINITY {
        100.0
    } else if change == f64::NEG_INFINITY {
        -100.0
    } else {
        change
    }
}

/// Formats elapsed seconds as `05s`, `03m 05s` or `01h 03m 05s`.
pub fn format_duration(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{:02}m {:02}s", minutes, seconds)
    } else {
        format!("{:02}s", seconds)
    }
}
