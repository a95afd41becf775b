use chrono::{DateTime, Utc};
use std::time::Duration;

/// `$1.5B`, `$234.5M`, `$1.2K`, `$12.34`.
pub fn format_large_number(num: f64) -> String {
    if num >= 1_000_000_000.0 {
        format!("${:.1}B", num / 1_000_000_000.0)
    } else if num >= 1_000_000.0 {
        format!("${:.1}M", num / 1_000_000.0)
    } else if num >= 1_000.0 {
        format!("${:.1}K", num / 1_000.0)
    } else {
        format!("${num:.2}")
    }
}

/// `+3.2%`, `-1.5%`, `0.0%`.
pub fn format_percentage(num: f64, decimals: usize) -> String {
    let sign = if num > 0.0 { "+" } else { "" };
    format!("{sign}{num:.decimals$}%")
}

/// `"9m 32s"` until `last_update + interval`, or `"Updating..."` once due.
pub fn time_until_next_refresh(
    last_update: Option<DateTime<Utc>>,
    interval: Duration,
    now: DateTime<Utc>,
) -> String {
    let Some(last_update) = last_update else {
        return "Updating...".to_string();
    };
    let Ok(interval) = chrono::Duration::from_std(interval) else {
        return "Updating...".to_string();
    };

    let Some(due) = last_update.checked_add_signed(interval) else {
        return "Updating...".to_string();
    };
    let remaining = (due - now).num_seconds();
    if remaining <= 0 {
        return "Updating...".to_string();
    }
    format!("{}m {}s", remaining / 60, remaining % 60)
}
