//! Display formatting shared by the front ends.

use chrono::{DateTime, NaiveDateTime, Utc};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human readable size with a 1024 base and at most two decimals: `"1.95 MB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    while unit + 1 < SIZE_UNITS.len() && bytes >= 1024u64.pow(unit as u32 + 1) {
        unit += 1;
    }
    let value = bytes as f64 / 1024f64.powi(unit as i32);
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SIZE_UNITS[unit])
}

/// Parses RFC 3339 timestamps and the naive ISO form the backend stores (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `"Just now"`, `"5m ago"`, `"3h ago"`, `"2d ago"`, or `"Unknown"` when unparsable.
pub fn format_relative_time(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(then) = raw.and_then(parse_timestamp) else {
        return "Unknown".to_string();
    };
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if minutes < 60 * 24 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (60 * 24))
    }
}

/// `"Oct 16, 2026"`.
pub fn format_short_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// `"03:07 PM"`, or `"Unknown"` when unparsable.
pub fn format_clock_time(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(|at| at.format("%I:%M %p").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
