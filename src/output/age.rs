//! kubectl-style approximate ages.

use chrono::{DateTime, Duration, Utc};

/// Placeholder for an unknown timestamp.
pub const UNKNOWN: &str = "<unknown>";

/// Elapsed time since `ts`, or `<unknown>` when absent.
pub fn format_age(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match ts {
        Some(ts) => human_duration(now - ts),
        None => UNKNOWN.to_string(),
    }
}

/// Render a duration the way kubectl's AGE column does: precise for short
/// durations, coarser as they grow.
///
/// Up to 1s in the future is treated as clock skew and shown as `0s`.
pub fn human_duration(d: Duration) -> String {
    let seconds = d.num_seconds();
    if seconds < -1 {
        return "<invalid>".to_string();
    } else if seconds < 0 {
        return "0s".to_string();
    } else if seconds < 60 * 2 {
        return format!("{}s", seconds);
    }

    let minutes = d.num_minutes();
    if minutes < 10 {
        let s = seconds % 60;
        if s == 0 {
            return format!("{}m", minutes);
        }
        return format!("{}m{}s", minutes, s);
    } else if minutes < 60 * 3 {
        return format!("{}m", minutes);
    }

    let hours = d.num_hours();
    if hours < 8 {
        let m = minutes % 60;
        if m == 0 {
            return format!("{}h", hours);
        }
        format!("{}h{}m", hours, m)
    } else if hours < 48 {
        format!("{}h", hours)
    } else if hours < 24 * 8 {
        let h = hours % 24;
        if h == 0 {
            return format!("{}d", hours / 24);
        }
        format!("{}d{}h", hours / 24, h)
    } else if hours < 24 * 365 * 2 {
        format!("{}d", hours / 24)
    } else if hours < 24 * 365 * 8 {
        let dy = (hours / 24) % 365;
        if dy == 0 {
            return format!("{}y", hours / 24 / 365);
        }
        format!("{}y{}d", hours / 24 / 365, dy)
    } else {
        format!("{}y", hours / 24 / 365)
    }
}
