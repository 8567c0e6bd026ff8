use chrono::{DateTime, TimeDelta, Utc};

/// Compact human readable duration: `45s`, `12m`, `5h`, `3d`, `2y`
pub fn short_human_duration(d: TimeDelta) -> String {
    let seconds = d.num_seconds();
    if seconds < -1 {
        return "<invalid>".to_string();
    }
    if seconds < 0 {
        // Tolerate a second of clock skew between client and cluster
        return "0s".to_string();
    }
    if seconds < 60 {
        return format!("{}s", seconds);
    }

    let minutes = d.num_minutes();
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = d.num_hours();
    if hours < 24 {
        format!("{}h", hours)
    } else if hours < 24 * 365 {
        format!("{}d", hours / 24)
    } else {
        format!("{}y", hours / 24 / 365)
    }
}

/// Age of something that started at `then`, as seen at `now`
pub fn age_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    short_human_duration(now - then)
}
