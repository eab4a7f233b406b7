use chrono::{Duration, Utc};

/// Fixed-width UTC timestamp format. Lexicographic comparison of two
/// values in this format matches chronological order, which the session
/// and email-state expiration queries rely on. SQLite's date() also
/// understands it, which the daily-post guard relies on.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn now() -> String {
    now_plus_minutes(0)
}

pub fn now_plus_minutes(minutes: i64) -> String {
    (Utc::now() + Duration::minutes(minutes))
        .format(DATETIME_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_timestamps_sort_after_earlier_ones() {
        let earlier = now();
        let later = now_plus_minutes(15);
        assert!(earlier < later);
    }
}
