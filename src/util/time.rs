use chrono::{Local, TimeZone};

use crate::event::UNKNOWN_TIME;

/// Format epoch seconds as local time, `unknown` for the missing-time sentinel.
pub fn fmt_epoch_local(sec: u64) -> String {
    if sec == UNKNOWN_TIME {
        return "unknown".to_string();
    }
    i64::try_from(sec)
        .ok()
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map_or_else(
            || format!("(invalid timestamp: {sec})"),
            |d| d.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::fmt_epoch_local;
    use crate::event::UNKNOWN_TIME;

    #[test]
    fn sentinel_is_unknown() {
        assert_eq!(fmt_epoch_local(UNKNOWN_TIME), "unknown");
    }

    #[test]
    fn epoch_is_formatted() {
        let text = fmt_epoch_local(1_700_000_000);
        assert_eq!(text.len(), "2023-11-14 22:13:20".len());
        assert!(text.starts_with("2023-11-1"));
    }

    #[test]
    fn out_of_range_is_reported() {
        assert!(fmt_epoch_local(u64::MAX - 1).starts_with("(invalid timestamp"));
    }
}
