//! Wall-clock helpers.

/// Current Unix epoch in seconds.
pub fn epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
