use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix timestamp in seconds.
#[inline]
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
