use std::time::Duration;

use chrono::{DateTime, Utc};

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Share of the token TTL during which a cached token is reused.
pub fn tolerated_window(ttl: Duration, tolerance_percent: u8) -> chrono::Duration {
    let tolerance = u128::from(tolerance_percent.min(100));
    let millis = ttl.as_millis().saturating_mul(tolerance) / 100;
    chrono::Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// A token written at `written_at` may be reused iff
/// `now <= written_at + ttl * tolerance / 100`. Tolerance 0 never reuses.
pub fn is_fresh(
    written_at: DateTime<Utc>,
    now: DateTime<Utc>,
    ttl: Duration,
    tolerance_percent: u8,
) -> bool {
    if tolerance_percent == 0 {
        return false;
    }
    match written_at.checked_add_signed(tolerated_window(ttl, tolerance_percent)) {
        Some(deadline) => now <= deadline,
        None => true,
    }
}
