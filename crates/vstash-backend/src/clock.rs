//! Revision timestamps
//!
//! History ordering relies on `created_at`, so revisions of one resource get
//! strictly increasing timestamps even when written within the same tick.

use chrono::{DateTime, Duration, Utc};

/// Now, or 1ms after `last` if the clock has not moved past it
pub(crate) fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + Duration::milliseconds(1),
        _ => now,
    }
}
