//! Extra utilities for use elsewhere in the API.

use time::OffsetDateTime;
use uuid::Uuid;

/// Current time as unix milliseconds, which is how all timestamps are stored.
/// Integer storage keeps `ORDER BY registered_at` exact; formatting for the
/// wire happens at serialization time.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// A human-trackable payment reference like `TXN1756641341000AB12C`. Used for
/// reconciling manual UPI transfers, so it only needs to be unique enough for
/// an admin scanning a spreadsheet.
pub fn transaction_id(now_millis: i64) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(5)
        .collect();

    format!("TXN{}{}", now_millis, suffix.to_uppercase())
}
