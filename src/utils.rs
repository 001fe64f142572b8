use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use log::{error, warn};

pub struct Utils {}

impl Utils {
    /// Consume the result of a best-effort lookup: the value on success, `None`
    /// after logging on failure. The caller keeps going either way.
    pub fn log_and_discard<T, E: Display>(result: Result<T, E>, what: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("{}: {}", what, e);
                None
            }
        }
    }

    /// Unix seconds to a UTC timestamp. Out-of-range input clamps to the
    /// epoch with a warning.
    pub fn utc_from_unix(ts: i64) -> DateTime<Utc> {
        match Utc.timestamp_opt(ts, 0).single() {
            Some(dt) => dt,
            None => {
                warn!("Timestamp {} is out of range, using the epoch", ts);
                DateTime::<Utc>::UNIX_EPOCH
            }
        }
    }
}
