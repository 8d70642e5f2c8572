pub mod block;
pub mod token;
pub mod transaction;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in seconds with sub-second precision
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
