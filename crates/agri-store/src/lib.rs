pub mod api_cache;
pub mod db;
pub mod error;
pub mod forecast_cache;
pub mod history;

pub use db::{fingerprint, AgriStore, CacheStats};
pub use error::{StoreError, StoreResult};

use chrono::{NaiveDateTime, Utc};

/// Timestamps are stored as UTC text, so comparisons are lexicographic
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
