//! # tally-stats
//!
//! `tally-stats` keeps per-day frequency counters for request attributes (client IP
//! addresses and user-agent strings) in a key-value store, and turns a trailing window
//! of those daily buckets into a ranked, human-readable report.
//!
//! ## Core Philosophy
//!
//! The crate never locks. Every write is a single atomic score increment followed by a
//! time-to-live refresh, both delegated to the [`Store`]. Buckets are created lazily on
//! first increment and disappear on their own when the store expires them.
//!
//! ## Key Concepts
//!
//! * **Bucket**: one sorted collection per `(metric kind, calendar date)`, where the
//!   member is the tracking key and the score is the day's count.
//! * **Store**: the minimal async capability the crate consumes. [`MemoryStore`] is
//!   provided in-process; `RedisStore` is available with the `redis` feature.
//! * **Reporter**: [`StatsReporter`] merges N days of buckets and renders the summary.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tally_stats::{MemoryStore, MetricKind, StatsReporter, Store, bucket_key};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MemoryStore::new());
//! let today = chrono::Local::now().date_naive();
//! let key = bucket_key("api_requests", MetricKind::UserAgent, today);
//!
//! store.incr_score(&key, 1, "curl/8.5.0").await.unwrap();
//!
//! let reporter = StatsReporter::new(store);
//! let summary = reporter.summarize(7).await.unwrap();
//! assert_eq!(summary.user_agents()["curl/8.5.0"], 1);
//! # }
//! ```

use async_trait::async_trait;

mod bucket;
mod classifier;
mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;
mod reporter;

pub use bucket::Calendar;
pub use bucket::DEFAULT_EXPIRY_DAYS;
pub use bucket::DEFAULT_KEY_PREFIX;
pub use bucket::FixedCalendar;
pub use bucket::LocalCalendar;
pub use bucket::MetricKind;
pub use bucket::SECONDS_PER_DAY;
pub use bucket::bucket_key;
pub use classifier::DEFAULT_PATH_PREFIX;
pub use classifier::RequestClassifier;
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use reporter::Summary;
pub use reporter::StatsReporter;

/// The key-value store capability consumed by trackers and reporters.
///
/// Buckets are sorted collections: members are tracking keys, scores are counts.
/// Implementations must make [`Store::incr_score`] atomic, since concurrent requests
/// increment the same bucket without any coordination on our side.
#[async_trait]
pub trait Store: Send + Sync {
    /// Adds `delta` to the score of `member` in the collection at `key`, creating
    /// either of them if needed.
    async fn incr_score(&self, key: &str, delta: i64, member: &str) -> Result<(), StoreError>;

    /// Sets (or refreshes) the time-to-live of the collection at `key`.
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError>;

    /// Returns whether a collection currently exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Returns members with their scores, highest score first.
    ///
    /// `start` and `stop` are inclusive ranks. Negative values count back from the
    /// lowest ranked member, so `(0, -1)` returns the whole collection.
    async fn range_desc_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, u64)>, StoreError>;
}
