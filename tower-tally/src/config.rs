use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use tally_stats::Calendar;
use tally_stats::DEFAULT_EXPIRY_DAYS;
use tally_stats::DEFAULT_KEY_PREFIX;
use tally_stats::LocalCalendar;
use tally_stats::RequestClassifier;
use tally_stats::SECONDS_PER_DAY;
use tally_stats::Store;

use crate::sink::ErrorSink;
use crate::sink::TracingSink;

/// Everything a tracker needs, passed in explicitly.
///
/// Without a store, tracking is disabled and requests pass straight through.
#[derive(Clone)]
pub struct TrackingConfig {
    pub(crate) store: Option<Arc<dyn Store>>,
    pub(crate) classifier: RequestClassifier,
    pub(crate) sink: Arc<dyn ErrorSink>,
    pub(crate) expiry_days: NonZeroU32,
    pub(crate) key_prefix: String,
    pub(crate) calendar: Arc<dyn Calendar>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            store: None,
            classifier: RequestClassifier::default(),
            sink: Arc::new(TracingSink),
            expiry_days: NonZeroU32::new(DEFAULT_EXPIRY_DAYS).unwrap_or(NonZeroU32::MIN),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            calendar: Arc::new(LocalCalendar),
        }
    }
}

impl TrackingConfig {
    /// Defaults: no store, `/api/` paths, `tracing` error sink, 31 day expiry,
    /// `api_requests` namespace, local calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store counters are written to.
    pub fn with_store<S>(mut self, store: Arc<S>) -> Self
    where
        S: Store + 'static,
    {
        self.store = Some(store);
        self
    }

    /// Set which requests are tracked.
    pub fn with_classifier(mut self, classifier: RequestClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set where store failures are reported.
    pub fn with_sink<E>(mut self, sink: Arc<E>) -> Self
    where
        E: ErrorSink + 'static,
    {
        self.sink = sink;
        self
    }

    /// Set how many days a bucket survives after its last write.
    pub fn with_expiry_days(mut self, days: NonZeroU32) -> Self {
        self.expiry_days = days;
        self
    }

    /// Set the namespace bucket keys are written under.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the source of today's date.
    pub fn with_calendar(mut self, calendar: Arc<dyn Calendar>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Time-to-live applied to a bucket on every write.
    pub fn ttl_seconds(&self) -> u64 {
        u64::from(self.expiry_days.get()) * SECONDS_PER_DAY
    }
}

impl fmt::Debug for TrackingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingConfig")
            .field("enabled", &self.is_enabled())
            .field("classifier", &self.classifier)
            .field("expiry_days", &self.expiry_days)
            .field("key_prefix", &self.key_prefix)
            .field("calendar", &self.calendar)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TrackingConfig::new();

        assert!(!config.is_enabled());
        assert_eq!(config.key_prefix(), "api_requests");
        assert_eq!(config.expiry_days.get(), 31);
        assert_eq!(config.ttl_seconds(), 31 * 86_400);
        assert!(config.classifier.matches(Some("/api/v1/advisories")));
        assert!(!config.classifier.matches(Some("/advisories")));
    }

    #[test]
    fn custom_expiry() {
        let config = TrackingConfig::new().with_expiry_days(NonZeroU32::new(7).unwrap());

        assert_eq!(config.ttl_seconds(), 604_800);
    }

    #[test]
    fn store_enables_tracking() {
        let config = TrackingConfig::new().with_store(Arc::new(tally_stats::MemoryStore::new()));

        assert!(config.is_enabled());
        assert!(format!("{config:?}").contains("enabled: true"));
    }
}
