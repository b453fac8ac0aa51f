use std::sync::Arc;

use tower::Layer;

use crate::config::TrackingConfig;
use crate::extract::ClientIp;
use crate::extract::KeyExtractor;
use crate::extract::UserAgent;
use crate::service::Tracker;
use crate::service::TrackingService;

/// Applies per-day request tracking to a service.
///
/// All services produced by one layer share a single tracker, so cloning services (as
/// routers do per connection) does not duplicate configuration or metrics.
#[derive(Debug)]
pub struct TrackingLayer<K> {
    tracker: Arc<Tracker<K>>,
}

impl<K> Clone for TrackingLayer<K> {
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<K> TrackingLayer<K>
where
    K: KeyExtractor,
{
    /// Create a TrackingLayer counting whatever `extractor` pulls out of each request.
    pub fn new(extractor: K, config: TrackingConfig) -> Self {
        Self {
            tracker: Arc::new(Tracker::new(extractor, config)),
        }
    }
}

impl TrackingLayer<ClientIp> {
    /// Count client IP addresses in `{prefix}:ips:{date}` buckets.
    pub fn ip(config: TrackingConfig) -> Self {
        Self::new(ClientIp, config)
    }
}

impl TrackingLayer<UserAgent> {
    /// Count user-agent strings in `{prefix}:{date}` buckets.
    pub fn user_agent(config: TrackingConfig) -> Self {
        Self::new(UserAgent, config)
    }
}

impl<K, S> Layer<S> for TrackingLayer<K>
where
    K: KeyExtractor,
{
    type Service = TrackingService<K, S>;

    fn layer(&self, service: S) -> Self::Service {
        TrackingService::from_tracker(service, Arc::clone(&self.tracker))
    }
}
