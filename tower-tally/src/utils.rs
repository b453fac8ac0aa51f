use tower::ServiceBuilder;
use tower::layer::util::Stack;

use crate::TrackingConfig;
use crate::TrackingLayer;
use crate::extract::ClientIp;
use crate::extract::UserAgent;

/// Service Builder Extension adding the trackers to a tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Add a client IP tracking layer
    fn track_ips(self, config: TrackingConfig) -> ServiceBuilder<Stack<TrackingLayer<ClientIp>, L>>;

    /// Add a user-agent tracking layer
    fn track_user_agents(
        self,
        config: TrackingConfig,
    ) -> ServiceBuilder<Stack<TrackingLayer<UserAgent>, L>>;

    /// Add both trackers, sharing one configuration
    fn track_requests(
        self,
        config: TrackingConfig,
    ) -> ServiceBuilder<Stack<TrackingLayer<UserAgent>, Stack<TrackingLayer<ClientIp>, L>>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn track_ips(self, config: TrackingConfig) -> ServiceBuilder<Stack<TrackingLayer<ClientIp>, L>> {
        self.layer(TrackingLayer::ip(config))
    }

    fn track_user_agents(
        self,
        config: TrackingConfig,
    ) -> ServiceBuilder<Stack<TrackingLayer<UserAgent>, L>> {
        self.layer(TrackingLayer::user_agent(config))
    }

    fn track_requests(
        self,
        config: TrackingConfig,
    ) -> ServiceBuilder<Stack<TrackingLayer<UserAgent>, Stack<TrackingLayer<ClientIp>, L>>> {
        self.track_ips(config.clone()).track_user_agents(config)
    }
}
