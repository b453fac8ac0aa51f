//! # Tower Tally
//!
//! `tower-tally` counts, per calendar day, which client IP addresses and user-agents hit
//! a [Tower](https://github.com/tower-rs/tower) service, and leaves the report to
//! [`tally_stats::StatsReporter`].
//!
//! ## How it works
//!
//! A [`TrackingLayer`] wraps any `Service<http::Request<B>>`. For each request whose
//! path the [`tally_stats::RequestClassifier`] accepts, it:
//!
//! 1. **Extracts** a tracking key ([`ClientIp`] or [`UserAgent`]).
//! 2. **Increments** that key's score in today's bucket, `{prefix}:ips:{date}` or
//!    `{prefix}:{date}`, by one.
//! 3. **Refreshes** the bucket's time-to-live to `expiry_days` days.
//!
//! The request is then passed on, untouched. Store failures are reported to an
//! [`ErrorSink`] (by default a `tracing` error event) and never reach the caller.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tally_stats::MemoryStore;
//! use tower::ServiceBuilder;
//! use tower_tally::{ServiceBuilderExt, TrackingConfig};
//!
//! let store = Arc::new(MemoryStore::new());
//! let config = TrackingConfig::new().with_store(store);
//!
//! let svc = ServiceBuilder::new()
//!     .track_requests(config)
//!     .service_fn(|_req: http::Request<()>| async {
//!         Ok::<_, std::convert::Infallible>(http::Response::new("ok"))
//!     });
//! # let _ = svc;
//! ```
//!
//! ## Feature Flags
//!
//! - `axum`: Reads the remote address from axum's `ConnectInfo<SocketAddr>` when no
//!   [`RemoteAddr`] extension is present.

mod config;
mod extract;
mod layer;
mod service;
mod sink;
mod utils;


pub use config::TrackingConfig;
pub use extract::CF_CONNECTING_IP;
pub use extract::ClientIp;
pub use extract::KeyExtractor;
pub use extract::RemoteAddr;
pub use extract::UNKNOWN;
pub use extract::UserAgent;
pub use extract::X_FORWARDED_FOR;
pub use layer::TrackingLayer;
pub use service::ResponseFuture;
pub use service::TrackingService;
pub use sink::ErrorSink;
pub use sink::TracingSink;
pub use utils::ServiceBuilderExt;
