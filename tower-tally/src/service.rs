use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::task::ready;

use futures::future::BoxFuture;
use http::Request;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tally_stats::StoreError;
use tally_stats::bucket_key;
use tower::Service;

use crate::config::TrackingConfig;
use crate::extract::KeyExtractor;

#[derive(Clone, Debug)]
struct TrackingMetrics {
    tracked: Counter<u64>,
    errors: Counter<u64>,
}

/// Shared between a layer and every service it produces.
#[derive(Debug)]
pub(crate) struct Tracker<K> {
    extractor: K,
    config: TrackingConfig,
    instruments: TrackingMetrics,
}

impl<K> Tracker<K>
where
    K: KeyExtractor,
{
    pub(crate) fn new(extractor: K, config: TrackingConfig) -> Self {
        let meter = global::meter("tracking_service");
        let instruments = TrackingMetrics {
            tracked: meter.u64_counter("tracked_requests").build(),
            errors: meter.u64_counter("tracking_errors").build(),
        };

        Self {
            extractor,
            config,
            instruments,
        }
    }

    /// Prepares the store writes for `request`, or nothing if it is not tracked.
    fn begin<B>(self: &Arc<Self>, request: &Request<B>) -> Option<BoxFuture<'static, ()>> {
        let path = request.uri().path();
        let path = (!path.is_empty()).then_some(path);
        if !self.config.classifier.matches(path) {
            return None;
        }
        self.config.store.as_ref()?;

        let member = self.extractor.extract(request);
        let tracker = Arc::clone(self);
        Some(Box::pin(async move { tracker.record(&member).await }))
    }

    async fn record(&self, member: &str) {
        let attributes = [KeyValue::new("metric", K::KIND.as_str())];
        match self.write(member).await {
            Ok(()) => self.instruments.tracked.add(1, &attributes),
            Err(err) => {
                self.instruments.errors.add(1, &attributes);
                self.config
                    .sink
                    .error(&format!("{} error: {}", K::COMPONENT, err));
            }
        }
    }

    async fn write(&self, member: &str) -> Result<(), StoreError> {
        let Some(store) = &self.config.store else {
            return Ok(());
        };
        let key = bucket_key(&self.config.key_prefix, K::KIND, self.config.calendar.today());

        store.incr_score(&key, 1, member).await?;
        store.expire(&key, self.config.ttl_seconds()).await
    }
}

/// Counts each in-scope request in today's bucket, then hands it to the inner service.
///
/// The inner service always sees the request and its response or error is returned
/// untouched. Store failures are reported to the configured sink and go no further.
#[derive(Debug)]
pub struct TrackingService<K, S> {
    inner: S,
    tracker: Arc<Tracker<K>>,
}

impl<K, S> TrackingService<K, S>
where
    K: KeyExtractor,
{
    pub fn new(inner: S, extractor: K, config: TrackingConfig) -> Self {
        Self::from_tracker(inner, Arc::new(Tracker::new(extractor, config)))
    }

    pub(crate) fn from_tracker(inner: S, tracker: Arc<Tracker<K>>) -> Self {
        Self { inner, tracker }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<K, S> Clone for TrackingService<K, S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

pin_project! {
    /// Finishes the store writes, then drives the inner service future.
    pub struct ResponseFuture<F> {
        tracking: Option<BoxFuture<'static, ()>>,
        #[pin]
        inner: F,
    }
}

impl<F> Future for ResponseFuture<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if let Some(tracking) = this.tracking.as_mut() {
            ready!(tracking.as_mut().poll(cx));
            *this.tracking = None;
        }
        this.inner.poll(cx)
    }
}

impl<K, S, B> Service<Request<B>> for TrackingService<K, S>
where
    K: KeyExtractor,
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let tracking = self.tracker.begin(&request);
        ResponseFuture {
            tracking,
            inner: self.inner.call(request),
        }
    }
}
