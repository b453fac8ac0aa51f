/// Where tracking failures are reported.
///
/// Failures never reach the request pipeline, so this is the only place they surface.
pub trait ErrorSink: Send + Sync {
    fn error(&self, message: &str);
}

/// Reports failures as `tracing` error events.
///
/// Output lands wherever the host's subscriber writes, which is standard output for the
/// usual `tracing_subscriber::fmt()` setup.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn error(&self, message: &str) {
        tracing::error!(target: "tower_tally", "{message}");
    }
}

impl<F> ErrorSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn error(&self, message: &str) {
        self(message)
    }
}
