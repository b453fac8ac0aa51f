use std::fmt;
use std::sync::Arc;

/// Paths starting with this prefix are tracked by default.
pub const DEFAULT_PATH_PREFIX: &str = "/api/";

type Predicate = dyn Fn(Option<&str>) -> bool + Send + Sync;

/// Decides whether a request path is in scope for tracking.
///
/// The default policy accepts any path beginning with [`DEFAULT_PATH_PREFIX`]. An absent
/// path is never in scope.
#[derive(Clone)]
pub struct RequestClassifier {
    predicate: Arc<Predicate>,
}

impl RequestClassifier {
    /// Accepts paths that start with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::from_fn(move |path| path.is_some_and(|p| p.starts_with(prefix.as_str())))
    }

    /// Uses an arbitrary predicate over the (possibly absent) path.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(Option<&str>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn matches(&self, path: Option<&str>) -> bool {
        (self.predicate)(path)
    }
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PATH_PREFIX)
    }
}

impl fmt::Debug for RequestClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClassifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tracks_api_paths() {
        let classifier = RequestClassifier::default();

        assert!(classifier.matches(Some("/api/v1/advisories")));
        assert!(classifier.matches(Some("/api/")));
        assert!(!classifier.matches(Some("/advisories")));
        assert!(!classifier.matches(Some("/api")));
        assert!(!classifier.matches(Some("/API/v1")));
        assert!(!classifier.matches(Some("")));
    }

    #[test]
    fn absent_path_is_never_tracked() {
        assert!(!RequestClassifier::default().matches(None));
        assert!(!RequestClassifier::with_prefix("/").matches(None));
    }

    #[test]
    fn custom_prefix() {
        let classifier = RequestClassifier::with_prefix("/custom/");

        assert!(classifier.matches(Some("/custom/endpoint")));
        assert!(!classifier.matches(Some("/api/v1/advisories")));
    }

    #[test]
    fn custom_predicate() {
        let classifier = RequestClassifier::from_fn(|path| path.is_none_or(|p| p.ends_with(".json")));

        assert!(classifier.matches(None));
        assert!(classifier.matches(Some("/feed.json")));
        assert!(!classifier.matches(Some("/feed.xml")));
    }

    #[test]
    fn clones_share_the_predicate() {
        let classifier = RequestClassifier::with_prefix("/v2/");
        let cloned = classifier.clone();

        assert!(Arc::ptr_eq(&classifier.predicate, &cloned.predicate));
        assert!(cloned.matches(Some("/v2/items")));
    }
}
