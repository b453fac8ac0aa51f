use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::Store;
use crate::StoreError;

#[derive(Debug, Default)]
struct SortedBucket {
    scores: HashMap<String, i64>,
    expires_at: Option<Instant>,
}

impl SortedBucket {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// An in-process [`Store`] backed by a concurrent map.
///
/// Each bucket is guarded by its map shard, so increments on the same bucket never lose
/// updates. Time-to-live is enforced lazily: an expired bucket reads as absent, and is
/// evicted the next time anything touches it or a new bucket is created.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: DashMap<String, SortedBucket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current score of `member` in the bucket at `key`.
    pub fn score(&self, key: &str, member: &str) -> Option<u64> {
        self.evict_expired(key);
        self.buckets
            .get(key)
            .and_then(|bucket| bucket.scores.get(member).map(|s| clamp(*s)))
    }

    /// Remaining time-to-live of the bucket at `key`, if it has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.evict_expired(key);
        let now = Instant::now();
        self.buckets
            .get(key)
            .and_then(|bucket| bucket.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.sweep_expired();
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&self, key: &str) {
        let now = Instant::now();
        self.buckets.remove_if(key, |_, bucket| bucket.is_expired(now));
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        self.buckets.retain(|_, bucket| !bucket.is_expired(now));
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn incr_score(&self, key: &str, delta: i64, member: &str) -> Result<(), StoreError> {
        self.evict_expired(key);
        // Day keys are never written again once the day is over, so a new bucket is
        // the point to reclaim the old ones.
        if !self.buckets.contains_key(key) {
            self.sweep_expired();
        }
        let mut bucket = self.buckets.entry(key.to_string()).or_default();
        *bucket.scores.entry(member.to_string()).or_insert(0) += delta;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        self.evict_expired(key);
        if seconds == 0 {
            self.buckets.remove(key);
        } else if let Some(mut bucket) = self.buckets.get_mut(key) {
            bucket.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.evict_expired(key);
        Ok(self.buckets.contains_key(key))
    }

    async fn range_desc_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, u64)>, StoreError> {
        self.evict_expired(key);
        let Some(bucket) = self.buckets.get(key) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(&String, i64)> = bucket.scores.iter().map(|(m, s)| (m, *s)).collect();
        // Highest score first, equal scores in reverse member order
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));

        let Some((first, last)) = resolve_range(entries.len(), start, stop) else {
            return Ok(Vec::new());
        };

        Ok(entries[first..=last]
            .iter()
            .map(|(member, score)| ((*member).clone(), clamp(*score)))
            .collect())
    }
}

fn clamp(score: i64) -> u64 {
    score.max(0) as u64
}

/// Converts inclusive, possibly negative, ranks into slice bounds.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { len + start } else { start }.max(0);
    let stop = if stop < 0 { len + stop } else { stop }.min(len - 1);

    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn it_creates_buckets_lazily() {
        let store = MemoryStore::new();

        assert!(!store.exists("day").await.unwrap());
        store.incr_score("day", 1, "Chrome").await.unwrap();
        assert!(store.exists("day").await.unwrap());
        assert_eq!(store.score("day", "Chrome"), Some(1));
    }

    #[tokio::test]
    async fn it_accumulates_increments() {
        let store = MemoryStore::new();

        for _ in 0..3 {
            store.incr_score("day", 1, "Chrome").await.unwrap();
        }
        store.incr_score("day", 5, "Firefox").await.unwrap();

        assert_eq!(store.score("day", "Chrome"), Some(3));
        assert_eq!(store.score("day", "Firefox"), Some(5));
        assert_eq!(store.score("day", "Safari"), None);
    }

    #[tokio::test]
    async fn it_ranges_highest_first() {
        let store = MemoryStore::new();
        store.incr_score("day", 2, "b").await.unwrap();
        store.incr_score("day", 9, "a").await.unwrap();
        store.incr_score("day", 2, "c").await.unwrap();
        store.incr_score("day", 4, "d").await.unwrap();

        let all = store.range_desc_with_scores("day", 0, -1).await.unwrap();
        assert_eq!(
            all,
            vec![
                ("a".to_string(), 9),
                ("d".to_string(), 4),
                ("c".to_string(), 2),
                ("b".to_string(), 2),
            ]
        );

        let top = store.range_desc_with_scores("day", 0, 1).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[1].0, "d");

        let tail = store.range_desc_with_scores("day", -2, -1).await.unwrap();
        assert_eq!(tail[0].0, "c");

        assert!(store.range_desc_with_scores("day", 5, 10).await.unwrap().is_empty());
        assert!(store.range_desc_with_scores("day", 2, 1).await.unwrap().is_empty());
        assert!(store.range_desc_with_scores("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expire_sets_and_refreshes_ttl() {
        let store = MemoryStore::new();
        store.incr_score("day", 1, "Chrome").await.unwrap();
        assert_eq!(store.ttl("day"), None);

        store.expire("day", 60).await.unwrap();
        let first = store.ttl("day").unwrap();
        assert!(first <= Duration::from_secs(60));
        assert!(first > Duration::from_secs(50));

        store.expire("day", 3600).await.unwrap();
        assert!(store.ttl("day").unwrap() > Duration::from_secs(60));
    }

    #[tokio::test]
    async fn expire_on_missing_bucket_is_a_noop() {
        let store = MemoryStore::new();

        store.expire("day", 60).await.unwrap();
        assert!(!store.exists("day").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_removes_the_bucket() {
        let store = MemoryStore::new();
        store.incr_score("day", 1, "Chrome").await.unwrap();

        store.expire("day", 0).await.unwrap();
        assert!(!store.exists("day").await.unwrap());
        assert_eq!(store.score("day", "Chrome"), None);
    }

    #[test]
    fn expired_buckets_read_as_absent() {
        let store = MemoryStore::new();
        store.buckets.insert(
            "day".to_string(),
            SortedBucket {
                scores: HashMap::from([("Chrome".to_string(), 4)]),
                expires_at: Some(Instant::now() - Duration::from_millis(1)),
            },
        );

        assert_eq!(store.score("day", "Chrome"), None);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn new_buckets_reclaim_expired_ones() {
        let store = MemoryStore::new();
        let past = Instant::now() - Duration::from_millis(1);
        for day in 1..=40 {
            store.buckets.insert(
                format!("api_requests:ips:2024-01-{day:02}"),
                SortedBucket {
                    scores: HashMap::from([("10.0.0.1".to_string(), 1)]),
                    expires_at: Some(past),
                },
            );
        }
        store.buckets.insert(
            "api_requests:2024-01-01".to_string(),
            SortedBucket {
                scores: HashMap::from([("curl".to_string(), 1)]),
                expires_at: None,
            },
        );

        for _ in 0..10 {
            store.incr_score("api_requests:ips:2024-06-15", 1, "10.0.0.1").await.unwrap();
            store.expire("api_requests:ips:2024-06-15", 60).await.unwrap();
            assert!(store.exists("api_requests:ips:2024-06-15").await.unwrap());
        }

        // Only the live bucket and the one without a time-to-live remain
        assert_eq!(store.buckets.len(), 2);
        assert!(store.buckets.contains_key("api_requests:2024-01-01"));
        assert_eq!(store.score("api_requests:ips:2024-06-15", "10.0.0.1"), Some(10));
    }

    #[test]
    fn resolve_range_handles_negative_ranks() {
        assert_eq!(resolve_range(4, 0, -1), Some((0, 3)));
        assert_eq!(resolve_range(4, -10, 1), Some((0, 1)));
        assert_eq!(resolve_range(4, 1, 100), Some((1, 3)));
        assert_eq!(resolve_range(4, -1, -1), Some((3, 3)));
        assert_eq!(resolve_range(0, 0, -1), None);
        assert_eq!(resolve_range(4, 3, 2), None);
    }

    #[tokio::test]
    async fn test_actual_concurrency() {
        let store = Arc::new(MemoryStore::new());
        let tasks = 200;

        let mut handles = vec![];
        for i in 0..tasks {
            let store = Arc::clone(&store);
            let member = if i % 2 == 0 { "even" } else { "odd" };
            handles.push(tokio::spawn(async move {
                store.incr_score("day", 1, member).await
            }));
        }

        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        // No increment may be lost under contention
        assert_eq!(store.score("day", "even"), Some(tasks / 2));
        assert_eq!(store.score("day", "odd"), Some(tasks / 2));
    }
}
