//! Redis-backed [`Store`] for deployments where several processes share counters.
//!
//! Buckets map onto Redis sorted sets, so increments are atomic server side and
//! expiry is handled by Redis itself.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::Store;
use crate::StoreError;

/// A [`Store`] talking to Redis through a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("Redis client error: {}", e)))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("Redis connection manager error: {}", e)))?;

        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

fn command_error(e: redis::RedisError) -> StoreError {
    if e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

/// Sorted set scores come back as floats; counts are never negative or fractional.
fn score_count(score: f64) -> u64 {
    score.max(0.0) as u64
}

#[async_trait]
impl Store for RedisStore {
    async fn incr_score(&self, key: &str, delta: i64, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.zincr::<_, _, _, f64>(key, member, delta)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(key, seconds as i64)
            .await
            .map_err(command_error)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(command_error)
    }

    async fn range_desc_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, u64)>, StoreError> {
        let mut conn = self.conn.clone();
        let entries: Vec<(String, f64)> = conn
            .zrevrange_withscores(key, start, stop)
            .await
            .map_err(command_error)?;

        Ok(entries
            .into_iter()
            .map(|(member, score)| (member, score_count(score)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use redis::ErrorKind;
    use redis::RedisError;

    use super::*;

    #[test]
    fn scores_become_counts() {
        assert_eq!(score_count(42.0), 42);
        assert_eq!(score_count(7.9), 7);
        assert_eq!(score_count(0.0), 0);
        assert_eq!(score_count(-3.0), 0);
        assert_eq!(score_count(f64::NAN), 0);
        assert_eq!(score_count(f64::INFINITY), u64::MAX);
    }

    #[test]
    fn transport_failures_are_connection_errors() {
        let refused = RedisError::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(matches!(command_error(refused), StoreError::Connection(_)));

        let timed_out = RedisError::from(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        assert!(matches!(command_error(timed_out), StoreError::Connection(_)));

        let dropped = RedisError::from(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        assert!(matches!(command_error(dropped), StoreError::Connection(_)));
    }

    #[test]
    fn server_replies_are_command_errors() {
        let wrong_type = RedisError::from((ErrorKind::TypeError, "WRONGTYPE"));
        assert!(matches!(command_error(wrong_type), StoreError::Command(_)));

        let read_only = RedisError::from((ErrorKind::ReadOnly, "READONLY"));
        match command_error(read_only) {
            StoreError::Command(message) => assert!(message.contains("READONLY")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
