use chrono::Utc;
use redis::RedisResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

/// Counter key for the fixed window containing `now_secs`. Every window gets its own
/// key, so hits in one window never carry over into the next.
pub fn window_key(key: &str, now_secs: i64, window_seconds: i64) -> String {
    let window = window_seconds.max(1);
    format!("{}:{}", key, now_secs.div_euclid(window))
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Counts a hit on `key` in the current fixed window of `window_seconds`.
    /// Returns false once the window holds more than `limit` hits.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let counter = window_key(key, Utc::now().timestamp(), window_seconds);

        // The expiry only reclaims the key once its window is over.
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(&counter, 1)
            .expire(&counter, window_seconds.max(1))
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_window_key_changes_at_window_boundary() {
        assert_eq!(window_key("ratelimit:10.0.0.1", 0, 60), "ratelimit:10.0.0.1:0");
        assert_eq!(window_key("ratelimit:10.0.0.1", 59, 60), "ratelimit:10.0.0.1:0");
        assert_eq!(window_key("ratelimit:10.0.0.1", 60, 60), "ratelimit:10.0.0.1:1");
        assert_eq!(window_key("ratelimit:10.0.0.1", 1_700_000_030, 60), "ratelimit:10.0.0.1:28333333");
    }

    #[test]
    fn test_zero_window_does_not_divide_by_zero() {
        assert_eq!(window_key("k", 42, 0), "k:42");
    }

    #[test]
    fn test_steady_traffic_under_limit_is_never_blocked() {
        // One hit every 30s for two hours against 100 hits per 60s.
        let (limit, window) = (100, 60);
        let mut counters: HashMap<String, i64> = HashMap::new();
        for hit in 0..240 {
            let counter = counters
                .entry(window_key("ratelimit:10.0.0.1", 1_700_000_000 + hit * 30, window))
                .or_default();
            *counter += 1;
            assert!(*counter <= limit, "blocked at hit {}", hit);
            assert!(*counter <= 2);
        }
    }
}
