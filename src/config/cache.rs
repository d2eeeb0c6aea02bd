//! Redis 캐시 설정 모듈.
//!
//! Besides pool setup this module holds the small MessagePack cache helpers
//! used for roster lookups (teams, shifts, months).

use deadpool_redis::redis::{cmd, AsyncCommands};
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use once_cell::sync::OnceCell;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::env::{get_env, APP_CONFIG};
use crate::error::{AppError, AppResult};

static CACHE_POOL: OnceCell<Pool> = OnceCell::new();

/// Keys requested per `SCAN` step during invalidation.
const SCAN_BATCH: usize = 500;

/// Builds the Redis connection URL from `REDIS_*` variables.
pub fn redis_url() -> String {
    let host = get_env("REDIS_HOST", Some("localhost"));
    let port = get_env("REDIS_PORT", Some("6379"));
    let password = get_env("REDIS_PASSWORD", None);

    if password.is_empty() {
        format!("redis://{host}:{port}")
    } else {
        format!("redis://:{password}@{host}:{port}")
    }
}

/// Creates a Redis pool without opening a connection.
pub fn build_cache_pool(url: &str) -> AppResult<Pool> {
    let mut cfg = Config::from_url(url);
    cfg.pool = Some(PoolConfig {
        max_size: APP_CONFIG.redis_max_connections,
        ..PoolConfig::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| AppError::Internal(format!("Redis pool error: {e}")))
}

/// Initializes the Redis connection pool and checks that it is reachable.
pub async fn init_cache() -> AppResult<Pool> {
    if let Some(pool) = CACHE_POOL.get() {
        return Ok(pool.clone());
    }

    let pool = build_cache_pool(&redis_url())?;

    let conn = pool
        .get()
        .await
        .map_err(|e| AppError::Internal(format!("Redis connection test failed: {e}")))?;
    drop(conn);

    CACHE_POOL.set(pool.clone()).ok();
    tracing::info!(
        max_connections = APP_CONFIG.redis_max_connections,
        "Redis connection pool established"
    );

    Ok(pool)
}

/// Closes the Redis connection pool.
///
/// Note: The pool handles cleanup automatically when dropped.
pub fn close_cache() {
    tracing::info!("Redis connection pool closed");
}

/// Reads a MessagePack value from the cache.
///
/// Cache failures never fail the request: they are logged and reported as a miss.
pub async fn cache_get<T: DeserializeOwned>(pool: &Pool, key: &str) -> Option<T> {
    let mut conn = match pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(cache_key = %key, error = %e, "Cache unavailable, skipping read");
            return None;
        }
    };

    let bytes: Vec<u8> = conn.get(key).await.ok()?;
    if bytes.is_empty() {
        return None;
    }
    rmp_serde::from_slice(&bytes).ok()
}

/// Writes a MessagePack value to the cache with the configured TTL.
pub async fn cache_set<T: Serialize>(pool: &Pool, key: &str, value: &T) {
    let data = match rmp_serde::to_vec(value) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(cache_key = %key, error = %e, "Failed to serialize cache value");
            return;
        }
    };

    let Ok(mut conn) = pool.get().await else {
        return;
    };

    let result: Result<(), deadpool_redis::redis::RedisError> =
        conn.set_ex(key, data, APP_CONFIG.cache_ttl_secs).await;
    if let Err(e) = result {
        tracing::error!(cache_key = %key, error = %e, "Failed to write cache value");
    }
}

/// Deletes every key under `prefix`, one `SCAN` batch at a time.
pub async fn cache_invalidate_prefix(pool: &Pool, prefix: &str) -> AppResult<()> {
    let mut conn = pool.get().await?;
    let pattern = scan_pattern(prefix);
    let mut cursor: u64 = 0;

    loop {
        let (next, keys): (u64, Vec<String>) = cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(&pattern)
            .arg("COUNT")
            .arg(SCAN_BATCH)
            .query_async(&mut conn)
            .await?;

        if !keys.is_empty() {
            let _: () = conn.del(keys).await?;
        }
        if next == 0 {
            return Ok(());
        }
        cursor = next;
    }
}

/// `MATCH` pattern for every key under `prefix`, glob characters escaped.
fn scan_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_url_scheme() {
        assert!(redis_url().starts_with("redis://"));
    }

    #[tokio::test]
    async fn test_build_cache_pool_is_lazy() {
        // 연결 없이 풀 생성 가능해야 함
        let pool = build_cache_pool("redis://127.0.0.1:6390");
        assert!(pool.is_ok());
    }

    #[test]
    fn test_scan_pattern() {
        assert_eq!(scan_pattern("roster:"), "roster:*");
        assert_eq!(scan_pattern("a*b?"), "a\\*b\\?*");
    }
}
