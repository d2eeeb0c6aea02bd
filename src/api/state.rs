//! Application state module.

use deadpool_redis::Pool as RedisPool;
use sqlx::PgPool;

/// Shared application state.
///
/// Cloned into every handler; both pools are `Arc` based.
#[derive(Clone)]
pub struct AppState {
    /// `PostgreSQL` connection pool
    pub db: PgPool,
    /// Redis pool for roster lookup caches
    pub cache: RedisPool,
}

impl AppState {
    #[must_use]
    pub const fn new(db: PgPool, cache: RedisPool) -> Self {
        Self { db, cache }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone_and_send() {
        // 핸들러 간 공유를 위해 Clone + Send + Sync 필요
        fn assert_shared<T: Clone + Send + Sync + 'static>() {}
        assert_shared::<AppState>();
    }
}
