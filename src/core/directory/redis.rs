use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use super::{CorrelationStore, DirectoryError, DirectoryResult};

const KEY_PREFIX: &str = "sage:pending-call:";

/// Correlation store in Redis.
///
/// Entries are written with `SET ... EX` and consumed with `GETDEL`, so
/// expiry and single consumption are enforced by the server and shared by
/// every bridge instance.
#[derive(Clone)]
pub struct RedisCorrelationStore {
    pool: Pool,
    ttl_seconds: u64,
}

impl RedisCorrelationStore {
    pub fn new(url: &str, ttl: Duration) -> DirectoryResult<Self> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DirectoryError::Store(e.to_string()))?;
        Ok(Self {
            pool,
            ttl_seconds: ttl.as_secs().max(1),
        })
    }

    fn key(call_sid: &str) -> String {
        format!("{KEY_PREFIX}{call_sid}")
    }

    async fn connection(&self) -> DirectoryResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| DirectoryError::Store(e.to_string()))
    }
}

#[async_trait]
impl CorrelationStore for RedisCorrelationStore {
    async fn put(&self, call_sid: &str, phone_number: &str) -> DirectoryResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(Self::key(call_sid), phone_number, self.ttl_seconds)
            .await
            .map_err(|e| DirectoryError::Store(e.to_string()))
    }

    async fn take(&self, call_sid: &str) -> DirectoryResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get_del::<_, Option<String>>(Self::key(call_sid))
            .await
            .map_err(|e| DirectoryError::Store(e.to_string()))
    }
}
