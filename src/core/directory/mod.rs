//! Session directory: maps a telephony call id to the caller profile.
//!
//! The call announcement webhook records a short-lived correlation entry
//! (call id → phone number) before the media stream opens. When the stream
//! starts, the bridge consumes that entry and loads the caller profile from
//! the durable client store.
//!
//! Both stores are injected as trait objects so the process bootstrap can
//! pick in-memory, Redis or PostgreSQL backends.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

mod memory;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "redis")]
mod redis;

pub use memory::{MemoryCorrelationStore, StaticClientStore};
#[cfg(feature = "postgres")]
pub use self::postgres::PgClientStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisCorrelationStore;

/// Errors from directory lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No pending correlation entry for the call (never announced, expired, or already consumed)
    #[error("Unknown call: {0}")]
    UnknownCall(String),

    /// The phone number has no usable client profile
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    /// Backend store failure
    #[error("Directory store error: {0}")]
    Store(String),
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Profile used to personalize the agent for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerProfile {
    pub phone_number: String,
    pub name: String,
    pub instructions: String,
}

/// Durable record of an announced call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub call_sid: String,
    pub account_sid: String,
    pub recipient: String,
    pub caller: String,
    pub created_at: OffsetDateTime,
}

/// Short-lived call id → phone number entries.
///
/// `take` must be atomic: a given entry is returned at most once.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    async fn put(&self, call_sid: &str, phone_number: &str) -> DirectoryResult<()>;

    async fn take(&self, call_sid: &str) -> DirectoryResult<Option<String>>;
}

/// Durable store of client profiles and call records.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> DirectoryResult<Option<CallerProfile>>;

    async fn record_call(&self, record: &CallRecord) -> DirectoryResult<()>;
}

/// Facade over the correlation and client stores.
pub struct SessionDirectory {
    correlations: Arc<dyn CorrelationStore>,
    clients: Arc<dyn ClientStore>,
}

impl SessionDirectory {
    pub fn new(correlations: Arc<dyn CorrelationStore>, clients: Arc<dyn ClientStore>) -> Self {
        Self {
            correlations,
            clients,
        }
    }

    /// Record that `call_sid` belongs to `phone_number`.
    ///
    /// Announcing the same call again overwrites the previous entry.
    pub async fn announce(&self, call_sid: &str, phone_number: &str) -> DirectoryResult<()> {
        self.correlations.put(call_sid, phone_number).await?;
        info!(call_sid = %call_sid, "Call announced");
        Ok(())
    }

    /// Consume the correlation entry for `call_sid` and load the caller profile.
    ///
    /// The entry is deleted before the profile lookup, so a second call for
    /// the same id fails with [`DirectoryError::UnknownCall`] whatever the
    /// outcome of the first.
    pub async fn resolve_and_consume(&self, call_sid: &str) -> DirectoryResult<CallerProfile> {
        let phone_number = self
            .correlations
            .take(call_sid)
            .await?
            .ok_or_else(|| DirectoryError::UnknownCall(call_sid.to_string()))?;

        debug!(call_sid = %call_sid, "Correlation entry consumed");

        match self.clients.find_by_phone(&phone_number).await? {
            Some(profile) => Ok(profile),
            None => {
                warn!(call_sid = %call_sid, "No client profile for announced number");
                Err(DirectoryError::UnknownClient(phone_number))
            }
        }
    }

    /// Persist a call record in the client store.
    pub async fn record_call(&self, record: &CallRecord) -> DirectoryResult<()> {
        self.clients.record_call(record).await
    }
}
