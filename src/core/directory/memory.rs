use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use super::{CallRecord, CallerProfile, ClientStore, CorrelationStore, DirectoryError, DirectoryResult};

/// Upper bound on pending correlation entries held in memory.
const MAX_PENDING_CALLS: u64 = 100_000;

/// Upper bound on call records held by [`StaticClientStore`].
const MAX_RECORDED_CALLS: u64 = 10_000;

/// How long an in-memory call record is retained.
const CALL_RECORD_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct PendingCall {
    phone_number: String,
    expires_at: Instant,
}

/// In-process correlation store with per-entry time to live.
pub struct MemoryCorrelationStore {
    entries: Cache<String, PendingCall>,
    ttl: Duration,
}

impl MemoryCorrelationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_PENDING_CALLS)
                .build(),
            ttl,
        }
    }
}

#[async_trait]
impl CorrelationStore for MemoryCorrelationStore {
    async fn put(&self, call_sid: &str, phone_number: &str) -> DirectoryResult<()> {
        let entry = PendingCall {
            phone_number: phone_number.to_string(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(call_sid.to_string(), entry).await;
        Ok(())
    }

    async fn take(&self, call_sid: &str) -> DirectoryResult<Option<String>> {
        // The cache evicts lazily, so an entry past its deadline may still be held
        Ok(self
            .entries
            .remove(call_sid)
            .await
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.phone_number))
    }
}

/// Layout of a clients file.
///
/// ```yaml
/// clients:
///   - phone_number: "+15551234567"
///     name: "Dr. Rivera"
///     instructions: "You are a scheduling assistant for Dr. Rivera's office."
/// ```
#[derive(Debug, Deserialize)]
struct ClientsFile {
    #[serde(default)]
    clients: Vec<CallerProfile>,
}

/// Client store backed by a static profile list.
///
/// Call records are kept in a bounded cache keyed by call id, so they age
/// out after a day or once the capacity is reached. Use the PostgreSQL
/// store when records must be durable.
pub struct StaticClientStore {
    profiles: RwLock<HashMap<String, CallerProfile>>,
    calls: Cache<String, CallRecord>,
}

impl Default for StaticClientStore {
    fn default() -> Self {
        Self::with_call_capacity(MAX_RECORDED_CALLS)
    }
}

impl StaticClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store retaining at most `capacity` call records.
    pub fn with_call_capacity(capacity: u64) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            calls: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(CALL_RECORD_TTL)
                .build(),
        }
    }

    pub fn from_profiles<I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = CallerProfile>,
    {
        let store = Self::new();
        for profile in profiles {
            store.insert(profile);
        }
        store
    }

    /// Load profiles from a YAML or JSON clients file.
    pub fn from_file(path: &Path) -> DirectoryResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DirectoryError::Store(format!(
                "Failed to read clients file {}: {e}",
                path.display()
            ))
        })?;
        // YAML is a superset of JSON, so one parser covers both
        let file: ClientsFile = serde_yaml::from_str(&contents).map_err(|e| {
            DirectoryError::Store(format!(
                "Failed to parse clients file {}: {e}",
                path.display()
            ))
        })?;

        debug!(path = %path.display(), count = file.clients.len(), "Loaded client profiles");
        Ok(Self::from_profiles(file.clients))
    }

    /// Add or replace a profile, keyed by phone number.
    pub fn insert(&self, profile: CallerProfile) {
        self.profiles
            .write()
            .insert(profile.phone_number.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }

    /// Retained call records, oldest first.
    pub fn recorded_calls(&self) -> Vec<CallRecord> {
        let mut calls: Vec<CallRecord> = self.calls.iter().map(|(_, record)| record).collect();
        calls.sort_by_key(|record| record.created_at);
        calls
    }
}

#[async_trait]
impl ClientStore for StaticClientStore {
    async fn find_by_phone(&self, phone_number: &str) -> DirectoryResult<Option<CallerProfile>> {
        Ok(self.profiles.read().get(phone_number).cloned())
    }

    async fn record_call(&self, record: &CallRecord) -> DirectoryResult<()> {
        // Provider retries of the same webhook keep the first record
        self.calls
            .entry(record.call_sid.clone())
            .or_insert(record.clone())
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use time::OffsetDateTime;

    #[tokio::test]
    async fn test_take_is_single_use() {
        let store = MemoryCorrelationStore::new(Duration::from_secs(60));
        store.put("CA1", "+15551234567").await.unwrap();

        assert_eq!(store.take("CA1").await.unwrap().as_deref(), Some("+15551234567"));
        assert_eq!(store.take("CA1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MemoryCorrelationStore::new(Duration::from_millis(50));
        store.put("CA1", "+15551234567").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.take("CA1").await.unwrap(), None);
    }

    #[test]
    fn test_clients_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clients.yaml");
        fs::write(
            &path,
            r#"
clients:
  - phone_number: "+15551234567"
    name: "Dr. Rivera"
    instructions: "You are calm and concise."
  - phone_number: "+15557654321"
    name: "Northside Dental"
    instructions: "Book cleanings only."
"#,
        )
        .unwrap();

        let store = StaticClientStore::from_file(&path).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_clients_file_missing() {
        let result = StaticClientStore::from_file(Path::new("/nonexistent/clients.yaml"));
        assert!(matches!(result, Err(DirectoryError::Store(_))));
    }

    #[tokio::test]
    async fn test_record_call_deduplicates() {
        let store = StaticClientStore::new();
        let record = CallRecord {
            call_sid: "CA1".to_string(),
            account_sid: "AC1".to_string(),
            recipient: "+15557654321".to_string(),
            caller: "+15551234567".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        store.record_call(&record).await.unwrap();
        let retry = CallRecord {
            created_at: OffsetDateTime::now_utc(),
            ..record.clone()
        };
        store.record_call(&retry).await.unwrap();
        assert_eq!(store.recorded_calls(), vec![record]);
    }

    #[tokio::test]
    async fn test_recorded_calls_are_bounded() {
        let store = StaticClientStore::with_call_capacity(100);
        for n in 0..2_000 {
            let record = CallRecord {
                call_sid: format!("CA{n}"),
                account_sid: "AC1".to_string(),
                recipient: "+15557654321".to_string(),
                caller: "+15551234567".to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            store.record_call(&record).await.unwrap();
        }
        store.calls.run_pending_tasks().await;

        assert!(store.calls.entry_count() <= 100);
        assert!(store.recorded_calls().len() <= 100);
    }
}
