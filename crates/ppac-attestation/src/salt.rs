//! Salt lifecycle management for replay protection.
//!
//! Each donation request carries a client-generated salt token. The first
//! request a salt is seen on creates a record; later requests with the same
//! token are only admitted while the record is inside the attestation
//! validity window. Token entropy and uniqueness are the client's
//! responsibility; the server only enforces the single-use-per-window
//! semantics.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::errors::{AttestationError, Result, StoreError};

/// Persisted salt record. Immutable once created; the creation time is set at
/// first admission and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltRecord {
    pub token: String,
    pub created_at_ms: i64,
}

/// Outcome of a salt admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaltAdmission {
    /// First use of this token; a record was created.
    Created(SaltRecord),
    /// The token was already known and is still inside its validity window.
    Existing(SaltRecord),
}

impl SaltAdmission {
    pub fn record(&self) -> &SaltRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    pub fn is_first_use(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Salt persistence capability (in-memory, database, distributed KV, ...).
///
/// `insert_if_absent` must behave as an atomic conditional insert under
/// concurrent callers: for a given token, exactly one caller observes
/// `Created` and every other caller observes the same `Existing` record.
/// Single-use semantics depend on this being a true atomic primitive in the
/// backing store, not a check-then-insert sequence.
#[async_trait]
pub trait SaltStore: Send + Sync {
    async fn find_by_token(&self, token: &str) -> std::result::Result<Option<SaltRecord>, StoreError>;

    async fn insert_if_absent(
        &self,
        token: &str,
        created_at_ms: i64,
    ) -> std::result::Result<SaltAdmission, StoreError>;
}

/// In-memory salt store for development and testing.
#[derive(Debug, Default)]
pub struct InMemorySaltStore {
    records: Arc<RwLock<HashMap<String, SaltRecord>>>,
}

impl InMemorySaltStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete records created at or before the cutoff. Retention is an
    /// external concern; this is the sweep primitive a cleanup job would use.
    pub async fn cleanup_expired(&self, cutoff_ms: i64) -> u64 {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| record.created_at_ms > cutoff_ms);
        (before - records.len()) as u64
    }
}

#[async_trait]
impl SaltStore for InMemorySaltStore {
    async fn find_by_token(&self, token: &str) -> std::result::Result<Option<SaltRecord>, StoreError> {
        Ok(self.records.read().await.get(token).cloned())
    }

    async fn insert_if_absent(
        &self,
        token: &str,
        created_at_ms: i64,
    ) -> std::result::Result<SaltAdmission, StoreError> {
        let mut records = self.records.write().await;
        match records.entry(token.to_string()) {
            Entry::Occupied(existing) => Ok(SaltAdmission::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                let record = SaltRecord {
                    token: token.to_string(),
                    created_at_ms,
                };
                slot.insert(record.clone());
                Ok(SaltAdmission::Created(record))
            }
        }
    }
}

/// Admits or rejects salts against the configured validity window.
pub struct SaltRegistry {
    store: Arc<dyn SaltStore>,
    validity_window: Duration,
}

impl SaltRegistry {
    pub fn new(store: Arc<dyn SaltStore>, validity_window: Duration) -> Self {
        Self {
            store,
            validity_window,
        }
    }

    /// Admit a salt token for one verification attempt.
    ///
    /// An absent token is persisted with the current time and admitted as
    /// first use. A known token is admitted only while its creation time is
    /// strictly inside the validity window; records are never mutated or
    /// deleted here.
    pub async fn admit(&self, token: &str) -> Result<SaltAdmission> {
        if token.is_empty() {
            return Err(AttestationError::MissingSalt);
        }

        let now_ms = Utc::now().timestamp_millis();
        let admission = self.store.insert_if_absent(token, now_ms).await?;

        match &admission {
            SaltAdmission::Created(_) => {
                tracing::debug!(token, "Salt admitted on first use");
            }
            SaltAdmission::Existing(record) => {
                let lower_limit_ms = now_ms - self.validity_window.as_millis() as i64;
                if record.created_at_ms <= lower_limit_ms {
                    return Err(AttestationError::SaltExpired(record.clone()));
                }
                tracing::debug!(token, created_at_ms = record.created_at_ms, "Known salt re-admitted inside validity window");
            }
        }

        Ok(admission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RejectionKind;

    fn registry(store: Arc<InMemorySaltStore>, window_secs: u64) -> SaltRegistry {
        SaltRegistry::new(store, Duration::from_secs(window_secs))
    }

    #[tokio::test]
    async fn empty_salt_is_rejected() {
        let registry = registry(Arc::new(InMemorySaltStore::new()), 7200);
        let err = registry.admit("").await.unwrap_err();
        assert_eq!(err.kind(), RejectionKind::MissingSalt);
    }

    #[tokio::test]
    async fn first_use_creates_a_record() {
        let store = Arc::new(InMemorySaltStore::new());
        let registry = registry(store.clone(), 7200);

        let admission = registry.admit("fresh-salt").await.unwrap();
        assert!(admission.is_first_use());
        assert!(store.find_by_token("fresh-salt").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_use_inside_window_is_admitted_as_existing() {
        let store = Arc::new(InMemorySaltStore::new());
        let registry = registry(store, 7200);

        registry.admit("salt").await.unwrap();
        let admission = registry.admit("salt").await.unwrap();
        assert!(!admission.is_first_use());
    }

    #[tokio::test]
    async fn expired_record_is_rejected_and_kept() {
        let store = Arc::new(InMemorySaltStore::new());
        let created_at = Utc::now().timestamp_millis() - 7201 * 1000;
        store.insert_if_absent("old-salt", created_at).await.unwrap();

        let registry = registry(store.clone(), 7200);
        let err = registry.admit("old-salt").await.unwrap_err();
        match err {
            AttestationError::SaltExpired(record) => {
                assert_eq!(record.created_at_ms, created_at);
            }
            other => panic!("expected SaltExpired, got {other:?}"),
        }

        // The record is rejectable but not deleted; its creation time is
        // immutable.
        let record = store.find_by_token("old-salt").await.unwrap().unwrap();
        assert_eq!(record.created_at_ms, created_at);
    }

    #[tokio::test]
    async fn expiry_boundary_is_exercised_on_both_sides() {
        let store = Arc::new(InMemorySaltStore::new());
        let registry = registry(store.clone(), 7200);
        let now_ms = Utc::now().timestamp_millis();

        store
            .insert_if_absent("just-expired", now_ms - (7200 + 1) * 1000)
            .await
            .unwrap();
        store
            .insert_if_absent("still-valid", now_ms - (7200 - 1) * 1000)
            .await
            .unwrap();

        assert!(registry.admit("just-expired").await.is_err());
        assert!(registry.admit("still-valid").await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_first_use_creates_exactly_one_record() {
        let store = Arc::new(InMemorySaltStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let now_ms = Utc::now().timestamp_millis();
                store.insert_if_absent("racy-salt", now_ms).await.unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_first_use() {
                created += 1;
            }
        }
        assert_eq!(created, 1, "exactly one admission may be the first use");
    }

    #[tokio::test]
    async fn cleanup_sweeps_only_old_records() {
        let store = InMemorySaltStore::new();
        let now_ms = Utc::now().timestamp_millis();
        store.insert_if_absent("old", now_ms - 10_000).await.unwrap();
        store.insert_if_absent("new", now_ms).await.unwrap();

        let removed = store.cleanup_expired(now_ms - 5_000).await;
        assert_eq!(removed, 1);
        assert!(store.find_by_token("old").await.unwrap().is_none());
        assert!(store.find_by_token("new").await.unwrap().is_some());
    }
}
