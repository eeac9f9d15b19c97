//! The persistence collaborator contract and an in-memory implementation.
//!
//! The core treats advert storage as an external interface: it inserts a
//! record to obtain an identifier, deletes by identifier, and lists
//! everything at startup to rebuild the registry. Schema management and the
//! concrete database live outside this crate.
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc, RwLock,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::{AdvertId, ChatId};

/// A persisted advert row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvertRecord {
    pub id: AdvertId,
    pub owner: String,
    pub destination: ChatId,
    pub text: String,
    pub recurrence_spec: String,
}

/// An advert that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAdvert {
    pub owner: String,
    pub destination: ChatId,
    pub text: String,
    pub recurrence_spec: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no advert with id {0}")]
    NotFound(AdvertId),
    #[error("store in bad state")]
    BadState,
    #[error("store backend failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait AdvertStore: Send + Sync {
    /// Persists the advert and returns its assigned identifier.
    async fn insert(&self, advert: NewAdvert) -> Result<AdvertId, StoreError>;

    /// Deletes the record, failing with [`StoreError::NotFound`] if absent.
    async fn delete(&self, id: AdvertId) -> Result<(), StoreError>;

    /// All persisted adverts; used at startup to rebuild the job registry.
    async fn list(&self) -> Result<Vec<AdvertRecord>, StoreError>;

    /// The adverts belonging to one owner login.
    async fn list_for_owner(&self, owner: &str) -> Result<Vec<AdvertRecord>, StoreError>;
}

/// An in-memory [`AdvertStore`].
///
/// A correct (but not optimized) implementation for tests and demos, not
/// designed for production use. Identifiers are assigned from a process-wide
/// counter and never reused.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    rows: Arc<RwLock<Vec<AdvertRecord>>>,
    id_counter: Arc<AtomicI64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdvertStore for InMemoryStore {
    async fn insert(&self, advert: NewAdvert) -> Result<AdvertId, StoreError> {
        let id: AdvertId = (self.id_counter.fetch_add(1, Ordering::SeqCst) + 1).into();
        self.rows
            .write()
            .map_err(|_| StoreError::BadState)?
            .push(AdvertRecord {
                id,
                owner: advert.owner,
                destination: advert.destination,
                text: advert.text,
                recurrence_spec: advert.recurrence_spec,
            });
        Ok(id)
    }

    async fn delete(&self, id: AdvertId) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::BadState)?;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        if rows.len() == before {
            Err(StoreError::NotFound(id))
        } else {
            Ok(())
        }
    }

    async fn list(&self) -> Result<Vec<AdvertRecord>, StoreError> {
        Ok(self.rows.read().map_err(|_| StoreError::BadState)?.clone())
    }

    async fn list_for_owner(&self, owner: &str) -> Result<Vec<AdvertRecord>, StoreError> {
        Ok(self
            .rows
            .read()
            .map_err(|_| StoreError::BadState)?
            .iter()
            .filter(|row| row.owner == owner)
            .cloned()
            .collect())
    }
}
