//! The process-wide collection of scheduled jobs.
//!
//! The registry is the sole shared-mutable boundary between the scheduler
//! loop and request-handling tasks. Every operation takes the lock for its
//! own critical section only; in particular [`JobRegistry::snapshot`] copies
//! the jobs out so a tick can invoke slow deliveries without holding the
//! lock against concurrent inserts and removals.
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::job::{AdvertId, Job};

/// A concurrency-safe map from advert identifier to [`Job`].
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<BTreeMap<AdvertId, Job>>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a job for advert {0} is already registered")]
    DuplicateId(AdvertId),
    #[error("no job registered for advert {0}")]
    NotFound(AdvertId),
    #[error("registry in bad state")]
    BadState,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job, failing with [`RegistryError::DuplicateId`] if a job with
    /// the same id is already registered.
    pub fn insert(&self, job: Job) -> Result<(), RegistryError> {
        let mut jobs = self.jobs.write().map_err(|_| RegistryError::BadState)?;
        if jobs.contains_key(&job.id) {
            return Err(RegistryError::DuplicateId(job.id));
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    /// Removes and returns the job for `id`.
    ///
    /// Removal is not idempotent: a second call for the same id fails with
    /// [`RegistryError::NotFound`].
    pub fn remove(&self, id: AdvertId) -> Result<Job, RegistryError> {
        self.jobs
            .write()
            .map_err(|_| RegistryError::BadState)?
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))
    }

    pub fn get(&self, id: AdvertId) -> Result<Job, RegistryError> {
        self.jobs
            .read()
            .map_err(|_| RegistryError::BadState)?
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// A point-in-time copy of all jobs in ascending id order.
    ///
    /// Safe to iterate while other operations proceed; the iteration order
    /// is the tie-break for jobs due at the same instant.
    pub fn snapshot(&self) -> Result<Vec<Job>, RegistryError> {
        Ok(self
            .jobs
            .read()
            .map_err(|_| RegistryError::BadState)?
            .values()
            .cloned()
            .collect())
    }

    /// Advances a job's fire time after it was fired.
    ///
    /// Only the scheduler calls this; a [`RegistryError::NotFound`] here
    /// means the job was deleted between the tick's snapshot and its
    /// write-back, which the caller tolerates.
    pub(crate) fn reschedule(
        &self,
        id: AdvertId,
        next_fire_at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        self.jobs
            .write()
            .map_err(|_| RegistryError::BadState)?
            .get_mut(&id)
            .map(|job| job.next_fire_at = next_fire_at)
            .ok_or(RegistryError::NotFound(id))
    }

    /// The number of currently registered jobs.
    pub fn len(&self) -> Result<usize, RegistryError> {
        Ok(self.jobs.read().map_err(|_| RegistryError::BadState)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.len()? == 0)
    }
}
