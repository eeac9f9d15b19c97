//! External-facing advert operations.
//!
//! [`AdvertService`] is the request-handling side of the system: it mutates
//! the store and the job registry together so that a successfully created
//! advert is always scheduled and a deleted one never fires again. It never
//! touches a job's fire time; that belongs to the scheduler.
use thiserror::Error;

use crate::clock::Clock;
use crate::job::{AdvertId, ChatId, Job};
use crate::recurrence::{Recurrence, RecurrenceError};
use crate::registry::{JobRegistry, RegistryError};
use crate::store::{AdvertRecord, AdvertStore, NewAdvert, StoreError};

#[derive(Debug, Error)]
pub enum AdvertError {
    /// The recurrence spec did not parse; surfaced for a user-facing retry.
    #[error("invalid recurrence: {0}")]
    InvalidRecurrence(#[from] RecurrenceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub struct AdvertService<S, C> {
    store: S,
    registry: JobRegistry,
    clock: C,
}

impl<S, C> AdvertService<S, C>
where
    S: AdvertStore,
    C: Clock,
{
    pub fn new(store: S, registry: JobRegistry, clock: C) -> Self {
        Self {
            store,
            registry,
            clock,
        }
    }

    /// Persists a new advert and schedules its first occurrence.
    ///
    /// The spec string must parse as a [`Recurrence`] (e.g. `day 12:30`);
    /// nothing is persisted otherwise. Returns the identifier assigned by
    /// the store.
    pub async fn create_advert(
        &self,
        owner: &str,
        destination: ChatId,
        text: &str,
        recurrence_spec: &str,
    ) -> Result<AdvertId, AdvertError> {
        let recurrence: Recurrence = recurrence_spec.parse()?;
        let id = self
            .store
            .insert(NewAdvert {
                owner: owner.to_owned(),
                destination,
                text: text.to_owned(),
                recurrence_spec: recurrence.to_string(),
            })
            .await?;
        let next_fire_at = recurrence.next_occurrence(self.clock.now());
        self.registry
            .insert(Job::new(id, recurrence, next_fire_at, destination, text))?;
        tracing::info!("Created advert {id} for {owner}, first fire at {next_fire_at}");
        Ok(id)
    }

    /// Deletes the persisted record and unschedules the job.
    ///
    /// Fails with [`StoreError::NotFound`] if no record exists. A registry
    /// miss afterwards means a tick raced the removal and is tolerated.
    pub async fn delete_advert(&self, id: AdvertId) -> Result<(), AdvertError> {
        self.store.delete(id).await?;
        match self.registry.remove(id) {
            Ok(_) => {}
            Err(RegistryError::NotFound(_)) => {
                tracing::debug!("Advert {id} had no registered job at deletion");
            }
            Err(err) => return Err(err.into()),
        }
        tracing::info!("Deleted advert {id}");
        Ok(())
    }

    /// The persisted adverts belonging to `owner`.
    pub async fn list_adverts(&self, owner: &str) -> Result<Vec<AdvertRecord>, AdvertError> {
        Ok(self.store.list_for_owner(owner).await?)
    }

    /// Rebuilds the job registry from the store at startup.
    ///
    /// Every advert is scheduled for its first occurrence after now, which
    /// gives at-least-once delivery across restarts. A record whose stored
    /// spec no longer parses is skipped with an error log rather than
    /// failing the whole load.
    pub async fn load(&self) -> Result<usize, AdvertError> {
        let now = self.clock.now();
        let mut restored = 0;
        for record in self.store.list().await? {
            let recurrence: Recurrence = match record.recurrence_spec.parse() {
                Ok(recurrence) => recurrence,
                Err(err) => {
                    tracing::error!(
                        ?err,
                        "Skipping advert {} with unparsable recurrence {:?}",
                        record.id,
                        record.recurrence_spec
                    );
                    continue;
                }
            };
            self.registry.insert(Job::new(
                record.id,
                recurrence,
                recurrence.next_occurrence(now),
                record.destination,
                record.text,
            ))?;
            restored += 1;
        }
        Ok(restored)
    }

    /// The number of jobs currently scheduled.
    pub fn job_count(&self) -> Result<usize, AdvertError> {
        Ok(self.registry.len()?)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::InMemoryStore;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn service() -> AdvertService<InMemoryStore, ManualClock> {
        AdvertService::new(
            InMemoryStore::new(),
            JobRegistry::new(),
            ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 15, 10, 5, 0).unwrap()),
        )
    }

    #[tokio::test]
    async fn create_persists_and_schedules() {
        let service = service();
        let id = service
            .create_advert("alice", 42.into(), "spring sale", "hour :30")
            .await
            .unwrap();

        let job = service.registry().get(id).unwrap();
        assert_eq!(
            job.next_fire_at,
            Utc.with_ymd_and_hms(2024, 4, 15, 10, 30, 0).unwrap()
        );
        assert_eq!(job.destination, 42.into());

        let rows = service.list_adverts("alice").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].recurrence_spec, "hour :30");
    }

    #[tokio::test]
    async fn invalid_recurrence_persists_nothing() {
        let service = service();
        assert_matches!(
            service
                .create_advert("alice", 42.into(), "spring sale", "fortnight :30")
                .await,
            Err(AdvertError::InvalidRecurrence(_))
        );
        assert!(service.list_adverts("alice").await.unwrap().is_empty());
        assert_eq!(service.job_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_removes_record_and_job() {
        let service = service();
        let id = service
            .create_advert("alice", 42.into(), "spring sale", "minute :00")
            .await
            .unwrap();
        service.delete_advert(id).await.unwrap();
        assert_eq!(service.job_count().unwrap(), 0);
        assert!(service.list_adverts("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_not_found_and_changes_nothing() {
        let service = service();
        service
            .create_advert("alice", 42.into(), "spring sale", "hour :30")
            .await
            .unwrap();
        assert_matches!(
            service.delete_advert(99.into()).await,
            Err(AdvertError::Store(StoreError::NotFound(_)))
        );
        assert_eq!(service.job_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_registry_entry() {
        let service = service();
        let id = service
            .create_advert("alice", 42.into(), "spring sale", "hour :30")
            .await
            .unwrap();
        // A tick racing the delete could have removed the job already.
        service.registry().remove(id).unwrap();
        service.delete_advert(id).await.unwrap();
    }

    #[tokio::test]
    async fn load_rebuilds_the_registry() {
        let store = InMemoryStore::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 15, 10, 5, 0).unwrap());
        let seeder = AdvertService::new(store.clone(), JobRegistry::new(), clock.clone());
        seeder
            .create_advert("alice", 42.into(), "spring sale", "hour :30")
            .await
            .unwrap();
        seeder
            .create_advert("bob", 43.into(), "closing down", "day 09:00")
            .await
            .unwrap();

        // Fresh process: same store, empty registry.
        let service = AdvertService::new(store, JobRegistry::new(), clock);
        assert_eq!(service.load().await.unwrap(), 2);
        assert_eq!(service.job_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn load_skips_unparsable_records() {
        let store = InMemoryStore::new();
        store
            .insert(NewAdvert {
                owner: "alice".to_owned(),
                destination: 42.into(),
                text: "spring sale".to_owned(),
                recurrence_spec: "not a cadence".to_owned(),
            })
            .await
            .unwrap();
        store
            .insert(NewAdvert {
                owner: "alice".to_owned(),
                destination: 42.into(),
                text: "spring sale".to_owned(),
                recurrence_spec: "hour :30".to_owned(),
            })
            .await
            .unwrap();

        let service = AdvertService::new(
            store,
            JobRegistry::new(),
            ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 15, 10, 5, 0).unwrap()),
        );
        assert_eq!(service.load().await.unwrap(), 1);
        assert_eq!(service.job_count().unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_creates_all_appear_in_snapshot() {
        let service = std::sync::Arc::new(service());
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let service = std::sync::Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .create_advert("alice", 42.into(), &format!("advert {i}"), "minute :00")
                        .await
                })
            })
            .collect();
        let mut ids = Vec::new();
        for result in futures::future::join_all(handles).await {
            ids.push(result.unwrap().unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert_eq!(service.registry().snapshot().unwrap().len(), 20);
    }
}
