//! The tick pass over the job registry.
use chrono::{DateTime, Utc};

use crate::delivery::Delivery;
use crate::registry::{JobRegistry, RegistryError};

pub(crate) mod runner;

pub use runner::SchedulerLoop;

/// Evaluates which jobs are due and fires them.
///
/// A tick works on a snapshot, so the registry lock is never held across a
/// delivery call and request-handling tasks can insert and remove jobs while
/// deliveries are in flight.
pub struct Scheduler<D> {
    registry: JobRegistry,
    delivery: D,
}

impl<D> Scheduler<D>
where
    D: Delivery,
{
    pub fn new(registry: JobRegistry, delivery: D) -> Self {
        Self { registry, delivery }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Fires every job due at `now` and advances it past `now`.
    ///
    /// Delivery failures are reported and do not prevent rescheduling: the
    /// job's next occurrence gets a fresh attempt rather than this one being
    /// retried. Occurrences missed while no tick ran are skipped, so a stale
    /// job fires once, not once per missed occurrence. Calling `tick` twice
    /// with the same `now` fires each due job exactly once in total, since
    /// the first call already advanced the fire times past `now`.
    ///
    /// Returns the number of jobs fired.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize, RegistryError> {
        let snapshot = self.registry.snapshot()?;
        let mut fired = 0;
        for job in snapshot.into_iter().filter(|job| job.is_due(now)) {
            if let Err(err) = self.delivery.send(job.destination, &job.text).await {
                tracing::error!(?err, advert_id = %job.id, "Failed to deliver advert {}: {err}", job.id);
            }
            fired += 1;
            let next_fire_at = job.recurrence.next_occurrence(now);
            match self.registry.reschedule(job.id, next_fire_at) {
                Ok(()) => {}
                // Deleted between snapshot and write-back.
                Err(RegistryError::NotFound(id)) => {
                    tracing::debug!("Advert {id} was deleted mid-tick, not rescheduling");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(fired)
    }
}
