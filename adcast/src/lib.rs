//! A scheduler for recurring chat broadcasts.
//!
//! Users register adverts (a destination chat, a text, and a day/hour/minute
//! cadence) which are persisted through an [`store::AdvertStore`] and
//! re-fired by a background scheduler loop through a [`delivery::Delivery`]
//! transport. The [`Adcast`] builder wires the pieces together; the
//! individual modules can also be composed by hand.
//!
//! ```no_run
//! # use adcast::prelude::*;
//! # use adcast::store::InMemoryStore;
//! # use adcast::testing::CapturingDelivery;
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let handle = Adcast::new(InMemoryStore::new(), CapturingDelivery::new(), SystemClock)
//!     .start()
//!     .await
//!     .unwrap();
//!
//! let service = handle.service();
//! let id = service
//!     .create_advert("alice", 42.into(), "spring sale", "hour :30")
//!     .await
//!     .unwrap();
//!
//! service.delete_advert(id).await.unwrap();
//! handle.graceful_shutdown().await.unwrap();
//! # });
//! ```
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod advert;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod job;
pub mod prelude;
pub mod recurrence;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod testing;

use advert::{AdvertError, AdvertService};
use clock::Clock;
use delivery::Delivery;
use registry::JobRegistry;
use scheduler::{Scheduler, SchedulerLoop};
use store::AdvertStore;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Wires the store, delivery transport, and clock into a running system.
pub struct Adcast<S, D, C> {
    store: S,
    delivery: D,
    clock: C,
    poll_interval: Duration,
}

impl<S, D, C> Adcast<S, D, C>
where
    S: AdvertStore + 'static,
    D: Delivery + 'static,
    C: Clock + Clone + 'static,
{
    pub fn new(store: S, delivery: D, clock: C) -> Self {
        Self {
            store,
            delivery,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    /// Rebuilds the job registry from the store, then spawns the scheduler
    /// loop on its own task.
    pub async fn start(self) -> Result<AdcastHandle<S, C>, AdcastError> {
        let registry = JobRegistry::new();
        let service = Arc::new(AdvertService::new(
            self.store,
            registry.clone(),
            self.clock.clone(),
        ));
        let restored = service.load().await?;
        tracing::info!("Restored {restored} scheduled adverts from the store");

        let cancellation_token = CancellationToken::new();
        let handle = SchedulerLoop::new(
            Scheduler::new(registry, self.delivery),
            self.clock,
            self.poll_interval,
        )
        .spawn(cancellation_token.clone());

        Ok(AdcastHandle {
            service,
            cancellation_token,
            handle: Some(handle),
        })
    }
}

/// A running system: the advert service plus the scheduler loop's handle.
pub struct AdcastHandle<S, C> {
    service: Arc<AdvertService<S, C>>,
    cancellation_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl<S, C> AdcastHandle<S, C>
where
    S: AdvertStore,
    C: Clock,
{
    pub fn service(&self) -> Arc<AdvertService<S, C>> {
        Arc::clone(&self.service)
    }

    /// Signals the loop to stop, letting any in-progress tick finish.
    pub async fn graceful_shutdown(mut self) -> Result<(), AdcastError> {
        tracing::debug!("Shutting down the adcast scheduler");
        self.cancellation_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|_| AdcastError::GracefulShutdownFailed)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AdcastError {
    #[error("Failed to gracefully shut down")]
    GracefulShutdownFailed,
    #[error(transparent)]
    Advert(#[from] AdvertError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{InMemoryStore, NewAdvert};
    use crate::testing::CapturingDelivery;
    use chrono::{TimeDelta, TimeZone, Utc};

    #[tokio::test]
    async fn start_and_shutdown() {
        let handle = Adcast::new(
            InMemoryStore::new(),
            CapturingDelivery::new(),
            ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 15, 10, 5, 0).unwrap()),
        )
        .start()
        .await
        .unwrap();
        handle.graceful_shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn restart_restores_persisted_adverts() {
        let store = InMemoryStore::new();
        store
            .insert(NewAdvert {
                owner: "alice".to_owned(),
                destination: 42.into(),
                text: "spring sale".to_owned(),
                recurrence_spec: "minute :00".to_owned(),
            })
            .await
            .unwrap();

        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 15, 10, 5, 30).unwrap());
        let delivery = CapturingDelivery::new();
        let handle = Adcast::new(store, delivery.clone(), clock.clone())
            .with_poll_interval(Duration::from_millis(5))
            .start()
            .await
            .unwrap();
        assert_eq!(handle.service().job_count().unwrap(), 1);

        clock.advance(TimeDelta::minutes(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(delivery.sent(), vec![(42.into(), "spring sale".to_owned())]);

        handle.graceful_shutdown().await.unwrap();
    }
}
