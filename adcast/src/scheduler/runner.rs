//! The polling loop driving [`Scheduler::tick`] on its own task.
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::delivery::Delivery;
use crate::scheduler::Scheduler;

/// Drives the scheduler on a fixed polling cadence, independent of
/// request-handling tasks.
///
/// The poll interval bounds how late a fire can be relative to its due time;
/// shorter intervals trade resource use for latency. Cancellation lets an
/// in-progress tick finish, so a job either fully fires-and-reschedules or
/// is untouched.
pub struct SchedulerLoop<D, C> {
    scheduler: Scheduler<D>,
    clock: C,
    poll_interval: Duration,
}

impl<D, C> SchedulerLoop<D, C>
where
    D: Delivery + 'static,
    C: Clock + 'static,
{
    pub fn new(scheduler: Scheduler<D>, clock: C, poll_interval: Duration) -> Self {
        Self {
            scheduler,
            clock,
            poll_interval,
        }
    }

    pub fn spawn(self, cancellation_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.scheduler.tick(self.clock.now()).await {
                    Ok(fired) if fired > 0 => {
                        tracing::debug!("Scheduler tick fired {fired} adverts");
                    }
                    Ok(_) => {}
                    // A tick error never terminates the loop.
                    Err(err) => {
                        tracing::error!(?err, "Scheduler tick failed: {err}");
                    }
                }
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = cancellation_token.cancelled() => {
                        tracing::debug!("Shutting down the advert scheduler loop");
                        break;
                    }
                }
            }
        })
    }
}
