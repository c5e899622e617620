//! Janitor Task
//!
//! Background task that periodically removes expired cache entries.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

#[derive(Debug, Default)]
struct SweepCounters {
    completed: AtomicU64,
    failed: AtomicU64,
}

// == Janitor ==
/// Handle to the running sweep task.
///
/// Dropping the handle aborts the task; [`Janitor::shutdown`] stops it
/// cleanly and waits for it to finish.
#[derive(Debug)]
pub struct Janitor {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    counters: Arc<SweepCounters>,
    period: Duration,
}

impl Janitor {
    /// Spawns a task sweeping `cache` for expired entries every `period`.
    ///
    /// The first sweep happens one full period after start. The store lock is
    /// only held for the duration of each sweep. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    /// [`CacheError::InvalidConfig`] when `period` is zero.
    pub fn start(cache: Cache, period: Duration) -> Result<Self> {
        Self::spawn(period, move || cache.cleanup_expired())
    }

    /// Spawns a janitor using the configured sweep interval.
    pub fn from_config(cache: Cache, config: &CacheConfig) -> Result<Self> {
        Self::start(cache, config.cleanup_interval())
    }

    pub(crate) fn spawn<S>(period: Duration, mut sweep: S) -> Result<Self>
    where
        S: FnMut() -> usize + Send + 'static,
    {
        if period.is_zero() {
            return Err(CacheError::config("janitor interval must be positive"));
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let counters = Arc::new(SweepCounters::default());
        let task_counters = Arc::clone(&counters);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick resolves immediately
            ticker.tick().await;

            info!(interval_secs = period.as_secs_f64(), "Cache janitor started");

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        run_sweep(&mut sweep, &task_counters);
                    }
                }
            }

            info!(
                sweeps = task_counters.completed.load(Ordering::Relaxed),
                failed_sweeps = task_counters.failed.load(Ordering::Relaxed),
                "Cache janitor stopped"
            );
        });

        Ok(Self {
            shutdown_tx,
            handle: Some(handle),
            counters,
            period,
        })
    }

    /// Number of sweeps that completed.
    pub fn sweeps(&self) -> u64 {
        self.counters.completed.load(Ordering::Relaxed)
    }

    /// Number of sweeps that failed and were skipped.
    pub fn failed_sweeps(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the task to stop and waits for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Cache janitor did not stop cleanly");
            }
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Cache janitor aborted");
        }
    }
}

/// Runs one sweep, containing any panic so the next tick still happens.
fn run_sweep<S: FnMut() -> usize>(sweep: &mut S, counters: &SweepCounters) {
    match panic::catch_unwind(AssertUnwindSafe(|| sweep())) {
        Ok(removed) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            if removed > 0 {
                info!(removed, "Cache janitor removed expired entries");
            } else {
                debug!("Cache janitor found no expired entries");
            }
        }
        Err(payload) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(
                error = %panic_message(payload.as_ref()),
                "Cache sweep failed; retrying on next tick"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
