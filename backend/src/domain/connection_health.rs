//! Store health flag with a periodic background probe.
//!
//! The flag starts healthy. Adapters flip it to unhealthy once they give up
//! retrying, and the HTTP layer then fails requests fast. Only a successful
//! probe flips it back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::ports::StoreHealthProbe;

/// Tracks whether the record store is reachable.
pub struct ConnectionHealthMonitor {
    probe: Arc<dyn StoreHealthProbe>,
    interval: Duration,
    healthy: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionHealthMonitor {
    /// Create a monitor that probes every `interval` once started.
    pub fn new(probe: Arc<dyn StoreHealthProbe>, interval: Duration) -> Self {
        Self {
            probe,
            interval,
            healthy: AtomicBool::new(true),
            task: Mutex::new(None),
        }
    }

    /// Current state of the flag.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Record that the store stopped answering.
    pub fn mark_unhealthy(&self, reason: &str) {
        if self.healthy.swap(false, Ordering::AcqRel) {
            warn!(reason, "record store marked unhealthy");
        }
    }

    /// Record that the store answers again.
    pub fn mark_healthy(&self) {
        if !self.healthy.swap(true, Ordering::AcqRel) {
            info!("record store healthy again");
        }
    }

    /// Probe once and update the flag; returns the new state.
    pub async fn check_now(&self) -> bool {
        match self.probe.ping().await {
            Ok(()) => {
                debug!("record store probe succeeded");
                self.mark_healthy();
            }
            Err(error) => self.mark_unhealthy(&error.to_string()),
        }
        self.is_healthy()
    }

    /// Spawn the periodic probe. Calling it while the probe runs is a no-op.
    ///
    /// The task holds only a weak reference and ends once the monitor is
    /// dropped.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let monitor = Arc::downgrade(self);
        let period = self.interval;
        *task = Some(tokio::spawn(probe_loop(monitor, period)));
        info!(interval_secs = period.as_secs(), "store health monitor started");
    }

    /// Abort the periodic probe if it runs.
    pub fn stop(&self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
            info!("store health monitor stopped");
        }
    }

    /// Whether the periodic probe is active.
    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConnectionHealthMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
        }
    }
}

async fn probe_loop(monitor: Weak<ConnectionHealthMonitor>, period: Duration) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        let Some(monitor) = monitor.upgrade() else {
            break;
        };
        monitor.check_now().await;
    }
}
