// Background task scheduler
// Optionally drives the reminder run from an in-process timer instead of an external trigger

use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::services::scheduler::ReminderScheduler;

/// Background task manager for the reminder run
pub struct BackgroundTaskManager {
    scheduler: ReminderScheduler,
    interval: Duration,
}

impl BackgroundTaskManager {
    pub fn new(scheduler: ReminderScheduler, interval: Duration) -> Self {
        Self {
            scheduler,
            interval,
        }
    }

    /// Spawn the periodic run. The first tick fires after one full interval.
    pub fn start(self) -> JoinHandle<()> {
        info!(
            "Starting in-process scheduler every {} seconds",
            self.interval.as_secs()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval() yields immediately on the first tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = self.scheduler.run_once(Utc::now()).await {
                    error!("Scheduled run failed: {}", e);
                }
            }
        })
    }
}

/// Start the timer when `interval` is non-zero (call this in main.rs)
pub fn initialize_background_tasks(
    scheduler: ReminderScheduler,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        info!("In-process scheduler disabled; runs are triggered externally");
        return None;
    }

    Some(BackgroundTaskManager::new(scheduler, interval).start())
}
