// Customer policy settings: anti-flood limits and scheduler cadence

use serde::{Deserialize, Serialize};

use crate::services::preferences::AntiFloodPolicy;
use crate::services::scheduler::DEFAULT_NUDGE_INTERVAL_HOURS;

/// Limits applied to preference changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AntiFloodSettings {
    /// Minimum seconds between two preference changes
    pub cooldown_seconds: u64,

    /// Maximum preference changes per UTC day
    pub daily_limit: u32,
}

impl Default for AntiFloodSettings {
    fn default() -> Self {
        Self {
            cooldown_seconds: 60,
            daily_limit: 20,
        }
    }
}

impl AntiFloodSettings {
    pub fn policy(&self) -> AntiFloodPolicy {
        AntiFloodPolicy::new(
            chrono::Duration::seconds(self.cooldown_seconds as i64),
            self.daily_limit,
        )
    }
}

/// Scheduler cadence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerSettings {
    /// Minimum hours between two onboarding nudges to the same customer
    pub nudge_interval_hours: i64,

    /// In-process run interval; 0 leaves triggering to an external cron
    pub interval_seconds: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            nudge_interval_hours: DEFAULT_NUDGE_INTERVAL_HOURS,
            interval_seconds: 0,
        }
    }
}

impl SchedulerSettings {
    pub fn nudge_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.nudge_interval_hours)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_seconds)
    }
}
