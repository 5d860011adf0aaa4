use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Whether an entity exactly `lookback` old is still inside the window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LookbackBoundary {
    #[default]
    Inclusive,
    Exclusive,
}

/// Rejects entities whose update time is older than `now - window`.
/// Without a window every entity passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookbackPolicy {
    window: Option<Duration>,
    boundary: LookbackBoundary,
}

impl LookbackPolicy {
    pub fn new(window: Option<Duration>, boundary: LookbackBoundary) -> Self {
        Self { window, boundary }
    }

    pub fn window(&self) -> Option<Duration> {
        self.window
    }

    pub fn admit(&self, update_time: i64, now: i64) -> bool {
        let Some(window) = self.window else {
            return true;
        };
        // Entities from the future (clock skew) are always inside the window.
        let age = now.saturating_sub(update_time);
        if age <= 0 {
            return true;
        }
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        match self.boundary {
            LookbackBoundary::Inclusive => age <= window_ms,
            LookbackBoundary::Exclusive => age < window_ms,
        }
    }
}

/// Inclusive-boundary lookback check.
pub fn admit(update_time: i64, now: i64, lookback: Option<Duration>) -> bool {
    LookbackPolicy::new(lookback, LookbackBoundary::Inclusive).admit(update_time, now)
}
