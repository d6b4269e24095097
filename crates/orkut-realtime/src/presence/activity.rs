//! Local activity clock and the activity heuristic.

use std::time::Duration;

use tokio::time::Instant;

use orkut_core::config::PresenceConfig;

use super::record::Activity;

/// Input that counts as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Pointer,
    Keyboard,
    Scroll,
    Touch,
}

/// Page visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Last-input instant plus the thresholds used to classify it.
#[derive(Debug, Clone)]
pub struct ActivityClock {
    last_activity: Instant,
    away_after: Duration,
    long_away_after: Duration,
}

impl ActivityClock {
    /// Starts the clock now.
    pub fn new(config: &PresenceConfig) -> Self {
        Self {
            last_activity: Instant::now(),
            away_after: Duration::from_secs(config.away_after_seconds),
            long_away_after: Duration::from_secs(config.long_away_after_seconds),
        }
    }

    /// Records input at the current instant.
    pub fn record(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the last input.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Classifies the idle time. Both idle bands currently map to `Away`.
    #[allow(clippy::if_same_then_else)]
    pub fn current(&self) -> Activity {
        let idle = self.idle_for();
        if idle < self.away_after {
            Activity::Active
        } else if idle < self.long_away_after {
            Activity::Away
        } else {
            Activity::Away
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_thresholds() {
        let mut clock = ActivityClock::new(&PresenceConfig::default());
        assert_eq!(clock.current(), Activity::Active);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(clock.current(), Activity::Active);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(clock.current(), Activity::Away);

        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(clock.current(), Activity::Away);

        clock.record();
        assert_eq!(clock.current(), Activity::Active);
    }
}
