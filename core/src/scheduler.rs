//! Change coalescing
//!
//! Host re-renders arrive as bursts of hundreds of small mutations. The
//! scheduler turns a burst into a single pass: every trigger pushes the
//! deadline out to `now + quiet`, and the pass only runs once the deadline
//! is reached without another trigger.
//!
//! The deadline is kept on a monotonic clock, so wall-clock adjustments
//! cannot fire it early or hold it back.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, sleep_until};

/// Quiet period that must elapse after the last trigger.
pub const DEFAULT_QUIET: Duration = Duration::from_millis(300);

/// What asked for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The document changed somewhere in its subtree.
    Mutation,
    /// The host finished an in-app navigation.
    Navigation,
    /// The periodic safety-net tick.
    SafetyNet,
}

/// Triggers coalesced into one debounced pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Batch {
    pub mutations: u32,
    pub navigations: u32,
    pub safety_net: u32,
}

impl Batch {
    fn record(&mut self, trigger: Trigger) {
        let slot = match trigger {
            Trigger::Mutation => &mut self.mutations,
            Trigger::Navigation => &mut self.navigations,
            Trigger::SafetyNet => &mut self.safety_net,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        self.mutations
            .saturating_add(self.navigations)
            .saturating_add(self.safety_net)
    }
}

/// Trailing-edge debouncer with a single pending deadline.
#[derive(Debug)]
pub struct ChangeScheduler {
    quiet: Duration,
    deadline: Option<Instant>,
    pending: Batch,
}

impl Default for ChangeScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET)
    }
}

impl ChangeScheduler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            pending: Batch::default(),
        }
    }

    /// Record a trigger and restart the quiet period.
    pub fn schedule(&mut self, trigger: Trigger) {
        self.deadline = Some(Instant::now() + self.quiet);
        self.pending.record(trigger);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves once the current deadline is reached.
    ///
    /// Never resolves while nothing is scheduled. Safe to drop and re-create
    /// on every loop iteration, which is how `select!` uses it.
    pub async fn fired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }

    /// Clear the deadline and hand out the coalesced triggers.
    pub fn take(&mut self) -> Batch {
        self.deadline = None;
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, sleep, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_after_last_trigger() {
        let mut scheduler = ChangeScheduler::default();
        let start = Instant::now();

        for _ in 0..10 {
            scheduler.schedule(Trigger::Mutation);
            sleep(Duration::from_millis(5)).await;
        }
        let last = start + Duration::from_millis(45);

        scheduler.fired().await;
        let fired_at = Instant::now();
        let batch = scheduler.take();

        assert_eq!(batch.mutations, 10);
        assert_eq!(batch.total(), 10);
        assert_eq!(fired_at - last, Duration::from_millis(300));
        assert!(fired_at - start >= Duration::from_millis(345));
        assert!(fired_at - start < Duration::from_millis(350));
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_scheduled_never_fires() {
        let scheduler = ChangeScheduler::default();
        let result = timeout(Duration::from_secs(10), scheduler.fired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_extends_deadline() {
        let mut scheduler = ChangeScheduler::default();
        scheduler.schedule(Trigger::Navigation);
        let first = scheduler.deadline().unwrap();

        advance(Duration::from_millis(200)).await;
        scheduler.schedule(Trigger::SafetyNet);
        let second = scheduler.deadline().unwrap();
        assert_eq!(second - first, Duration::from_millis(200));

        // The original deadline passes without firing.
        let early = timeout(Duration::from_millis(150), scheduler.fired()).await;
        assert!(early.is_err());

        scheduler.fired().await;
        let batch = scheduler.take();
        assert_eq!(batch, Batch { mutations: 0, navigations: 1, safety_net: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_triggers_fire_separately() {
        let mut scheduler = ChangeScheduler::new(Duration::from_millis(300));
        let mut fires = 0;
        for _ in 0..3 {
            scheduler.schedule(Trigger::Mutation);
            scheduler.fired().await;
            scheduler.take();
            fires += 1;
            sleep(Duration::from_millis(500)).await;
        }
        assert_eq!(fires, 3);
    }
}
