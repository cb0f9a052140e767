//! Coalescing bursts of keystrokes into one downstream lookup.
//!
//! The debouncer holds at most one [`PendingQuery`]. Every `submit` replaces
//! it, so a superseded query can never fire. Nothing is spawned: the owner
//! awaits [`QueryDebouncer::fired`] inside its event loop, which makes the
//! debouncer usable on a single cooperative task.
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::debug;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Time without new input before the latest query fires.
    pub quiet_period: Duration,
    /// Queries shorter than this (in characters, after trimming) are not
    /// scheduled. `0` disables the check.
    pub min_query_len: usize,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
        }
    }
}

/// The query waiting for its quiet period to elapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    text: String,
    scheduled_at: Instant,
    due_at: Instant,
}

impl PendingQuery {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn scheduled_at(&self) -> Instant {
        self.scheduled_at
    }

    pub const fn due_at(&self) -> Instant {
        self.due_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A lookup will fire at `due_at` unless superseded first.
    Scheduled { due_at: Instant },
    /// Below the minimum length: nothing scheduled, displayed results should go.
    TooShort,
    /// The input was cleared.
    Empty,
}

#[derive(Debug)]
pub struct QueryDebouncer {
    config: DebounceConfig,
    pending: Option<PendingQuery>,
    superseded: u64,
    fired: u64,
}

impl QueryDebouncer {
    pub const fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            pending: None,
            superseded: 0,
            fired: 0,
        }
    }

    pub const fn config(&self) -> DebounceConfig {
        self.config
    }

    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        self.submit_at(text, Instant::now())
    }

    /// Record `text` as the latest input at `now`, superseding any pending query.
    pub fn submit_at(&mut self, text: &str, now: Instant) -> SubmitOutcome {
        if let Some(previous) = self.pending.take() {
            self.superseded += 1;
            debug!(superseded = %previous.text, "Pending query superseded");
        }

        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }
        let min = self.config.min_query_len;
        if min > 0 && text.chars().count() < min {
            debug!(text, min_query_len = min, "Query below minimum length");
            return SubmitOutcome::TooShort;
        }

        let due_at = now + self.config.quiet_period;
        self.pending = Some(PendingQuery {
            text: text.to_string(),
            scheduled_at: now,
            due_at,
        });
        SubmitOutcome::Scheduled { due_at }
    }

    /// Drop the pending query, if any.
    pub fn cancel(&mut self) -> Option<PendingQuery> {
        self.pending.take()
    }

    pub const fn pending(&self) -> Option<&PendingQuery> {
        self.pending.as_ref()
    }

    /// Take the pending query text if its quiet period has elapsed by `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        if self.pending.as_ref().is_some_and(|p| p.due_at <= now) {
            self.fired += 1;
            return self.pending.take().map(|p| p.text);
        }
        None
    }

    /// Resolve with the query text once the pending query's quiet period
    /// elapses. Never resolves while nothing is pending.
    ///
    /// Cancel safe: dropping the future before it resolves leaves the
    /// pending query untouched.
    pub async fn fired(&mut self) -> String {
        loop {
            let Some(due_at) = self.pending.as_ref().map(PendingQuery::due_at) else {
                return std::future::pending().await;
            };
            sleep_until(due_at).await;
            if let Some(text) = self.take_due(Instant::now()) {
                debug!(text = %text, "Debounced query fired");
                return text;
            }
        }
    }

    pub const fn superseded_count(&self) -> u64 {
        self.superseded
    }

    pub const fn fired_count(&self) -> u64 {
        self.fired
    }
}

impl Default for QueryDebouncer {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}
