use crate::config::LimitRule;
use std::time::{Duration, Instant};

/// Tracks the pacing state of a domain during crawling
///
/// This structure holds the per-domain information the dispatcher needs to
/// bound concurrent fetches and space out dispatch starts.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Number of fetches currently in flight for this domain
    pub in_flight: u32,

    /// Timestamp of the last dispatch to this domain
    pub last_dispatch: Option<Instant>,

    /// Spacing required after `last_dispatch` (delay plus the jitter drawn for it)
    pub current_gap: Duration,

    /// Maximum concurrent in-flight fetches
    pub parallelism: u32,

    /// Minimum spacing between dispatch starts
    pub delay: Duration,

    /// Upper bound of the random extra spacing
    pub jitter: Duration,

    /// Total dispatches granted in this run
    pub dispatch_count: u64,
}

impl DomainState {
    /// Creates a new DomainState governed by `rule`
    pub fn new(rule: LimitRule) -> Self {
        Self {
            in_flight: 0,
            last_dispatch: None,
            current_gap: Duration::ZERO,
            parallelism: rule.parallelism.max(1),
            delay: rule.delay(),
            jitter: rule.jitter(),
            dispatch_count: 0,
        }
    }

    /// Returns true if all parallelism slots are taken
    pub fn is_saturated(&self) -> bool {
        self.in_flight >= self.parallelism
    }

    /// Checks if a fetch can be dispatched to this domain
    ///
    /// Both conditions must hold:
    /// - in-flight count is below the configured parallelism
    /// - the spacing since the last dispatch has elapsed
    pub fn can_dispatch(&self, now: Instant) -> bool {
        !self.is_saturated() && self.time_until_next_dispatch(now).is_none()
    }

    /// Calculates the time until the spacing requirement is met
    ///
    /// Returns None if the spacing has already elapsed. Parallelism is not
    /// considered here.
    pub fn time_until_next_dispatch(&self, now: Instant) -> Option<Duration> {
        let last = self.last_dispatch?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.current_gap {
            Some(self.current_gap - elapsed)
        } else {
            None
        }
    }

    /// Records a granted dispatch
    ///
    /// `extra` is the jitter drawn for this dispatch; it widens the spacing
    /// the next dispatch must wait for.
    pub fn record_dispatch(&mut self, now: Instant, extra: Duration) {
        self.in_flight += 1;
        self.dispatch_count += 1;
        self.last_dispatch = Some(now);
        self.current_gap = self.delay + extra.min(self.jitter);
    }

    /// Records that an in-flight fetch has concluded
    pub fn release(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}
