//! Per-domain dispatcher
//!
//! This module handles:
//! - Bounding concurrent in-flight fetches per pacing lane
//! - Spacing dispatch starts in a lane by its delay plus random jitter
//! - Releasing slots when a fetch attempt concludes, on every exit path
//!
//! A lane is a domain, or a domain plus a path pattern when a `[[limits.path]]`
//! rule matches the URL. Detail pages can so be paced apart from listings on
//! the same host.

use crate::config::{LimitRule, LimitsConfig};
use crate::state::DomainState;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Gatekeeper for fetches, keyed by pacing lane
///
/// Lane states are created on first use from the matching limit rule.
/// The lock guarding them is never held across an await.
#[derive(Debug)]
pub struct Dispatcher {
    limits: LimitsConfig,
    lanes: Mutex<HashMap<String, DomainState>>,
    released: Notify,
}

/// A granted dispatch slot
///
/// Dropping the permit releases the slot, so a slot is returned exactly once
/// whether the fetch succeeded, failed or was abandoned.
#[derive(Debug)]
pub struct DispatchPermit {
    dispatcher: Arc<Dispatcher>,
    lane: String,
}

impl DispatchPermit {
    pub fn lane(&self) -> &str {
        &self.lane
    }
}

impl Drop for DispatchPermit {
    fn drop(&mut self) {
        self.dispatcher.release(&self.lane);
    }
}

/// Result of one attempt to take a slot
enum Admission {
    Granted,
    /// Spacing not yet elapsed
    Wait(Duration),
    /// All slots taken
    Saturated,
}

impl Dispatcher {
    pub fn new(limits: LimitsConfig) -> Arc<Self> {
        Arc::new(Self {
            limits,
            lanes: Mutex::new(HashMap::new()),
            released: Notify::new(),
        })
    }

    /// Waits until `domain` can accept a fetch and takes a slot
    ///
    /// The caller is suspended, not spinning, until the domain has a free
    /// slot and its spacing has elapsed. On grant the in-flight count and
    /// last-dispatch time are updated in the same critical section.
    ///
    /// # Returns
    ///
    /// * `Some(DispatchPermit)` - Slot granted
    /// * `None` - `cancel` fired while waiting
    pub async fn admit(
        self: &Arc<Self>,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Option<DispatchPermit> {
        let rule = self.limits.rule_for(domain);
        self.admit_lane(domain.to_string(), rule, cancel).await
    }

    /// Like `admit`, but paces `url` in its path lane when one matches
    pub async fn admit_url(
        self: &Arc<Self>,
        domain: &str,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Option<DispatchPermit> {
        let (lane, rule) = self.limits.lane_for(domain, url.path());
        self.admit_lane(lane, rule, cancel).await
    }

    async fn admit_lane(
        self: &Arc<Self>,
        lane: String,
        rule: LimitRule,
        cancel: &CancellationToken,
    ) -> Option<DispatchPermit> {
        loop {
            // Register for release wakeups before inspecting state so a
            // release between the check and the wait is not missed.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            match self.try_admit(&lane, rule) {
                Admission::Granted => {
                    return Some(DispatchPermit {
                        dispatcher: Arc::clone(self),
                        lane,
                    });
                }
                Admission::Wait(wait) => {
                    tracing::trace!("Lane {} spacing, waiting {:?}", lane, wait);
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                Admission::Saturated => {
                    tracing::trace!("Lane {} saturated, waiting for release", lane);
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = released => {}
                    }
                }
            }
        }
    }

    fn try_admit(&self, lane: &str, rule: LimitRule) -> Admission {
        let mut lanes = self.lanes.lock();
        let state = lanes
            .entry(lane.to_string())
            .or_insert_with(|| DomainState::new(rule));

        let now = Instant::now();
        if !state.can_dispatch(now) {
            if state.is_saturated() {
                return Admission::Saturated;
            }
            return Admission::Wait(state.time_until_next_dispatch(now).unwrap_or_default());
        }

        let extra = sample_jitter(state.jitter);
        state.record_dispatch(now, extra);
        Admission::Granted
    }

    fn release(&self, lane: &str) {
        if let Some(state) = self.lanes.lock().get_mut(lane) {
            state.release();
        }
        self.released.notify_waiters();
    }

    /// Returns the number of in-flight fetches in `lane`
    pub fn in_flight(&self, lane: &str) -> u32 {
        self.lanes
            .lock()
            .get(lane)
            .map(|state| state.in_flight)
            .unwrap_or(0)
    }

    /// Returns the number of in-flight fetches across all lanes
    pub fn total_in_flight(&self) -> u32 {
        self.lanes.lock().values().map(|state| state.in_flight).sum()
    }

    /// Returns the number of dispatches granted in `lane`
    pub fn dispatch_count(&self, lane: &str) -> u64 {
        self.lanes
            .lock()
            .get(lane)
            .map(|state| state.dispatch_count)
            .unwrap_or(0)
    }
}

/// Draws the extra spacing for one dispatch, uniform in `[0, max]`
fn sample_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let millis = max.as_millis().min(u64::MAX as u128) as u64;
    Duration::from_millis(rand::rng().random_range(0..=millis))
}
