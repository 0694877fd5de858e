/// Task state definitions for tracking a crawl task through its retries
use std::fmt;

/// Represents the current state of a task in the crawl process
///
/// ```text
/// Pending -> InFlight -> Done
///                     -> Dropped
///                     -> Retrying -> InFlight
///                                 -> Dropped
/// Pending -> Dropped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task is queued in the frontier
    Pending,

    /// Task holds a dispatch permit and is being fetched
    InFlight,

    /// Task failed transiently and is waiting out its backoff
    Retrying,

    // ===== Terminal States =====
    /// Task was fetched and handed to the extractor
    Done,

    /// Task was given up (fatal failure, retries exhausted, budget, or cancellation)
    Dropped,
}

impl TaskState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Dropped)
    }

    /// Returns true if moving from this state to `next` is a legal step
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::Pending, Self::Dropped)
                | (Self::InFlight, Self::Done)
                | (Self::InFlight, Self::Retrying)
                | (Self::InFlight, Self::Dropped)
                | (Self::Retrying, Self::InFlight)
                | (Self::Retrying, Self::Dropped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Retrying => "retrying",
            Self::Done => "done",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
