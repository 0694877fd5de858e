use super::transport::{FetchResponse, TransportError};
use crate::extract::ExtractError;
use crate::state::TaskState;
use crate::GleanError;
use std::fmt;
use url::Url;

/// One unit of crawl work
///
/// The URL, depth and domain are fixed when the task is admitted. Only the
/// attempt counter and lifecycle state change as the task moves through
/// retries.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    url: Url,
    depth: u32,
    domain: String,
    attempt: u32,
    state: TaskState,
}

impl CrawlTask {
    pub fn new(url: Url, depth: u32, domain: String) -> Self {
        Self {
            url,
            depth,
            domain,
            attempt: 1,
            state: TaskState::Pending,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 1-based number of the attempt this task is on
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Returns true before the task's first dispatch
    pub fn is_first_attempt(&self) -> bool {
        self.attempt == 1
    }

    /// Moves the task to `next`, rejecting illegal lifecycle steps
    pub fn transition_to(&mut self, next: TaskState) -> Result<(), GleanError> {
        if !self.state.can_transition_to(next) {
            return Err(GleanError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Returns the task for its next attempt after a backoff
    pub fn next_attempt(mut self) -> Self {
        self.attempt += 1;
        self
    }
}

/// Why a fetch did not succeed
#[derive(Debug)]
pub enum FetchFailure {
    /// The server answered with a non-2xx status
    Status(u16),

    /// No status was received
    Transport(TransportError),

    /// The body could not be extracted
    Extract(ExtractError),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "HTTP {}", status),
            Self::Transport(err) => write!(f, "{}", err),
            Self::Extract(err) => write!(f, "{}", err),
        }
    }
}

/// Classified result of one fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    Success {
        status: u16,
        final_url: Url,
        body: Vec<u8>,
    },
    TransientFailure(FetchFailure),
    FatalFailure(FetchFailure),
}

impl FetchOutcome {
    /// Classifies a transport result
    ///
    /// | Result | Outcome |
    /// |--------|---------|
    /// | 2xx | Success |
    /// | 429, 503 | TransientFailure |
    /// | other status | FatalFailure |
    /// | timeout, connect or network error | TransientFailure |
    /// | request could not be built | FatalFailure |
    pub fn classify(result: Result<FetchResponse, TransportError>) -> Self {
        match result {
            Ok(FetchResponse {
                status,
                final_url,
                body,
            }) if (200..300).contains(&status) => Self::Success {
                status,
                final_url,
                body,
            },
            Ok(FetchResponse {
                status: status @ (429 | 503),
                ..
            }) => Self::TransientFailure(FetchFailure::Status(status)),
            Ok(FetchResponse { status, .. }) => Self::FatalFailure(FetchFailure::Status(status)),
            Err(err) if err.is_transient() => Self::TransientFailure(FetchFailure::Transport(err)),
            Err(err) => Self::FatalFailure(FetchFailure::Transport(err)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
