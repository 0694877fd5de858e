use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Frontier drained with nothing in flight or in backoff
    Completed,

    /// Cancellation was requested; the result is partial
    Cancelled,
}

impl RunStatus {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Why a task was given up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Non-retryable status, request error or extraction error
    Fatal,

    /// Every allowed attempt failed transiently
    RetriesExhausted,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => f.write_str("fatal"),
            Self::RetriesExhausted => f.write_str("retries exhausted"),
        }
    }
}

/// A task that was given up, with the last error it saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedTask {
    pub url: String,
    pub depth: u32,
    pub attempts: u32,
    pub reason: DropReason,
    pub error: String,
}

/// Counters describing a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Fetch attempts made, retries included
    pub fetch_attempts: u64,

    /// Pages fetched and handed to the extractor
    pub pages_succeeded: u64,

    pub records_extracted: u64,

    /// Retries scheduled after transient failures
    pub retries_scheduled: u64,

    pub fatal_failures: u64,

    pub retries_exhausted: u64,

    /// Tasks skipped because the page budget ran out before their dispatch
    pub budget_skipped: u64,

    /// Tasks still queued or in backoff when the run was cancelled
    pub abandoned: u64,

    pub elapsed: Duration,

    pub dropped: Vec<DroppedTask>,
}

impl RunSummary {
    /// Returns the number of tasks that were lost to failures
    pub fn failures(&self) -> u64 {
        self.fatal_failures + self.retries_exhausted
    }
}

/// Outcome of one crawl run
///
/// Records are in completion order, which need not match discovery order.
/// `links_discovered` lists every URL admitted from a page, in admission
/// order; start URLs are not included.
#[derive(Debug, Clone)]
pub struct CrawlResult<R> {
    pub records: Vec<R>,
    pub links_discovered: Vec<String>,
    pub pages_visited: u32,
    pub status: RunStatus,
    pub summary: RunSummary,
}

impl<R> CrawlResult<R> {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
