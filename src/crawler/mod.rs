//! Crawler module - the concurrent crawl engine
//!
//! This module contains the core crawling logic, including:
//! - The `Transport` capability and its reqwest implementation
//! - Per-domain dispatching with parallelism, delay and jitter
//! - Outcome classification and the retry policy
//! - The worker pool and the run controller

mod controller;
mod dispatcher;
mod result;
mod retry;
mod task;
mod transport;
mod worker;

pub use controller::Controller;
pub use dispatcher::{DispatchPermit, Dispatcher};
pub use result::{CrawlResult, DropReason, DroppedTask, RunStatus, RunSummary};
pub use retry::{RetryDecision, RetryPolicy};
pub use task::{CrawlTask, FetchFailure, FetchOutcome};
pub use transport::{
    build_http_client, header_map, FetchResponse, HttpTransport, RoundRobin, Transport,
    TransportError,
};
