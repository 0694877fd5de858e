//! State module for tracking crawl progress
//!
//! This module provides the shared state of a crawl run.
//!
//! # Components
//!
//! - `VisitedSet`: first-claim deduplication of normalized URLs
//! - `DomainState`: per-domain in-flight count and dispatch spacing
//! - `CrawlBudget`: page-count and depth limits
//! - `TaskState`: lifecycle of a single crawl task through its retries

mod budget;
mod domain_state;
mod task_state;
mod visited;

// Re-export main types
pub use budget::CrawlBudget;
pub use domain_state::DomainState;
pub use task_state::TaskState;
pub use visited::VisitedSet;
