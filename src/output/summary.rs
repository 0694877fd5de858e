//! Run summary reporting
//!
//! Renders the counters of a finished run for the terminal.

use crate::crawler::{CrawlResult, RunStatus};
use std::fmt::Write;

/// Maximum dropped tasks listed individually
const MAX_DROPPED_LISTED: usize = 20;

/// Formats the summary of a finished run
pub fn format_summary<R>(result: &CrawlResult<R>) -> String {
    let summary = &result.summary;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Crawl Summary ===\n");

    let _ = writeln!(out, "Overview:");
    let status = match result.status {
        RunStatus::Completed => "completed",
        RunStatus::Cancelled => "cancelled (partial result)",
    };
    let _ = writeln!(out, "  Status: {}", status);
    let _ = writeln!(out, "  Pages visited: {}", result.pages_visited);
    let _ = writeln!(out, "  Pages succeeded: {}", summary.pages_succeeded);
    let _ = writeln!(out, "  Records extracted: {}", summary.records_extracted);
    let _ = writeln!(out, "  Links discovered: {}", result.links_discovered.len());
    let _ = writeln!(out, "  Elapsed: {:.2}s", summary.elapsed.as_secs_f64());
    let _ = writeln!(out);

    let _ = writeln!(out, "Fetching:");
    let _ = writeln!(out, "  Fetch attempts: {}", summary.fetch_attempts);
    let _ = writeln!(out, "  Retries scheduled: {}", summary.retries_scheduled);
    let _ = writeln!(out, "  Fatal failures: {}", summary.fatal_failures);
    let _ = writeln!(out, "  Retries exhausted: {}", summary.retries_exhausted);
    let _ = writeln!(out, "  Skipped (budget): {}", summary.budget_skipped);
    if summary.abandoned > 0 {
        let _ = writeln!(out, "  Abandoned: {}", summary.abandoned);
    }

    if !summary.dropped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Dropped Pages ({}):", summary.dropped.len());
        for dropped in summary.dropped.iter().take(MAX_DROPPED_LISTED) {
            let _ = writeln!(
                out,
                "  - {} [{}, {} attempt(s)]: {}",
                dropped.url, dropped.reason, dropped.attempts, dropped.error
            );
        }
        if summary.dropped.len() > MAX_DROPPED_LISTED {
            let _ = writeln!(
                out,
                "  ... and {} more",
                summary.dropped.len() - MAX_DROPPED_LISTED
            );
        }
    }

    out
}

/// Prints the run summary to stdout
pub fn print_summary<R>(result: &CrawlResult<R>) {
    print!("{}", format_summary(result));
}
