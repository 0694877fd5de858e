//! Integration tests for Gleaner
//!
//! - `engine_tests`: crawl engine behavior against in-memory transports
//! - `crawl_tests`: end-to-end runs against wiremock servers

mod common;
mod crawl_tests;
