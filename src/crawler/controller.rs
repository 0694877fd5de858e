//! Crawl controller - run orchestration
//!
//! This module contains the entry point of a crawl run, including:
//! - Validating the run configuration before any fetch
//! - Seeding the frontier with the start URLs
//! - Spawning the worker pool
//! - Detecting completion and handling cancellation
//! - Assembling the final `CrawlResult`

use super::dispatcher::Dispatcher;
use super::result::{CrawlResult, RunStatus};
use super::retry::RetryPolicy;
use super::task::CrawlTask;
use super::transport::Transport;
use super::worker::{run_worker, CrawlContext, Progress};
use crate::config::{validate, validate_start_urls, Config};
use crate::extract::Extractor;
use crate::state::{CrawlBudget, VisitedSet};
use crate::url::{extract_domain, normalize_seed, DomainAllowList};
use crate::{ConfigError, GleanError, UrlError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Orchestrates crawl runs over an injected transport and extractor
///
/// The dispatcher is owned by the controller, so pacing state carries over
/// between runs made with the same controller.
pub struct Controller<T, E> {
    config: Arc<Config>,
    transport: Arc<T>,
    extractor: Arc<E>,
    dispatcher: Arc<Dispatcher>,
}

impl<T, E> Controller<T, E>
where
    T: Transport + 'static,
    E: Extractor + 'static,
{
    /// Creates a controller, validating the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration
    /// * `transport` - Performs fetches
    /// * `extractor` - Turns fetched pages into records and links
    ///
    /// # Returns
    ///
    /// * `Ok(Controller)` - Configuration is valid
    /// * `Err(ConfigError)` - A limit, pattern or URL is invalid
    pub fn new(config: Config, transport: T, extractor: E) -> Result<Self, ConfigError> {
        validate(&config)?;

        let dispatcher = Dispatcher::new(config.limits.clone());
        Ok(Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            extractor: Arc::new(extractor),
            dispatcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the dispatcher shared by this controller's runs
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Crawls from `start_urls` until the frontier drains
    pub async fn run(&self, start_urls: &[String]) -> Result<CrawlResult<E::Record>, GleanError> {
        self.run_with_cancellation(start_urls, CancellationToken::new())
            .await
    }

    /// Crawls from `start_urls` until the frontier drains or `cancel` fires
    ///
    /// Cancellation is not an error: the partial result is returned with
    /// `RunStatus::Cancelled`. In-flight fetches are allowed to finish;
    /// queued tasks and tasks in backoff are counted as abandoned.
    pub async fn run_with_cancellation(
        &self,
        start_urls: &[String],
        cancel: CancellationToken,
    ) -> Result<CrawlResult<E::Record>, GleanError> {
        let started = Instant::now();
        let allow_list = DomainAllowList::new(self.config.crawler.allowed_domains.clone());

        if start_urls.is_empty() {
            return Err(ConfigError::Validation(
                "at least one start URL is required".to_string(),
            )
            .into());
        }
        validate_start_urls(start_urls, &allow_list)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let ctx = Arc::new(CrawlContext {
            transport: Arc::clone(&self.transport),
            extractor: Arc::clone(&self.extractor),
            dispatcher: Arc::clone(&self.dispatcher),
            headers: self.config.headers.clone(),
            allow_list,
            retry: RetryPolicy::from_config(&self.config.retry),
            visited: VisitedSet::new(),
            budget: CrawlBudget::new(self.config.crawler.max_pages, self.config.crawler.max_depth),
            frontier: sender,
            progress: Mutex::new(Progress::default()),
            outstanding: AtomicUsize::new(0),
            idle: Notify::new(),
            shutdown: cancel.child_token(),
        });

        let mut seeded = 0;
        for raw in start_urls {
            let url = normalize_seed(raw)?;
            let domain = extract_domain(&url).ok_or(UrlError::MissingDomain)?;
            if ctx.visited.try_admit(url.as_str()) {
                ctx.enqueue(CrawlTask::new(url, 0, domain));
                seeded += 1;
            }
        }

        tracing::info!(
            "Starting crawl: {} seed(s), max {} pages, max depth {}, {} workers",
            seeded,
            self.config.crawler.max_pages,
            self.config.crawler.max_depth,
            self.config.crawler.workers
        );

        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let mut workers = JoinSet::new();
        for id in 0..self.config.crawler.workers as usize {
            workers.spawn(run_worker(id, Arc::clone(&ctx), Arc::clone(&receiver)));
        }

        let status = tokio::select! {
            _ = ctx.idle.notified() => RunStatus::Completed,
            _ = cancel.cancelled() => RunStatus::Cancelled,
        };

        if status.is_cancelled() {
            tracing::info!("Cancellation requested, waiting for in-flight fetches");
        }
        ctx.shutdown.cancel();

        while let Some(joined) = workers.join_next().await {
            joined?;
        }

        let progress = std::mem::take(&mut *ctx.progress.lock());
        let mut summary = progress.summary;
        summary.abandoned = ctx.outstanding.load(Ordering::Acquire) as u64;
        summary.elapsed = started.elapsed();

        let result = CrawlResult {
            records: progress.records,
            links_discovered: progress.links,
            pages_visited: ctx.budget.pages_visited(),
            status,
            summary,
        };

        tracing::info!(
            "Crawl {}: {} pages visited, {} records, {} links, {} dropped, {:.2}s",
            result.status,
            result.pages_visited,
            result.records.len(),
            result.links_discovered.len(),
            result.summary.dropped.len(),
            result.summary.elapsed.as_secs_f64()
        );

        Ok(result)
    }
}
