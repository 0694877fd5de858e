//! Fetch workers and the state they share
//!
//! Each worker pulls a task from the frontier and runs it through
//! domain admission, budget claim, fetch, release and classification, then
//! acts on the outcome. Outstanding work is counted per task: the count is
//! raised before a task is queued and lowered only once the task is
//! finished and its children are queued, so it reaches zero exactly when
//! the crawl has nothing left to do.

use super::dispatcher::Dispatcher;
use super::result::{DropReason, DroppedTask, RunSummary};
use super::retry::{RetryDecision, RetryPolicy};
use super::task::{CrawlTask, FetchFailure, FetchOutcome};
use super::transport::Transport;
use crate::extract::{Extraction, Extractor};
use crate::state::{CrawlBudget, TaskState, VisitedSet};
use crate::url::{extract_domain, normalize_link, DomainAllowList};
use crate::GleanError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything accumulated into the result
pub(crate) struct Progress<R> {
    pub records: Vec<R>,
    pub links: Vec<String>,
    pub summary: RunSummary,
}

impl<R> Default for Progress<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            links: Vec::new(),
            summary: RunSummary::default(),
        }
    }
}

/// State shared by all workers of one run
pub(crate) struct CrawlContext<T, E: Extractor> {
    pub transport: Arc<T>,
    pub extractor: Arc<E>,
    pub dispatcher: Arc<Dispatcher>,
    pub headers: BTreeMap<String, String>,
    pub allow_list: DomainAllowList,
    pub retry: RetryPolicy,
    pub visited: VisitedSet,
    pub budget: CrawlBudget,
    pub frontier: mpsc::UnboundedSender<CrawlTask>,
    pub progress: Mutex<Progress<E::Record>>,
    /// Tasks queued, in flight or in backoff
    pub outstanding: AtomicUsize,
    /// Signalled when `outstanding` drops to zero
    pub idle: Notify,
    /// Fires on completion or cancellation; stops admission
    pub shutdown: CancellationToken,
}

impl<T, E> CrawlContext<T, E>
where
    T: Transport + 'static,
    E: Extractor + 'static,
{
    /// Queues an admitted task, counting it as outstanding
    pub fn enqueue(&self, task: CrawlTask) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        if self.frontier.send(task).is_err() {
            self.finish_task();
        }
    }

    /// Marks one task as finished
    fn finish_task(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_one();
        }
    }

    /// Runs one task to its next resting point
    ///
    /// Returns once the task is finished, queued for retry, or abandoned.
    /// A first attempt claims its page from the budget only after the
    /// dispatcher grants a slot, so the page count matches real dispatches.
    pub async fn process(self: &Arc<Self>, mut task: CrawlTask) -> Result<(), GleanError> {
        if task.is_first_attempt() && !self.budget.has_remaining() {
            return self.skip_over_budget(task);
        }

        let Some(permit) = self
            .dispatcher
            .admit_url(task.domain(), task.url(), &self.shutdown)
            .await
        else {
            // Cancelled while waiting; the task stays outstanding as abandoned
            return Ok(());
        };

        if task.is_first_attempt() && !self.budget.try_dispatch() {
            drop(permit);
            return self.skip_over_budget(task);
        }

        task.transition_to(TaskState::InFlight)?;
        tracing::debug!(
            "Fetching {} (depth {}, attempt {})",
            task.url(),
            task.depth(),
            task.attempt()
        );

        let response = self.transport.fetch(task.url(), &self.headers).await;
        drop(permit);
        self.progress.lock().summary.fetch_attempts += 1;

        match FetchOutcome::classify(response) {
            FetchOutcome::Success {
                final_url, body, ..
            } => self.handle_success(task, final_url, &body),
            FetchOutcome::TransientFailure(failure) => self.handle_transient(task, failure),
            FetchOutcome::FatalFailure(failure) => {
                self.drop_task(task, DropReason::Fatal, failure)
            }
        }
    }

    fn skip_over_budget(&self, mut task: CrawlTask) -> Result<(), GleanError> {
        tracing::debug!("Budget exhausted, skipping {}", task.url());
        task.transition_to(TaskState::Dropped)?;
        self.progress.lock().summary.budget_skipped += 1;
        self.finish_task();
        Ok(())
    }

    fn handle_success(
        &self,
        mut task: CrawlTask,
        mut final_url: Url,
        body: &[u8],
    ) -> Result<(), GleanError> {
        final_url.set_fragment(None);

        // A redirect target is a page of its own; only its first visitor
        // extracts it.
        let extraction = if final_url != *task.url() && !self.visited.try_admit(final_url.as_str())
        {
            tracing::debug!(
                "{} redirected to already visited {}",
                task.url(),
                final_url
            );
            Extraction::empty()
        } else {
            match self.extractor.extract(&final_url, body) {
                Ok(extraction) => extraction,
                Err(err) => {
                    return self.drop_task(task, DropReason::Fatal, FetchFailure::Extract(err))
                }
            }
        };

        task.transition_to(TaskState::Done)?;

        let succeeded = {
            let mut progress = self.progress.lock();
            progress.summary.pages_succeeded += 1;
            if let Some(record) = extraction.record {
                progress.summary.records_extracted += 1;
                progress.records.push(record);
            }
            progress.summary.pages_succeeded
        };

        if !self.shutdown.is_cancelled() {
            for raw in &extraction.links {
                self.discover(&task, &final_url, raw);
            }
        }

        if succeeded % 10 == 0 {
            tracing::info!(
                "Progress: {} pages fetched, {} of {} budget used, {} outstanding",
                succeeded,
                self.budget.pages_visited(),
                self.budget.max_pages(),
                self.outstanding.load(Ordering::Acquire).saturating_sub(1)
            );
        }

        self.finish_task();
        Ok(())
    }

    fn handle_transient(
        self: &Arc<Self>,
        mut task: CrawlTask,
        failure: FetchFailure,
    ) -> Result<(), GleanError> {
        let delay = match self.retry.decide(task.attempt()) {
            RetryDecision::Retry { delay } => delay,
            RetryDecision::GiveUp => {
                return self.drop_task(task, DropReason::RetriesExhausted, failure);
            }
        };

        if self.shutdown.is_cancelled() {
            return Ok(());
        }

        task.transition_to(TaskState::Retrying)?;
        self.progress.lock().summary.retries_scheduled += 1;
        tracing::debug!(
            "Transient failure on {} ({}), retrying in {:?}",
            task.url(),
            failure,
            delay
        );

        // The worker is free while the task waits out its backoff
        let ctx = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if ctx.frontier.send(task.next_attempt()).is_err() {
                        ctx.finish_task();
                    }
                }
            }
        });

        Ok(())
    }

    fn drop_task(
        &self,
        mut task: CrawlTask,
        reason: DropReason,
        failure: FetchFailure,
    ) -> Result<(), GleanError> {
        task.transition_to(TaskState::Dropped)?;
        tracing::warn!(
            "Dropping {} after {} attempt(s): {} ({})",
            task.url(),
            task.attempt(),
            failure,
            reason
        );

        {
            let mut progress = self.progress.lock();
            match reason {
                DropReason::Fatal => progress.summary.fatal_failures += 1,
                DropReason::RetriesExhausted => progress.summary.retries_exhausted += 1,
            }
            progress.summary.dropped.push(DroppedTask {
                url: task.url().to_string(),
                depth: task.depth(),
                attempts: task.attempt(),
                reason,
                error: failure.to_string(),
            });
        }

        self.finish_task();
        Ok(())
    }

    /// Admits a link found on `parent`'s page, served from `base`
    fn discover(&self, parent: &CrawlTask, base: &Url, raw: &str) {
        let url = match normalize_link(base, raw) {
            Ok(url) => url,
            Err(err) => {
                tracing::trace!("Skipping link {:?} on {}: {}", raw, base, err);
                return;
            }
        };

        let Some(domain) = extract_domain(&url) else {
            return;
        };
        if !self.allow_list.allows_domain(&domain) {
            tracing::trace!("Skipping out-of-scope link {}", url);
            return;
        }

        let depth = parent.depth() + 1;
        if !self.budget.allows_depth(depth) || !self.budget.has_remaining() {
            return;
        }

        if !self.visited.try_admit(url.as_str()) {
            return;
        }

        self.progress.lock().links.push(url.to_string());
        self.enqueue(CrawlTask::new(url, depth, domain));
    }
}

/// Worker loop: takes tasks until shutdown
pub(crate) async fn run_worker<T, E>(
    id: usize,
    ctx: Arc<CrawlContext<T, E>>,
    frontier: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<CrawlTask>>>,
) where
    T: Transport + 'static,
    E: Extractor + 'static,
{
    tracing::trace!("Worker {} started", id);

    loop {
        let next = {
            let mut receiver = frontier.lock().await;
            tokio::select! {
                biased;
                _ = ctx.shutdown.cancelled() => None,
                task = receiver.recv() => task,
            }
        };

        let Some(task) = next else {
            break;
        };

        let url = task.url().to_string();
        if let Err(e) = ctx.process(task).await {
            tracing::error!("Error processing {}: {}", url, e);
            ctx.finish_task();
        }
    }

    tracing::trace!("Worker {} stopped", id);
}
