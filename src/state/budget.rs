use std::sync::atomic::{AtomicU32, Ordering};

/// Page-count and depth budget for one crawl run
///
/// `pages_visited` is incremented at dispatch time, never at completion, so
/// concurrent workers cannot overrun `max_pages` while fetches are in flight.
#[derive(Debug)]
pub struct CrawlBudget {
    max_pages: u32,
    max_depth: u32,
    pages_visited: AtomicU32,
}

impl CrawlBudget {
    pub fn new(max_pages: u32, max_depth: u32) -> Self {
        Self {
            max_pages,
            max_depth,
            pages_visited: AtomicU32::new(0),
        }
    }

    /// Claims one page of budget for a dispatch
    ///
    /// Returns false once `max_pages` dispatches have been claimed. The
    /// check and the increment are a single atomic step.
    pub fn try_dispatch(&self) -> bool {
        self.pages_visited
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |visited| {
                (visited < self.max_pages).then_some(visited + 1)
            })
            .is_ok()
    }

    /// Returns true while more pages may be dispatched
    pub fn has_remaining(&self) -> bool {
        self.pages_visited.load(Ordering::Acquire) < self.max_pages
    }

    /// Returns true if a task at `depth` may be created
    pub fn allows_depth(&self, depth: u32) -> bool {
        depth <= self.max_depth
    }

    pub fn pages_visited(&self) -> u32 {
        self.pages_visited.load(Ordering::Acquire)
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}
