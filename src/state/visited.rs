use parking_lot::Mutex;
use std::collections::HashSet;

/// Concurrency-safe set of every URL admitted during a run
///
/// This is the single source of truth for "already scheduled". Entries are
/// only ever inserted; nothing is removed while a run is active.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims a URL
    ///
    /// Returns true only for the call that performed the insertion. Concurrent
    /// claims of the same URL produce exactly one `true`.
    pub fn try_admit(&self, url: &str) -> bool {
        let mut urls = self.urls.lock();
        if urls.contains(url) {
            return false;
        }
        urls.insert(url.to_string())
    }

    /// Returns the number of admitted URLs
    pub fn len(&self) -> usize {
        self.urls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.lock().is_empty()
    }
}
