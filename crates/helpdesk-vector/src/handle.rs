//! Shared, swappable reference to the active searcher.

use std::sync::{Arc, PoisonError, RwLock};

use crate::search::Searcher;

/// Readers take a cheap `Arc` snapshot; a reindex publishes a new searcher
/// with `replace`. Queries already holding a snapshot finish against it.
#[derive(Debug, Clone)]
pub struct SearcherHandle {
    inner: Arc<RwLock<Arc<Searcher>>>,
}

impl SearcherHandle {
    pub fn new(searcher: Searcher) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(searcher))) }
    }

    pub fn current(&self) -> Arc<Searcher> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Publish `searcher` and return the one it replaced.
    pub fn replace(&self, searcher: Searcher) -> Arc<Searcher> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(searcher))
    }
}
