//! Last-known locations of declared elements.
//!
//! Every resolution pass first registers all of the page's declared elements
//! as pending, then overwrites the entries of the elements it resolved. An
//! element that is missing in the latest pass therefore stays pending, and an
//! interaction on it fails instead of reusing a path from an older pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::declaration::ElementId;
use crate::finder::ElementLocation;
use crate::page::Page;

/// A cache entry: the page an element was last checked with and, once
/// resolved, its location.
#[derive(Clone)]
pub struct CacheEntry {
    pub page: Arc<dyn Page>,
    /// `None` while pending.
    pub location: Option<ElementLocation>,
}

impl CacheEntry {
    pub fn is_pending(&self) -> bool {
        self.location.is_none()
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("page", &self.page.name())
            .field("location", &self.location)
            .finish()
    }
}

/// Element identity to last-known location.
#[derive(Debug, Default)]
pub struct ElementCache {
    entries: Mutex<HashMap<ElementId, CacheEntry>>,
}

impl ElementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entries of `page` with pending entries for `ids`.
    ///
    /// Entries last checked with the same page instance are dropped first, so
    /// elements a `body()` builds afresh on every evaluation do not pile up.
    /// Dynamic elements are skipped.
    pub fn register_pending(&self, page: &Arc<dyn Page>, ids: impl IntoIterator<Item = ElementId>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| !Arc::ptr_eq(&entry.page, page));
        for id in ids.into_iter().filter(|id| !id.is_dynamic()) {
            entries.insert(
                id,
                CacheEntry {
                    page: Arc::clone(page),
                    location: None,
                },
            );
        }
    }

    /// Stores a resolved location.
    pub fn set(&self, id: ElementId, page: &Arc<dyn Page>, location: ElementLocation) {
        if id.is_dynamic() {
            return;
        }
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(
            id,
            CacheEntry {
                page: Arc::clone(page),
                location: Some(location),
            },
        );
    }

    /// `None` when the element has never been checked.
    pub fn get(&self, id: ElementId) -> Option<CacheEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
