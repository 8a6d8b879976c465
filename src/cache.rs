//! Study Cache.
//!
//! Owns every completed study for the process lifetime, keyed by
//! `(match id, depth mode)`. One `OnceCell` per key gives the at-most-one
//! build-in-flight guarantee: concurrent requests for the same key share
//! the single build; requests for different keys never cross-block (the
//! map lock is only held long enough to hand out the cell). A failed
//! build caches nothing, so the next caller retries.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::error::Result;
use crate::types::{DepthMode, MatchId, StudyDocument};

pub type StudyKey = (MatchId, DepthMode);

/// One finished study plus its freshness timestamp. Entries are owned by
/// the cache; callers only ever see shared handles.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub doc: Arc<StudyDocument>,
    pub stored_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct StudyCache {
    entries: Mutex<HashMap<StudyKey, Arc<OnceCell<CacheEntry>>>>,
}

impl StudyCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn cell(&self, id: &MatchId, mode: DepthMode) -> Arc<OnceCell<CacheEntry>> {
        let mut entries = self.entries.lock().await;
        entries
            .entry((id.clone(), mode))
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Return the cached study or run `build` exactly once for this key,
    /// storing the result before returning it. Concurrent same-key callers
    /// wait on the in-flight build instead of starting their own.
    pub async fn get_or_build<F, Fut>(
        &self,
        id: &MatchId,
        mode: DepthMode,
        build: F,
    ) -> Result<Arc<StudyDocument>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<StudyDocument>>,
    {
        let cell = self.cell(id, mode).await;
        let entry = cell
            .get_or_try_init(|| async {
                let doc = build().await?;
                Ok::<_, crate::error::EstudioError>(CacheEntry {
                    doc: Arc::new(doc),
                    stored_at: Utc::now(),
                })
            })
            .await?;
        Ok(entry.doc.clone())
    }

    /// Cached entry for a key, if a build already completed.
    pub async fn peek(&self, id: &MatchId, mode: DepthMode) -> Option<CacheEntry> {
        let entries = self.entries.lock().await;
        entries
            .get(&(id.clone(), mode))
            .and_then(|cell| cell.get())
            .cloned()
    }

    /// Discard a key so the next request rebuilds it.
    pub async fn discard(&self, id: &MatchId, mode: DepthMode) {
        let mut entries = self.entries.lock().await;
        entries.remove(&(id.clone(), mode));
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|cell| cell.get().is_some()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
