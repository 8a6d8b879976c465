use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::assemble::{Assembler, AssemblerOptions};
use crate::cache::StudyCache;
use crate::error::{EstudioError, Result};
use crate::fetch::{HeadlessFetcher, PageFetcher};
use crate::log::{log_error, log_info};
use crate::markers::MarkerTable;
use crate::parse::progression::parse_progression;
use crate::types::{DepthMode, MatchId, ProgressionStats, StudyDocument};

/* ------------ public facade components ------------ */

/// Everything one process shares across study requests: the fetcher, the
/// marker table, the cache, and the build-concurrency slots.
pub struct Components {
    pub fetcher: Box<dyn PageFetcher>,
    pub markers: MarkerTable,
    pub cache: StudyCache,
    pub opts: AssemblerOptions,
    slots: Semaphore,
}

impl Components {
    pub fn new() -> Result<Self> {
        Self::with_options(AssemblerOptions::default())
    }

    pub fn with_options(opts: AssemblerOptions) -> Result<Self> {
        let fetcher = HeadlessFetcher::new(&opts.fetch)?;
        Ok(Self {
            fetcher: Box::new(fetcher),
            markers: MarkerTable::default(),
            cache: StudyCache::new(),
            slots: Semaphore::new(opts.max_concurrent_builds.max(1)),
            opts,
        })
    }

    /// Swap the fetcher, e.g. for fixtures or the plain-HTTP path.
    pub fn with_fetcher(mut self, fetcher: Box<dyn PageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Swap the marker table, e.g. one loaded from a JSON file after
    /// site layout drift.
    pub fn with_markers(mut self, markers: MarkerTable) -> Self {
        self.markers = markers;
        self
    }
}

pub fn make_assembler(c: &Components) -> Assembler<'_> {
    Assembler::new(&c.cache, &*c.fetcher, &c.markers, &c.slots, &c.opts)
}

/* ------------ study entrypoints ------------ */

pub async fn study(
    c: &Components,
    raw_id: &str,
    mode: DepthMode,
    refresh: bool,
) -> Result<Arc<StudyDocument>> {
    let id = MatchId::parse(raw_id)?;
    let start = Instant::now();
    let assembler = make_assembler(c);
    let result = if refresh {
        assembler.refresh(&id, mode).await
    } else {
        assembler.study(&id, mode).await
    };
    let details = format!(
        "{} in {}ms",
        if result.is_ok() { "succeeded" } else { "failed" },
        start.elapsed().as_millis()
    );
    match &result {
        Ok(_) => log_info(Some(&id.0), "study", Some(&details)),
        Err(_) => log_error(Some(&id.0), "study", Some(&details)),
    }
    result
}

/// One-off progression lookup, bypassing the study pipeline.
pub async fn progression_stats(c: &Components, raw_id: &str) -> Result<ProgressionStats> {
    let id = MatchId::parse(raw_id)?;
    let start = Instant::now();
    let result = async {
        let html = c.fetcher.fetch_progression_page(&id, &c.opts.fetch).await?;
        parse_progression(&html, &c.markers)
            .ok_or_else(|| EstudioError::Other(format!("no progression stats for {id}")))
    }
    .await;
    let details = format!(
        "{} in {}ms",
        if result.is_ok() { "succeeded" } else { "failed" },
        start.elapsed().as_millis()
    );
    match &result {
        Ok(_) => log_info(Some(&id.0), "progression_stats", Some(&details)),
        Err(_) => log_error(Some(&id.0), "progression_stats", Some(&details)),
    }
    result
}
