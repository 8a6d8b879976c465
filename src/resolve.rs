//! Historical Stat Resolver.
//!
//! Fans the progression lookups out as an unordered pool with bounded
//! concurrency. Lookups are independent: one failing or timing out leaves
//! its record's progression fields null and never touches the others.
//! Repeated identifiers (the same historical match can appear in both
//! teams' tables) are fetched at most once per study.

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use crate::fetch::{FetchConfig, PageFetcher};
use crate::markers::MarkerTable;
use crate::parse::progression::parse_progression;
use crate::types::{MatchId, ProgressionStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Concurrent lookups in flight (upstream rate-limit ceiling).
    pub concurrency: usize,
    /// Budget per individual lookup.
    pub lookup_timeout_ms: u64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            lookup_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedStats {
    pub stats: HashMap<MatchId, ProgressionStats>,
    /// Identifiers whose lookup failed, timed out, or was cancelled by
    /// the overall budget. Their records keep null progression fields.
    pub failed: Vec<MatchId>,
}

impl ResolvedStats {
    /// Attach resolved stats to records in place.
    pub fn fill(&self, records: &mut [crate::types::RecentMatchRecord]) {
        for rec in records {
            if let Some(id) = &rec.match_id {
                if let Some(stats) = self.stats.get(id) {
                    rec.progression = Some(stats.clone());
                }
            }
        }
    }
}

/// Resolve progression stats for a set of historical match ids.
///
/// `budget` bounds the whole pool: when it elapses, still-pending lookups
/// are cancelled and whatever completed is returned (the rest land in
/// `failed`, which the caller records as partial).
pub async fn resolve_progression(
    fetcher: &dyn PageFetcher,
    cfg: &FetchConfig,
    markers: &MarkerTable,
    ids: impl IntoIterator<Item = MatchId>,
    opts: &ResolverOptions,
    budget: Option<Duration>,
) -> ResolvedStats {
    let unique: BTreeSet<MatchId> = ids.into_iter().collect();
    if unique.is_empty() {
        return ResolvedStats::default();
    }

    let lookups = stream::iter(unique.clone())
        .map(|id| async move {
            let page = tokio::time::timeout(
                Duration::from_millis(opts.lookup_timeout_ms),
                fetcher.fetch_progression_page(&id, cfg),
            )
            .await;
            let stats = match page {
                Ok(Ok(html)) => parse_progression(&html, markers),
                _ => None,
            };
            (id, stats)
        })
        .buffer_unordered(opts.concurrency.max(1));

    let settled: Vec<(MatchId, Option<ProgressionStats>)> = match budget {
        Some(d) => lookups.take_until(tokio::time::sleep(d)).collect().await,
        None => lookups.collect().await,
    };

    let mut out = ResolvedStats::default();
    let mut seen = BTreeSet::new();
    for (id, stats) in settled {
        seen.insert(id.clone());
        match stats {
            Some(s) => {
                out.stats.insert(id, s);
            }
            None => out.failed.push(id),
        }
    }
    // lookups cancelled by the budget count as failed too
    for id in unique {
        if !seen.contains(&id) {
            out.failed.push(id);
        }
    }
    out.failed.sort();
    out
}
