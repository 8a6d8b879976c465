//! Result Assembler.
//!
//! Orchestrates fetch → parse → resolve → aggregate for one study build,
//! consulting the cache first and populating it last. Independent builds
//! for different matches run concurrently up to a configured limit; each
//! build owns its browser session exclusively for its duration.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::aggregate;
use crate::cache::StudyCache;
use crate::error::{EstudioError, Result};
use crate::fetch::{FetchConfig, PageFetcher};
use crate::log::log_error;
use crate::markers::MarkerTable;
use crate::parse::{parse_sections, ParseLimits};
use crate::resolve::{resolve_progression, ResolverOptions};
use crate::types::{DepthMode, MatchId, SidePair, StudyDocument, StudyMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerOptions {
    pub fetch: FetchConfig,
    pub resolver: ResolverOptions,
    /// Deadline for the whole historical-lookup pool within one build;
    /// still-pending lookups are cancelled and the study marked partial.
    pub lookup_budget_ms: u64,
    /// Concurrent study builds across match identifiers.
    pub max_concurrent_builds: usize,
    /// Common opponents kept in the indirect comparison.
    pub indirect_limit: usize,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            resolver: ResolverOptions::default(),
            lookup_budget_ms: 30_000,
            max_concurrent_builds: 2,
            indirect_limit: 3,
        }
    }
}

pub struct Assembler<'a> {
    pub cache: &'a StudyCache,
    pub fetcher: &'a dyn PageFetcher,
    pub markers: &'a MarkerTable,
    pub slots: &'a Semaphore,
    pub opts: &'a AssemblerOptions,
}

impl<'a> Assembler<'a> {
    pub fn new(
        cache: &'a StudyCache,
        fetcher: &'a dyn PageFetcher,
        markers: &'a MarkerTable,
        slots: &'a Semaphore,
        opts: &'a AssemblerOptions,
    ) -> Self {
        Self {
            cache,
            fetcher,
            markers,
            slots,
            opts,
        }
    }

    /// Cached study or a fresh build; the cache enforces at most one
    /// build in flight per `(id, mode)`.
    pub async fn study(&self, id: &MatchId, mode: DepthMode) -> Result<Arc<StudyDocument>> {
        self.cache
            .get_or_build(id, mode, || self.build(id, mode))
            .await
    }

    /// Discard any cached entry for the key, then rebuild.
    pub async fn refresh(&self, id: &MatchId, mode: DepthMode) -> Result<Arc<StudyDocument>> {
        self.cache.discard(id, mode).await;
        self.study(id, mode).await
    }

    async fn build(&self, id: &MatchId, mode: DepthMode) -> Result<StudyDocument> {
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| EstudioError::Other("build slots closed".into()))?;
        let plan = mode.plan();

        // A total fetch failure is the only fatal outcome: no document,
        // nothing cached.
        let html = self
            .fetcher
            .fetch_detail_page(id, &self.opts.fetch, self.markers)
            .await
            .map_err(|e| EstudioError::StudyUnavailable(e.to_string()))?;

        let limits = ParseLimits {
            recent_per_side: plan.recent_window,
            h2h_window: plan.h2h_window,
            standings: plan.standings,
        };
        let mut sections = parse_sections(&html, self.markers, id, &limits);
        let header = sections.header.take().ok_or_else(|| {
            EstudioError::StudyUnavailable(format!("no recognizable header in markup for {id}"))
        })?;

        let mut partial_sections = std::mem::take(&mut sections.warnings);
        for section in &partial_sections {
            let err = EstudioError::SectionMalformed(section.clone());
            log_error(Some(&id.0), "section_malformed", Some(&err.to_string()));
        }

        let mut lookup_ids = Vec::new();
        for side in [&sections.recent_home, &sections.recent_away] {
            lookup_ids.extend(
                side.iter()
                    .filter_map(|r| r.match_id.clone())
                    .take(plan.resolve_recent_per_side),
            );
        }
        if plan.resolve_h2h {
            // the two distinguished precedents are enough: the most recent
            // meeting anywhere and the most recent one at this ground
            if let Some(most_recent) = sections.h2h.first() {
                lookup_ids.extend(most_recent.match_id.clone());
            }
            if let Some(stadium) = sections.h2h.iter().find(|m| {
                crate::aggregate::eq_ci(&m.home, &header.home)
                    && crate::aggregate::eq_ci(&m.away, &header.away)
            }) {
                lookup_ids.extend(stadium.match_id.clone());
            }
        }

        if !lookup_ids.is_empty() {
            let resolved = resolve_progression(
                self.fetcher,
                &self.opts.fetch,
                self.markers,
                lookup_ids,
                &self.opts.resolver,
                Some(Duration::from_millis(self.opts.lookup_budget_ms)),
            )
            .await;
            resolved.fill(&mut sections.recent_home);
            resolved.fill(&mut sections.recent_away);
            resolved.fill(&mut sections.h2h);
            for failed in &resolved.failed {
                partial_sections.push(format!("progression:{failed}"));
            }
        }

        let recent_form = if plan.recent_summaries {
            Some(SidePair {
                home: aggregate::recent_form(sections.recent_home.clone()),
                away: aggregate::recent_form(sections.recent_away.clone()),
            })
        } else {
            None
        };
        let h2h_direct = if plan.h2h_direct {
            aggregate::direct_h2h(sections.h2h.clone(), &header)
        } else {
            None
        };
        let h2h_indirect = if plan.h2h_indirect {
            Some(aggregate::indirect_h2h(
                &sections.recent_home,
                &sections.recent_away,
                self.opts.indirect_limit,
            ))
        } else {
            None
        };
        let market_comparison = aggregate::market_comparison(&header);
        let standings = sections.standings.take();
        let over_under = sections.over_under.take();
        let narrative_fragments = if plan.narrative {
            aggregate::narrative_fragments(
                &header,
                recent_form.as_ref(),
                h2h_direct.as_ref(),
                h2h_indirect.as_deref(),
                &market_comparison,
                standings.as_ref(),
            )
        } else {
            Vec::new()
        };

        let partial = !partial_sections.is_empty();
        Ok(StudyDocument {
            header,
            standings,
            over_under,
            recent_form,
            h2h_direct,
            h2h_indirect,
            market_comparison,
            narrative_fragments,
            meta: StudyMeta {
                mode,
                partial,
                partial_sections,
                fetched_at: Utc::now(),
            },
        })
    }
}
