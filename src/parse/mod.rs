//! Section Parser.
//!
//! Pure transformation from captured markup to typed sections. Every
//! section extracts independently: a missing section yields an empty or
//! absent result; a section that is present but internally inconsistent
//! records its name in `warnings` and yields empty. Nothing here fails the
//! whole parse.

pub mod header;
pub mod history;
pub mod over_under;
pub mod progression;
pub mod standings;

use chrono::NaiveDate;
use scraper::{ElementRef, Html};

use crate::markers::{MarkerTable, ANCHORS};
use crate::types::{
    MatchId, OverUnderSplit, RecentMatchRecord, SidePair, StudyHeader, TeamStandings,
};

#[derive(Debug, Clone)]
pub struct ParseLimits {
    /// Rows kept per recent-form table. Zero skips the tables entirely.
    pub recent_per_side: usize,
    /// Rows kept from the direct-H2H table.
    pub h2h_window: usize,
    /// Whether the standings and over/under panels are extracted.
    pub standings: bool,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            recent_per_side: 8,
            h2h_window: 8,
            standings: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedSections {
    pub header: Option<StudyHeader>,
    pub recent_home: Vec<RecentMatchRecord>,
    pub recent_away: Vec<RecentMatchRecord>,
    /// Direct meetings; venue is relative to the study's home team.
    pub h2h: Vec<RecentMatchRecord>,
    pub standings: Option<SidePair<TeamStandings>>,
    pub over_under: Option<SidePair<OverUnderSplit>>,
    /// Names of sections that were present but inconsistent.
    pub warnings: Vec<String>,
}

pub fn parse_sections(
    html: &str,
    markers: &MarkerTable,
    match_id: &MatchId,
    limits: &ParseLimits,
) -> ParsedSections {
    let doc = Html::parse_document(html);
    let mut warnings = Vec::new();

    let header = header::parse_header(&doc, markers, match_id);
    let (home_name, away_name) = match &header {
        Some(h) => (h.home.clone(), h.away.clone()),
        None => (String::new(), String::new()),
    };

    let mut out = ParsedSections {
        header,
        ..ParsedSections::default()
    };

    if limits.recent_per_side > 0 && !home_name.is_empty() {
        out.recent_home = history::parse_history_table(
            &doc,
            history::HistoryTable {
                table: &markers.home_recent_table,
                rows: &markers.home_recent_rows,
                score_span: &markers.home_score_span,
                section: "recent_home",
            },
            markers,
            &home_name,
            limits.recent_per_side,
            &mut warnings,
        );
        out.recent_away = history::parse_history_table(
            &doc,
            history::HistoryTable {
                table: &markers.away_recent_table,
                rows: &markers.away_recent_rows,
                score_span: &markers.away_score_span,
                section: "recent_away",
            },
            markers,
            &away_name,
            limits.recent_per_side,
            &mut warnings,
        );
    }

    if limits.h2h_window > 0 && !home_name.is_empty() {
        out.h2h = history::parse_history_table(
            &doc,
            history::HistoryTable {
                table: &markers.h2h_table,
                rows: &markers.h2h_rows,
                score_span: &markers.h2h_score_span,
                section: "h2h",
            },
            markers,
            &home_name,
            limits.h2h_window,
            &mut warnings,
        );
    }

    if limits.standings && !home_name.is_empty() {
        out.standings =
            standings::parse_standings(&doc, markers, &home_name, &away_name, &mut warnings);
        out.over_under = over_under::parse_over_under(&doc, markers);
    }

    out.warnings = warnings;
    out
}

/* ---------- helpers shared by the section parsers ---------- */

pub(crate) fn text_of(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Cell text, preferring the anchor when the cell links a team page.
pub(crate) fn cell_text(cell: &ElementRef<'_>) -> String {
    match cell.select(&ANCHORS).next() {
        Some(a) => text_of(&a),
        None => text_of(cell),
    }
}

pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Find a `dd-mm-yyyy` date anywhere in the cell text.
pub(crate) fn parse_row_date(text: &str) -> Option<NaiveDate> {
    let len = text.len();
    for i in 0..len.saturating_sub(9) {
        if let Some(window) = text.get(i..i + 10) {
            let b = window.as_bytes();
            if b[2] == b'-' && b[5] == b'-' {
                if let Ok(d) = NaiveDate::parse_from_str(window, "%d-%m-%Y") {
                    return Some(d);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_date_is_found_inside_longer_text() {
        assert_eq!(
            parse_row_date("23-02-2025 18:30"),
            NaiveDate::from_ymd_opt(2025, 2, 23)
        );
        assert_eq!(parse_row_date("vs"), None);
        assert_eq!(parse_row_date("99-99-2025"), None);
    }

    #[test]
    fn contains_ci_ignores_case_and_rejects_empty_needle() {
        assert!(contains_ci("Real Sociedad B", "real sociedad"));
        assert!(!contains_ci("Real Sociedad", ""));
    }
}
