//! Row extraction for the three history tables (home recent, away recent,
//! direct H2H). All three share one column grammar; only the table, row
//! and score-span markers differ.

use scraper::{ElementRef, Html};

use super::{cell_text, contains_ci, parse_row_date, text_of};
use crate::handicap::Handicap;
use crate::markers::{MarkerTable, CELLS};
use crate::types::{MatchId, RecentMatchRecord, Score, Venue};

// Column map of a history row. Rows are located by their id-prefix marker;
// within a located row the cells are positional by the site's grammar.
const DATE_CELL: usize = 1;
const HOME_CELL: usize = 2;
const SCORE_CELL: usize = 3;
const AWAY_CELL: usize = 4;
const AH_CELL: usize = 11;

pub(crate) struct HistoryTable<'a> {
    pub table: &'a str,
    pub rows: &'a str,
    pub score_span: &'a str,
    pub section: &'a str,
}

pub(crate) fn parse_history_table(
    doc: &Html,
    layout: HistoryTable<'_>,
    markers: &MarkerTable,
    subject: &str,
    limit: usize,
    warnings: &mut Vec<String>,
) -> Vec<RecentMatchRecord> {
    let Ok(table_sel) = markers.compile(layout.table) else {
        warnings.push(layout.section.to_string());
        return Vec::new();
    };
    let Some(table) = doc.select(&table_sel).next() else {
        // absent section: empty result, not a warning
        return Vec::new();
    };
    let (Ok(rows_sel), Ok(date_sel), Ok(score_sel)) = (
        markers.compile(layout.rows),
        markers.compile(&markers.row_date),
        markers.compile(layout.score_span),
    ) else {
        warnings.push(layout.section.to_string());
        return Vec::new();
    };

    let rows: Vec<ElementRef<'_>> = table.select(&rows_sel).collect();
    let mut out = Vec::new();
    for row in &rows {
        if out.len() >= limit {
            break;
        }
        if let Some(rec) = parse_history_row(row, &date_sel, &score_sel, subject) {
            out.push(rec);
        }
    }

    // present but nothing parseable: internally inconsistent
    if !rows.is_empty() && out.is_empty() {
        warnings.push(layout.section.to_string());
        return out;
    }

    // chronological, most recent first; undated rows sink to the end
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

fn parse_history_row(
    row: &ElementRef<'_>,
    date_sel: &scraper::Selector,
    score_sel: &scraper::Selector,
    subject: &str,
) -> Option<RecentMatchRecord> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
    if cells.len() <= AH_CELL {
        return None;
    }

    let home = cell_text(&cells[HOME_CELL]);
    let away = cell_text(&cells[AWAY_CELL]);
    if home.is_empty() || away.is_empty() {
        return None;
    }

    let date = row
        .select(date_sel)
        .next()
        .map(|e| text_of(&e))
        .or_else(|| Some(text_of(&cells[DATE_CELL])))
        .and_then(|t| parse_row_date(&t));

    // score, e.g. "2-1" or "2-1(1-0)" with the half-time tail
    let score_text = row
        .select(score_sel)
        .next()
        .map(|e| text_of(&e))
        .unwrap_or_else(|| text_of(&cells[SCORE_CELL]));
    let score = Score::parse(score_text.split('(').next().unwrap_or(""));

    let ah_cell = &cells[AH_CELL];
    let ah_raw = ah_cell
        .value()
        .attr("data-o")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| text_of(ah_cell));
    let handicap = Handicap::parse(&ah_raw);

    let match_id = row
        .value()
        .attr("index")
        .and_then(|s| MatchId::parse(s).ok());
    let league_id = row
        .value()
        .attr("name")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let venue = if contains_ci(&home, subject) {
        Venue::Home
    } else {
        Venue::Away
    };

    Some(RecentMatchRecord {
        match_id,
        date,
        home,
        away,
        venue,
        score,
        handicap,
        league_id,
        progression: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_html(rows: &str) -> String {
        format!(r#"<html><body><table id="table_v1">{rows}</table></body></html>"#)
    }

    fn row_html(id: &str, date: &str, home: &str, score: &str, away: &str, ah: &str) -> String {
        format!(
            r#"<tr id="tr1_{id}" index="{id}" vs="1" name="36">
                <td>1</td>
                <td><span name="timeData">{date}</span></td>
                <td><a onclick="team(19)">{home}</a></td>
                <td><span class="fscore_1">{score}</span></td>
                <td><a onclick="team(23)">{away}</a></td>
                <td>w</td><td>-</td><td>-</td><td>-</td><td>-</td><td>-</td>
                <td data-o="{ah}">{ah}</td>
                <td>-</td>
            </tr>"#
        )
    }

    #[test]
    fn parses_rows_into_typed_records() {
        let html = table_html(&[
            row_html("901", "23-02-2025", "Alaves", "2-1", "Getafe", "-0.5"),
            row_html("902", "16-02-2025", "Osasuna", "0-0", "Alaves", "0/0.5"),
        ]
        .join(""));
        let doc = Html::parse_document(&html);
        let markers = MarkerTable::default();
        let mut warnings = Vec::new();
        let recs = parse_history_table(
            &doc,
            HistoryTable {
                table: &markers.home_recent_table,
                rows: &markers.home_recent_rows,
                score_span: &markers.home_score_span,
                section: "recent_home",
            },
            &markers,
            "Alaves",
            8,
            &mut warnings,
        );
        assert!(warnings.is_empty());
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].match_id, Some(MatchId("901".into())));
        assert_eq!(recs[0].venue, Venue::Home);
        assert_eq!(recs[0].score, Some(Score { home: 2, away: 1 }));
        assert_eq!(recs[0].handicap.unwrap().line, -0.5);
        assert_eq!(recs[1].venue, Venue::Away);
        assert_eq!(recs[1].handicap.unwrap().line, 0.25);
        assert_eq!(recs[1].league_id.as_deref(), Some("36"));
    }

    #[test]
    fn limit_bounds_the_window() {
        let html = table_html(&[
            row_html("1", "23-02-2025", "A", "1-0", "B", "0"),
            row_html("2", "16-02-2025", "A", "1-0", "C", "0"),
            row_html("3", "09-02-2025", "A", "1-0", "D", "0"),
        ]
        .join(""));
        let doc = Html::parse_document(&html);
        let markers = MarkerTable::default();
        let mut warnings = Vec::new();
        let recs = parse_history_table(
            &doc,
            HistoryTable {
                table: &markers.home_recent_table,
                rows: &markers.home_recent_rows,
                score_span: &markers.home_score_span,
                section: "recent_home",
            },
            &markers,
            "A",
            2,
            &mut warnings,
        );
        assert_eq!(recs.len(), 2);
    }

    #[test]
    fn missing_table_is_empty_without_warning() {
        let doc = Html::parse_document("<html><body></body></html>");
        let markers = MarkerTable::default();
        let mut warnings = Vec::new();
        let recs = parse_history_table(
            &doc,
            HistoryTable {
                table: &markers.h2h_table,
                rows: &markers.h2h_rows,
                score_span: &markers.h2h_score_span,
                section: "h2h",
            },
            &markers,
            "A",
            8,
            &mut warnings,
        );
        assert!(recs.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn unparseable_rows_flag_the_section_as_malformed() {
        let html = table_html(r#"<tr id="tr1_1"><td>too</td><td>short</td></tr>"#);
        let doc = Html::parse_document(&html);
        let markers = MarkerTable::default();
        let mut warnings = Vec::new();
        let recs = parse_history_table(
            &doc,
            HistoryTable {
                table: &markers.home_recent_table,
                rows: &markers.home_recent_rows,
                score_span: &markers.home_score_span,
                section: "recent_home",
            },
            &markers,
            "A",
            8,
            &mut warnings,
        );
        assert!(recs.is_empty());
        assert_eq!(warnings, vec!["recent_home".to_string()]);
    }
}
