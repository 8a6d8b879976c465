//! Header extraction: team/league identity from the page's info script,
//! kickoff, final score, and the odds widget snapshot.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use scraper::{ElementRef, Html};

use super::text_of;
use crate::handicap::Handicap;
use crate::markers::{MarkerTable, CELLS, SCRIPTS};
use crate::types::{MarketSnapshot, MatchId, OddsLine, Score, StudyHeader};

// Odds row columns: [2..=4] handicap home/line/away, [8..=10] goals
// over/line/under. Values sit in a `data-o` attribute, text as fallback.
const AH_HOME_CELL: usize = 2;
const AH_LINE_CELL: usize = 3;
const AH_AWAY_CELL: usize = 4;
const GOALS_OVER_CELL: usize = 8;
const GOAL_LINE_CELL: usize = 9;
const GOALS_UNDER_CELL: usize = 10;

pub(crate) fn parse_header(
    doc: &Html,
    markers: &MarkerTable,
    match_id: &MatchId,
) -> Option<StudyHeader> {
    let content = find_info_script(doc, markers)?;
    let home = script_field(&content, "hName")?.to_string();
    let away = script_field(&content, "gName")?.to_string();
    if home.is_empty() || away.is_empty() {
        return None;
    }
    let league = script_field(&content, "lName")
        .map(str::to_string)
        .filter(|s| !s.is_empty());
    let league_id = script_field(&content, "sclassId")
        .map(str::to_string)
        .filter(|s| !s.is_empty());

    Some(StudyHeader {
        match_id: match_id.clone(),
        home,
        away,
        league,
        league_id,
        kickoff: parse_kickoff(&content),
        final_score: parse_final_score(doc, markers),
        odds: MarketSnapshot {
            early: parse_odds_row(doc, markers, &markers.early_odds_rows).unwrap_or_default(),
            live: parse_odds_row(doc, markers, &markers.live_odds_rows),
        },
    })
}

fn find_info_script(doc: &Html, markers: &MarkerTable) -> Option<String> {
    for script in doc.select(&SCRIPTS) {
        let content = script.text().collect::<String>();
        if content.contains(&markers.info_script_needle) {
            return Some(content);
        }
    }
    None
}

/// Pull the first single-quoted value after `key:`. Covers both
/// `hName: 'Foo'` and `hId: parseInt('123')`.
pub(crate) fn script_field<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    let pat = format!("{key}:");
    let at = content.find(&pat)?;
    let rest = &content[at + pat.len()..];
    // stay on this statement; a quote past the line end belongs elsewhere
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let line = &rest[..line_end];
    let q0 = line.find('\'')?;
    let tail = &line[q0 + 1..];
    let q1 = tail.find('\'')?;
    Some(&tail[..q1])
}

fn parse_kickoff(content: &str) -> Option<NaiveDateTime> {
    if let Some(t) = script_field(content, "matchTime") {
        for fmt in ["%m/%d/%Y %I:%M:%S %p", "%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
                return Some(dt);
            }
        }
    }
    let date = script_field(content, "startDate")?;
    let d = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = script_field(content, "doorTime")
        .and_then(|t| t.get(0..5))
        .and_then(|hm| NaiveTime::parse_from_str(hm, "%H:%M").ok())
        .unwrap_or(NaiveTime::MIN);
    Some(d.and_time(time))
}

fn parse_final_score(doc: &Html, markers: &MarkerTable) -> Option<Score> {
    let panel_sel = markers.compile(&markers.final_score_panel).ok()?;
    let cells_sel = markers.compile(&markers.final_score_cells).ok()?;
    let panel = doc.select(&panel_sel).next()?;
    let parts: Vec<String> = panel.select(&cells_sel).map(|e| text_of(&e)).collect();
    if parts.len() == 2 {
        Score::parse(&format!("{}-{}", parts[0], parts[1]))
    } else {
        None
    }
}

fn cell_value(cell: &ElementRef<'_>) -> String {
    cell.value()
        .attr("data-o")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| text_of(cell))
}

fn cell_quote(cells: &[ElementRef<'_>], idx: usize) -> Option<f64> {
    cells.get(idx).and_then(|c| cell_value(c).parse().ok())
}

fn cell_line(cells: &[ElementRef<'_>], idx: usize) -> Option<Handicap> {
    cells.get(idx).and_then(|c| Handicap::parse(&cell_value(c)))
}

fn parse_odds_row(doc: &Html, markers: &MarkerTable, rows_css: &str) -> Option<OddsLine> {
    let sel = markers.compile(rows_css).ok()?;
    let row = doc.select(&sel).next()?;
    let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
    if cells.len() <= GOALS_UNDER_CELL {
        return None;
    }
    Some(OddsLine {
        ah_home_quote: cell_quote(&cells, AH_HOME_CELL),
        ah_line: cell_line(&cells, AH_LINE_CELL),
        ah_away_quote: cell_quote(&cells, AH_AWAY_CELL),
        goals_over_quote: cell_quote(&cells, GOALS_OVER_CELL),
        goal_line: cell_line(&cells, GOAL_LINE_CELL),
        goals_under_quote: cell_quote(&cells, GOALS_UNDER_CELL),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_field_reads_quoted_and_parse_int_values() {
        let content = r#"
            var _matchInfo = {
                hId: parseInt('19'),
                gId: parseInt('23'),
                sclassId: parseInt('36'),
                hName: 'Alaves',
                gName: 'Getafe',
                lName: 'La Liga',
                matchTime: '9/9/2025 5:00:00 PM',
            };
        "#;
        assert_eq!(script_field(content, "hName"), Some("Alaves"));
        assert_eq!(script_field(content, "sclassId"), Some("36"));
        assert_eq!(script_field(content, "missing"), None);
    }

    #[test]
    fn kickoff_prefers_match_time_then_start_date() {
        let with_time = "matchTime: '9/9/2025 5:00:00 PM'";
        let dt = parse_kickoff(with_time).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2025-09-09 17:00");

        let with_date = "startDate: '2025-09-09'\ndoorTime: '09:30:00.000+08:00'";
        let dt = parse_kickoff(with_date).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2025-09-09 09:30");
    }
}
