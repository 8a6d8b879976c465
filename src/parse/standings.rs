//! League-standings extraction from the side-by-side panel.

use scraper::{ElementRef, Html};

use super::{contains_ci, text_of};
use crate::markers::{MarkerTable, ANCHORS, CELLS, HEADER_CELLS, ROWS};
use crate::types::{SidePair, StandingsRow, StandingsScope, TeamStandings};

pub(crate) fn parse_standings(
    doc: &Html,
    markers: &MarkerTable,
    home_name: &str,
    away_name: &str,
    warnings: &mut Vec<String>,
) -> Option<SidePair<TeamStandings>> {
    let panel_sel = markers.compile(&markers.standings_panel).ok()?;
    let panel = doc.select(&panel_sel).next()?;

    let home = parse_side(&panel, markers, home_name, true);
    let away = parse_side(&panel, markers, away_name, false);
    match (home, away) {
        (Some(h), Some(a)) => Some(SidePair { home: h, away: a }),
        _ => {
            // panel exists but neither/only one block matched its team
            warnings.push("standings".to_string());
            None
        }
    }
}

fn parse_side(
    panel: &ElementRef<'_>,
    markers: &MarkerTable,
    team: &str,
    is_home: bool,
) -> Option<TeamStandings> {
    let block_css = if is_home {
        &markers.standings_home_block
    } else {
        &markers.standings_away_block
    };
    let table_css = if is_home {
        &markers.standings_home_table
    } else {
        &markers.standings_away_table
    };
    let block = panel.select(&markers.compile(block_css).ok()?).next()?;
    if !contains_ci(&block.text().collect::<String>(), team) {
        return None;
    }
    let table = block.select(&markers.compile(table_css).ok()?).next()?;

    // rank sits in the header link, e.g. "Alaves [SPA D1-9]"
    let ranking = table
        .select(&ANCHORS)
        .next()
        .map(|a| text_of(&a))
        .and_then(|t| parse_rank(&t));

    // FT/HT header cells toggle which block the data rows belong to
    let mut rows = Vec::new();
    let mut in_ft = false;
    for tr in table.select(&ROWS) {
        if tr.value().attr("align") != Some("center") {
            continue;
        }
        if let Some(th) = tr.select(&HEADER_CELLS).next() {
            let label = text_of(&th);
            if label.contains("FT") {
                in_ft = true;
            } else if label.contains("HT") {
                in_ft = false;
            }
            continue;
        }
        if !in_ft {
            continue;
        }
        let cells: Vec<ElementRef<'_>> = tr.select(&CELLS).collect();
        if cells.len() < 7 {
            continue;
        }
        let scope = match text_of(&cells[0]).as_str() {
            "Total" => StandingsScope::Overall,
            "Home" => StandingsScope::Home,
            "Away" => StandingsScope::Away,
            _ => continue,
        };
        let mut nums = [0u32; 6];
        let mut ok = true;
        for (slot, cell) in nums.iter_mut().zip(&cells[1..7]) {
            match text_of(cell).parse() {
                Ok(v) => *slot = v,
                Err(_) => {
                    ok = false;
                    break;
                }
            }
        }
        if !ok {
            continue;
        }
        rows.push(StandingsRow {
            scope,
            played: nums[0],
            won: nums[1],
            drawn: nums[2],
            lost: nums[3],
            goals_for: nums[4],
            goals_against: nums[5],
        });
    }

    Some(TeamStandings {
        team: team.to_string(),
        ranking,
        rows,
    })
}

/// "Alaves [SPA D1-9]" → 9
fn parse_rank(text: &str) -> Option<u32> {
    let open = text.find('[')?;
    let close = text.get(open..)?.find(']')? + open;
    let inside = text.get(open + 1..close)?;
    inside.rsplit('-').next()?.trim().parse().ok()
}
