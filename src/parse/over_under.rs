//! Over/under split widget under each recent-form table.

use scraper::Html;

use super::text_of;
use crate::markers::MarkerTable;
use crate::types::{OverUnderSplit, SidePair};

pub(crate) fn parse_over_under(
    doc: &Html,
    markers: &MarkerTable,
) -> Option<SidePair<OverUnderSplit>> {
    let home = parse_side(doc, markers, &markers.home_recent_table);
    let away = parse_side(doc, markers, &markers.away_recent_table);
    match (home, away) {
        (Some(h), Some(a)) => Some(SidePair { home: h, away: a }),
        _ => None,
    }
}

fn parse_side(doc: &Html, markers: &MarkerTable, table_css: &str) -> Option<OverUnderSplit> {
    let table = doc.select(&markers.compile(table_css).ok()?).next()?;
    let bar = table.select(&markers.compile(&markers.ou_bar).ok()?).next()?;
    let group_sel = markers.compile(&markers.ou_group).ok()?;
    let group = bar
        .select(&group_sel)
        .find(|g| g.text().collect::<String>().contains(&markers.ou_group_needle))?;

    // sample size from the title, "(12 games)"
    let title_sel = markers.compile(&markers.ou_title).ok()?;
    let total = group
        .select(&title_sel)
        .next()
        .map(|e| text_of(&e))
        .and_then(|t| parse_games_count(&t))
        .unwrap_or(0);

    let value_sel = markers.compile(&markers.ou_value).ok()?;
    let values: Vec<f64> = group
        .select(&value_sel)
        .filter_map(|v| text_of(&v).trim_end_matches('%').trim().parse().ok())
        .collect();
    if values.len() != 3 {
        return None;
    }
    Some(OverUnderSplit {
        over_pct: values[0],
        push_pct: values[1],
        under_pct: values[2],
        total,
    })
}

fn parse_games_count(text: &str) -> Option<u32> {
    let open = text.find('(')?;
    let digits: String = text
        .get(open + 1..)?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side_html(table_id: &str, over: &str, push: &str, under: &str) -> String {
        format!(
            r#"<table id="{table_id}"><tr><td>
                <ul class="y-bar">
                    <li class="group">
                        <div class="tit"><span>Over/Under Odds(12 games)</span></div>
                        <span class="value">{over}%</span>
                        <span class="value">{push}%</span>
                        <span class="value">{under}%</span>
                    </li>
                </ul>
            </td></tr></table>"#
        )
    }

    #[test]
    fn parses_both_sides() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            side_html("table_v1", "58", "8", "34"),
            side_html("table_v2", "58", "8", "34"),
        );
        let doc = Html::parse_document(&html);
        let pair = parse_over_under(&doc, &MarkerTable::default()).unwrap();
        assert_eq!(pair.home.over_pct, 58.0);
        assert_eq!(pair.home.push_pct, 8.0);
        assert_eq!(pair.home.under_pct, 34.0);
        assert_eq!(pair.home.total, 12);
    }

    #[test]
    fn one_missing_widget_means_no_section() {
        let html = format!(
            "<html><body>{}</body></html>",
            side_html("table_v1", "58", "8", "34"),
        );
        let doc = Html::parse_document(&html);
        assert!(parse_over_under(&doc, &MarkerTable::default()).is_none());
    }

    #[test]
    fn games_count_parses_from_title() {
        assert_eq!(parse_games_count("Over/Under Odds(7 games)"), Some(7));
        assert_eq!(parse_games_count("no parens"), None);
    }
}
