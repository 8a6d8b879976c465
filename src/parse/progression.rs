//! Progression statistics from the per-match live page.

use scraper::{ElementRef, Html};

use super::text_of;
use crate::markers::{IMAGES, LIST_ITEMS, MarkerTable};
use crate::types::{ProgressionStats, StatPair};

/// Parse the tech block of a progression page. Returns `None` when the
/// page carries no usable stats at all, so the resolver can record the
/// lookup as failed rather than store an empty shell.
pub fn parse_progression(html: &str, markers: &MarkerTable) -> Option<ProgressionStats> {
    let doc = Html::parse_document(html);
    let mut stats = ProgressionStats::default();

    if let (Ok(panel_sel), Ok(list_sel), Ok(title_sel), Ok(value_sel)) = (
        markers.compile(&markers.tech_stats_panel),
        markers.compile(&markers.tech_stats_list),
        markers.compile(&markers.tech_stat_title),
        markers.compile(&markers.tech_stat_value),
    ) {
        if let Some(list) = doc
            .select(&panel_sel)
            .next()
            .and_then(|panel| panel.select(&list_sel).next())
        {
            for li in list.select(&LIST_ITEMS) {
                let Some(title) = li.select(&title_sel).next().map(|t| text_of(&t)) else {
                    continue;
                };
                let values: Vec<u32> = li
                    .select(&value_sel)
                    .filter_map(|v| text_of(&v).parse().ok())
                    .collect();
                if values.len() != 2 {
                    continue;
                }
                let pair = StatPair {
                    home: values[0],
                    away: values[1],
                };
                match title.as_str() {
                    "Corners" => stats.corners = Some(pair),
                    "Shots" => stats.shots = Some(pair),
                    "Shots on Goal" => stats.shots_on_goal = Some(pair),
                    "Attacks" => stats.attacks = Some(pair),
                    "Dangerous Attacks" => stats.dangerous_attacks = Some(pair),
                    "Red Cards" => stats.red_cards = Some(pair),
                    _ => {}
                }
            }
        }
    }

    // Red cards often live only in the events timeline. Cards aligned
    // right belong to the home side, left to the away side.
    if stats.red_cards.is_none() {
        if let Ok(events_sel) = markers.compile(&markers.events_table) {
            if let Some(table) = doc.select(&events_sel).next() {
                let mut pair = StatPair::default();
                for img in table.select(&IMAGES) {
                    if img.value().attr("alt") != Some(markers.red_card_alt.as_str()) {
                        continue;
                    }
                    let Some(td) = img
                        .ancestors()
                        .filter_map(ElementRef::wrap)
                        .find(|e| e.value().name() == "td")
                    else {
                        continue;
                    };
                    let style = td.value().attr("style").unwrap_or_default();
                    if style.contains("text-align: right") {
                        pair.home += 1;
                    } else if style.contains("text-align: left") {
                        pair.away += 1;
                    }
                }
                stats.red_cards = Some(pair);
            }
        }
    }

    if stats.is_empty() {
        None
    } else {
        Some(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat_li(title: &str, home: u32, away: u32) -> String {
        format!(
            r#"<li><span class="stat-c">{home}</span>
                <span class="stat-title">{title}</span>
                <span class="stat-c">{away}</span></li>"#
        )
    }

    #[test]
    fn parses_the_fixed_stat_set() {
        let html = format!(
            r#"<html><body><div id="teamTechDiv_detail"><ul class="stat">
                {}{}{}{}{}
            </ul></div></body></html>"#,
            stat_li("Corners", 7, 3),
            stat_li("Shots", 15, 8),
            stat_li("Shots on Goal", 6, 2),
            stat_li("Attacks", 102, 88),
            stat_li("Dangerous Attacks", 54, 31),
        );
        let stats = parse_progression(&html, &MarkerTable::default()).unwrap();
        assert_eq!(stats.corners, Some(StatPair { home: 7, away: 3 }));
        assert_eq!(stats.shots, Some(StatPair { home: 15, away: 8 }));
        assert_eq!(stats.shots_on_goal, Some(StatPair { home: 6, away: 2 }));
        assert_eq!(
            stats.dangerous_attacks,
            Some(StatPair { home: 54, away: 31 })
        );
        assert_eq!(stats.red_cards, None);
    }

    #[test]
    fn red_cards_fall_back_to_the_events_timeline() {
        let html = r#"<html><body>
            <div id="teamTechDiv_detail"><ul class="stat">
                <li><span class="stat-c">1</span>
                    <span class="stat-title">Corners</span>
                    <span class="stat-c">2</span></li>
            </ul></div>
            <table id="eventsTable">
                <tr><td style="text-align: right;"><img alt="Red Card"/></td></tr>
                <tr><td style="text-align: left;"><img alt="Red Card"/></td></tr>
                <tr><td style="text-align: left;"><img alt="Goal"/></td></tr>
            </table>
        </body></html>"#;
        let stats = parse_progression(html, &MarkerTable::default()).unwrap();
        assert_eq!(stats.red_cards, Some(StatPair { home: 1, away: 1 }));
    }

    #[test]
    fn page_without_stats_is_none() {
        assert!(parse_progression("<html><body></body></html>", &MarkerTable::default()).is_none());
    }
}
