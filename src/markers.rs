//! Section markers for the supported page family.
//!
//! Layout drift on the source site is a data change, not a code change:
//! every site-skin selector the parsers rely on lives in [`MarkerTable`],
//! which is serde-serializable and can be swapped from a JSON file. Only
//! table-grammar selectors (`td`, `tr`, `a`, ...) are fixed statics.

use once_cell::sync::Lazy;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EstudioError, Result};

/// Marker set shipped with this build.
pub const MARKERS_VERSION: &str = "nowgoal-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerTable {
    pub version: String,

    /// Element whose presence means the page core finished loading.
    pub ready_marker: String,
    /// Handicap-provider dropdowns, one per history table.
    pub provider_selects: Vec<String>,

    /// Header bits.
    pub info_script_needle: String,
    pub final_score_panel: String,
    pub final_score_cells: String,

    /// Odds widget rows: opening line and the secondary (alternate) line.
    pub early_odds_rows: String,
    pub live_odds_rows: String,

    /// History tables and their rows (rows carry the historical match id
    /// in an `index` attribute and the league id in `name`).
    pub home_recent_table: String,
    pub home_recent_rows: String,
    pub away_recent_table: String,
    pub away_recent_rows: String,
    pub h2h_table: String,
    pub h2h_rows: String,

    /// Row-level structural markers.
    pub row_date: String,
    pub home_score_span: String,
    pub away_score_span: String,
    pub h2h_score_span: String,

    /// Standings panel.
    pub standings_panel: String,
    pub standings_home_block: String,
    pub standings_away_block: String,
    pub standings_home_table: String,
    pub standings_away_table: String,

    /// Over/under split widget.
    pub ou_bar: String,
    pub ou_group: String,
    pub ou_group_needle: String,
    pub ou_title: String,
    pub ou_value: String,

    /// Progression-stats page.
    pub tech_stats_panel: String,
    pub tech_stats_list: String,
    pub tech_stat_title: String,
    pub tech_stat_value: String,
    pub events_table: String,
    pub red_card_alt: String,
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self {
            version: MARKERS_VERSION.to_string(),
            ready_marker: "table#table_v1".into(),
            provider_selects: vec![
                "#hSelect_1".into(),
                "#hSelect_2".into(),
                "#hSelect_3".into(),
            ],
            info_script_needle: "var _matchInfo".into(),
            final_score_panel: "div#mScore".into(),
            final_score_cells: "div.end div.score".into(),
            early_odds_rows: "tr#tr_o_1_8[name='earlyOdds'], tr#tr_o_1_31[name='earlyOdds']"
                .into(),
            live_odds_rows: "tr#tr_o_1_8[name='oddsData'], tr#tr_o_1_31[name='oddsData']".into(),
            home_recent_table: "table#table_v1".into(),
            home_recent_rows: r#"tr[id^="tr1_"]"#.into(),
            away_recent_table: "table#table_v2".into(),
            away_recent_rows: r#"tr[id^="tr2_"]"#.into(),
            h2h_table: "table#table_v3".into(),
            h2h_rows: r#"tr[id^="tr3_"]"#.into(),
            row_date: r#"span[name="timeData"]"#.into(),
            home_score_span: "span.fscore_1".into(),
            away_score_span: "span.fscore_2".into(),
            h2h_score_span: "span.fscore_3".into(),
            standings_panel: "div#porletP4".into(),
            standings_home_block: "div.home-div".into(),
            standings_away_block: "div.guest-div".into(),
            standings_home_table: "table.team-table-home".into(),
            standings_away_table: "table.team-table-guest".into(),
            ou_bar: "ul.y-bar".into(),
            ou_group: "li.group".into(),
            ou_group_needle: "Over/Under Odds".into(),
            ou_title: "div.tit span".into(),
            ou_value: "span.value".into(),
            tech_stats_panel: "div#teamTechDiv_detail".into(),
            tech_stats_list: "ul.stat".into(),
            tech_stat_title: "span.stat-title".into(),
            tech_stat_value: "span.stat-c".into(),
            events_table: "table#eventsTable".into(),
            red_card_alt: "Red Card".into(),
        }
    }
}

impl MarkerTable {
    /// Load a replacement marker set, e.g. after the site shifts layout.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Compile one marker into a selector. Bad selector text in a swapped
    /// marker file surfaces as a parse warning, not a panic.
    pub fn compile(&self, css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|_| EstudioError::Other(format!("invalid selector: {css}")))
    }
}

/* Table-grammar selectors: part of HTML itself, never site skin. */

pub static CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid td selector"));

pub static HEADER_CELLS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th").expect("valid th selector"));

pub static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid tr selector"));

pub static ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("valid anchor selector"));

pub static SCRIPTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("valid script selector"));

pub static IMAGES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("valid img selector"));

pub static LIST_ITEMS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li").expect("valid li selector"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_markers_all_compile() {
        let m = MarkerTable::default();
        for css in [
            &m.ready_marker,
            &m.final_score_panel,
            &m.final_score_cells,
            &m.early_odds_rows,
            &m.live_odds_rows,
            &m.home_recent_table,
            &m.home_recent_rows,
            &m.away_recent_table,
            &m.away_recent_rows,
            &m.h2h_table,
            &m.h2h_rows,
            &m.row_date,
            &m.home_score_span,
            &m.away_score_span,
            &m.h2h_score_span,
            &m.standings_panel,
            &m.standings_home_block,
            &m.standings_away_block,
            &m.standings_home_table,
            &m.standings_away_table,
            &m.ou_bar,
            &m.ou_group,
            &m.ou_title,
            &m.ou_value,
            &m.tech_stats_panel,
            &m.tech_stats_list,
            &m.tech_stat_title,
            &m.tech_stat_value,
            &m.events_table,
        ] {
            assert!(m.compile(css).is_ok(), "marker does not compile: {css}");
        }
        for css in &m.provider_selects {
            assert!(m.compile(css).is_ok());
        }
    }

    #[test]
    fn marker_table_round_trips_through_json() {
        let m = MarkerTable::default();
        let json = serde_json::to_string(&m).unwrap();
        let back: MarkerTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, MARKERS_VERSION);
        assert_eq!(back.h2h_table, m.h2h_table);
    }
}
