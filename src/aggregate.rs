//! Aggregation Engine.
//!
//! Pure functions from parsed sections + resolved stats to derived
//! indices. The formulas are identical for every depth mode; modes only
//! select which indices run and how deep the upstream windows are, via
//! [`ModePlan`].

use std::collections::HashMap;

use crate::handicap::{Favored, Handicap};
use crate::types::{
    CoverOutcome, DepthMode, FavoriteShift, FormSummary, H2HDirect, H2HSummary, IndirectRow,
    IndirectVerdict, MarketComparison, PrecedentComparison, RecentForm, RecentMatchRecord, Score,
    SidePair, StudyHeader, TeamStandings,
};

/// Which aggregation steps run for a mode, and with what input depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePlan {
    pub recent_window: usize,
    pub h2h_window: usize,
    /// Most-recent ids per side handed to the stat resolver.
    pub resolve_recent_per_side: usize,
    pub resolve_h2h: bool,
    pub recent_summaries: bool,
    pub h2h_direct: bool,
    pub h2h_indirect: bool,
    pub standings: bool,
    pub narrative: bool,
}

impl DepthMode {
    pub fn plan(&self) -> ModePlan {
        match self {
            DepthMode::Ultra => ModePlan {
                recent_window: 0,
                h2h_window: 0,
                resolve_recent_per_side: 0,
                resolve_h2h: false,
                recent_summaries: false,
                h2h_direct: false,
                h2h_indirect: false,
                standings: false,
                narrative: false,
            },
            DepthMode::Ligero => ModePlan {
                recent_window: 2,
                h2h_window: 0,
                resolve_recent_per_side: 2,
                resolve_h2h: false,
                recent_summaries: true,
                h2h_direct: false,
                h2h_indirect: false,
                standings: false,
                narrative: false,
            },
            DepthMode::Completo => ModePlan {
                recent_window: 8,
                h2h_window: 8,
                resolve_recent_per_side: 2,
                resolve_h2h: true,
                recent_summaries: true,
                h2h_direct: true,
                h2h_indirect: true,
                standings: true,
                narrative: true,
            },
        }
    }
}

pub(crate) fn eq_ci(a: &str, b: &str) -> bool {
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/* ---------- recent form ---------- */

pub fn form_summary(records: &[RecentMatchRecord]) -> FormSummary {
    let mut out = FormSummary::default();
    for rec in records {
        let Some(margin) = rec.subject_margin() else {
            continue;
        };
        out.total += 1;
        if margin > 0 {
            out.wins += 1;
        } else if margin < 0 {
            out.losses += 1;
        } else {
            out.draws += 1;
        }
    }
    out
}

pub fn recent_form(records: Vec<RecentMatchRecord>) -> RecentForm {
    RecentForm {
        summary: form_summary(&records),
        matches: records,
    }
}

/* ---------- cover rules ---------- */

/// Replay the current handicap line against a historical final score.
/// A zero line is draw-no-bet staked on the study's home side; otherwise
/// the favorite's winning margin is measured against the line magnitude
/// with a ±0.05 push band.
pub fn handicap_cover(
    score: Score,
    line: Handicap,
    favorite: Option<&str>,
    hist_home: &str,
    hist_away: &str,
    main_home: &str,
) -> CoverOutcome {
    if line.line == 0.0 {
        let margin = if eq_ci(main_home, hist_home) {
            score.margin()
        } else {
            -score.margin()
        };
        return if margin > 0 {
            CoverOutcome::Covered
        } else if margin < 0 {
            CoverOutcome::NotCovered
        } else {
            CoverOutcome::Push
        };
    }
    let Some(fav) = favorite else {
        return CoverOutcome::Unknown;
    };
    let fav_margin = if eq_ci(fav, hist_home) {
        score.margin()
    } else if eq_ci(fav, hist_away) {
        -score.margin()
    } else {
        return CoverOutcome::Unknown;
    };
    let diff = fav_margin as f64 - line.line.abs();
    if diff > 0.05 {
        CoverOutcome::Covered
    } else if diff < -0.05 {
        CoverOutcome::NotCovered
    } else {
        CoverOutcome::Push
    }
}

/// `Covered` reads as Over, `NotCovered` as Under.
pub fn goal_line_cover(score: Score, line: Handicap) -> CoverOutcome {
    let total = score.total() as f64;
    if total > line.line {
        CoverOutcome::Covered
    } else if total < line.line {
        CoverOutcome::NotCovered
    } else {
        CoverOutcome::Push
    }
}

/// Classify how `newer` relates to `older` given each line's team names.
pub fn favorite_shift(
    newer: Handicap,
    newer_home: &str,
    newer_away: &str,
    older: Handicap,
    older_home: &str,
    older_away: &str,
) -> FavoriteShift {
    let fav = |line: Handicap, home: &str, away: &str| -> Option<String> {
        match line.favored() {
            Favored::Home => Some(home.to_string()),
            Favored::Away => Some(away.to_string()),
            Favored::None => None,
        }
    };
    let new_fav = fav(newer, newer_home, newer_away);
    let old_fav = fav(older, older_home, older_away);
    match (new_fav, old_fav) {
        (Some(n), Some(o)) if eq_ci(&n, &o) => {
            let nb = newer.half_bucket().abs();
            let ob = older.half_bucket().abs();
            if nb > ob {
                FavoriteShift::Strengthened
            } else if nb < ob {
                FavoriteShift::Weakened
            } else {
                FavoriteShift::Unchanged
            }
        }
        (Some(_), Some(_)) => FavoriteShift::FavoriteSwapped,
        (Some(_), None) => FavoriteShift::FavoriteSet,
        (None, Some(_)) => FavoriteShift::FavoriteRemoved,
        (None, None) => FavoriteShift::Unchanged,
    }
}

/* ---------- direct H2H ---------- */

fn precedent_comparison(
    meeting: RecentMatchRecord,
    header: &StudyHeader,
) -> PrecedentComparison {
    let current_ah = header.odds.early.ah_line;
    let current_goal = header.odds.early.goal_line;

    let line_delta = match (current_ah, meeting.handicap) {
        (Some(c), Some(h)) => Some(c.half_bucket() - h.half_bucket()),
        _ => None,
    };
    let shift = match (current_ah, meeting.handicap) {
        (Some(c), Some(h)) => Some(favorite_shift(
            c,
            &header.home,
            &header.away,
            h,
            &meeting.home,
            &meeting.away,
        )),
        _ => None,
    };
    let favorite = current_ah.map(|l| l.favored()).and_then(|f| match f {
        Favored::Home => Some(header.home.as_str()),
        Favored::Away => Some(header.away.as_str()),
        Favored::None => None,
    });
    let handicap_cover = match (meeting.score, current_ah) {
        (Some(score), Some(line)) => self::handicap_cover(
            score,
            line,
            favorite,
            &meeting.home,
            &meeting.away,
            &header.home,
        ),
        _ => CoverOutcome::Unknown,
    };
    let goal_line_cover = match (meeting.score, current_goal) {
        (Some(score), Some(line)) => self::goal_line_cover(score, line),
        _ => CoverOutcome::Unknown,
    };

    PrecedentComparison {
        meeting,
        line_delta,
        shift,
        handicap_cover,
        goal_line_cover,
    }
}

/// Tally the direct meetings and replay the two distinguished precedents
/// (same stadium, most recent anywhere) against the current market.
pub fn direct_h2h(meetings: Vec<RecentMatchRecord>, header: &StudyHeader) -> Option<H2HDirect> {
    if meetings.is_empty() {
        return None;
    }
    let mut summary = H2HSummary::default();
    for m in &meetings {
        match m.subject_margin() {
            Some(margin) if margin > 0 => summary.home_wins += 1,
            Some(margin) if margin < 0 => summary.away_wins += 1,
            Some(_) => summary.draws += 1,
            None => {}
        }
    }

    let most_recent_rec = meetings.first().cloned();
    let stadium_rec = meetings
        .iter()
        .find(|m| eq_ci(&m.home, &header.home) && eq_ci(&m.away, &header.away))
        .cloned();
    let same_precedent = match (&stadium_rec, &most_recent_rec) {
        (Some(s), Some(r)) => s.match_id.is_some() && s.match_id == r.match_id,
        _ => false,
    };

    Some(H2HDirect {
        summary,
        same_stadium: stadium_rec.map(|m| precedent_comparison(m, header)),
        most_recent: most_recent_rec.map(|m| precedent_comparison(m, header)),
        same_precedent,
        meetings,
    })
}

/* ---------- indirect H2H ---------- */

/// For each opponent both teams met recently, pair each team's most
/// recent result against it. Rows sort by the most recent of the two
/// meeting dates, descending; ties break on the opponent name.
pub fn indirect_h2h(
    home_recent: &[RecentMatchRecord],
    away_recent: &[RecentMatchRecord],
    limit: usize,
) -> Vec<IndirectRow> {
    let most_recent_per_opponent =
        |records: &[RecentMatchRecord]| -> HashMap<String, RecentMatchRecord> {
            let mut map = HashMap::new();
            for rec in records {
                let key = rec.opponent().to_lowercase();
                if key.is_empty() || key == "?" {
                    continue;
                }
                // records are date-descending; first wins
                map.entry(key).or_insert_with(|| rec.clone());
            }
            map
        };

    let home_map = most_recent_per_opponent(home_recent);
    let away_map = most_recent_per_opponent(away_recent);

    let mut rows = Vec::new();
    for (key, home_meeting) in &home_map {
        let Some(away_meeting) = away_map.get(key) else {
            continue;
        };
        let (Some(home_margin), Some(away_margin)) =
            (home_meeting.subject_margin(), away_meeting.subject_margin())
        else {
            continue;
        };
        let verdict = if home_margin > away_margin {
            IndirectVerdict::HomeBetter
        } else if home_margin < away_margin {
            IndirectVerdict::AwayBetter
        } else {
            IndirectVerdict::Level
        };
        rows.push(IndirectRow {
            opponent: home_meeting.opponent().to_string(),
            home_meeting: home_meeting.clone(),
            away_meeting: away_meeting.clone(),
            home_margin,
            away_margin,
            verdict,
            latest_meeting: home_meeting.date.max(away_meeting.date),
        });
    }

    rows.sort_by(|a, b| {
        b.latest_meeting
            .cmp(&a.latest_meeting)
            .then_with(|| a.opponent.to_lowercase().cmp(&b.opponent.to_lowercase()))
    });
    rows.truncate(limit);
    rows
}

/* ---------- market comparison ---------- */

/// Opening line vs the alternate line from the secondary odds widget.
pub fn market_comparison(header: &StudyHeader) -> MarketComparison {
    let current = header.odds.early.ah_line;
    let alternate = header.odds.live.as_ref().and_then(|l| l.ah_line);
    match (current, alternate) {
        (Some(cur), Some(alt)) => {
            let goal_delta = match (
                header.odds.early.goal_line,
                header.odds.live.as_ref().and_then(|l| l.goal_line),
            ) {
                (Some(cg), Some(ag)) => Some(ag.half_bucket() - cg.half_bucket()),
                _ => None,
            };
            MarketComparison::Compared {
                current: cur,
                alternate: alt,
                delta: alt.half_bucket() - cur.half_bucket(),
                shift: favorite_shift(
                    alt,
                    &header.home,
                    &header.away,
                    cur,
                    &header.home,
                    &header.away,
                ),
                goal_delta,
            }
        }
        (current, _) => MarketComparison::NoComparison { current },
    }
}

/* ---------- narrative ---------- */

/// Dangerous-attack edge of the subject team in one meeting:
/// (own, rival, clearly superior). The ≥5 margin is the site's own
/// threshold for "clearly on top".
pub fn dangerous_attack_edge(rec: &RecentMatchRecord) -> Option<(u32, u32, bool)> {
    let da = rec.progression.as_ref()?.dangerous_attacks?;
    let (own, rival) = match rec.venue {
        crate::types::Venue::Home | crate::types::Venue::Neutral => (da.home, da.away),
        crate::types::Venue::Away => (da.away, da.home),
    };
    Some((own, rival, own >= rival + 5))
}

pub fn narrative_fragments(
    header: &StudyHeader,
    recent_form: Option<&SidePair<RecentForm>>,
    h2h_direct: Option<&H2HDirect>,
    h2h_indirect: Option<&[IndirectRow]>,
    market: &MarketComparison,
    standings: Option<&SidePair<TeamStandings>>,
) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(form) = recent_form {
        for (team, side) in [(&header.home, &form.home), (&header.away, &form.away)] {
            let s = side.summary;
            if s.total > 0 {
                out.push(format!(
                    "{team} took {}W {}D {}L from their last {}.",
                    s.wins, s.draws, s.losses, s.total
                ));
            }
        }
    }

    if let Some(st) = standings {
        for side in [&st.home, &st.away] {
            if let Some(rank) = side.ranking {
                out.push(format!("{} sit {rank} in the table.", side.team));
            }
        }
    }

    if let Some(direct) = h2h_direct {
        let s = direct.summary;
        out.push(format!(
            "Head-to-head: {} {} wins, {} {} wins, {} drawn.",
            header.home, s.home_wins, header.away, s.away_wins, s.draws
        ));
        if let Some(stadium) = &direct.same_stadium {
            if let Some(score) = stadium.meeting.score {
                let verdict = match stadium.handicap_cover {
                    CoverOutcome::Covered => "would have covered the current line",
                    CoverOutcome::NotCovered => "would not have covered the current line",
                    CoverOutcome::Push => "would have pushed on the current line",
                    CoverOutcome::Unknown => "cannot be replayed on the current line",
                };
                out.push(format!("The precedent at this ground ({score}) {verdict}."));
            }
        }
    }

    if let Some(rows) = h2h_indirect {
        if !rows.is_empty() {
            let home_better = rows
                .iter()
                .filter(|r| r.verdict == IndirectVerdict::HomeBetter)
                .count();
            let away_better = rows
                .iter()
                .filter(|r| r.verdict == IndirectVerdict::AwayBetter)
                .count();
            let leader = if home_better > away_better {
                Some((&header.home, home_better))
            } else if away_better > home_better {
                Some((&header.away, away_better))
            } else {
                None
            };
            match leader {
                Some((team, n)) => out.push(format!(
                    "Common opponents favour {team} ({n} of {}).",
                    rows.len()
                )),
                None => out.push(format!(
                    "Common opponents split evenly across {} comparisons.",
                    rows.len()
                )),
            }
        }
    }

    if let MarketComparison::Compared {
        current,
        alternate,
        shift,
        ..
    } = market
    {
        let movement = match shift {
            FavoriteShift::Strengthened => "the favorite has strengthened",
            FavoriteShift::Weakened => "the favorite has weakened",
            FavoriteShift::Unchanged => "the market is unmoved",
            FavoriteShift::FavoriteSwapped => "the favorite has swapped sides",
            FavoriteShift::FavoriteSet => "the market has picked a favorite",
            FavoriteShift::FavoriteRemoved => "the market no longer has a favorite",
        };
        out.push(format!(
            "Market: opening {current} against alternate {alternate}; {movement}."
        ));
    }

    // dangerous-attack superiority of the current favorite, last time out
    if let (Some(form), Some(fav)) = (
        recent_form,
        header.odds.early.ah_line.and_then(|l| match l.favored() {
            Favored::Home => Some((&header.home, true)),
            Favored::Away => Some((&header.away, false)),
            Favored::None => None,
        }),
    ) {
        let (name, is_home) = fav;
        let side = if is_home { &form.home } else { &form.away };
        if let Some((own, rival, true)) = side.matches.first().and_then(dangerous_attack_edge) {
            out.push(format!(
                "{name} were clearly on top on dangerous attacks last time out ({own}-{rival})."
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketSnapshot, MatchId, OddsLine, Venue};
    use chrono::NaiveDate;

    fn rec(
        id: &str,
        date: (i32, u32, u32),
        home: &str,
        away: &str,
        venue: Venue,
        score: &str,
        ah: Option<&str>,
    ) -> RecentMatchRecord {
        RecentMatchRecord {
            match_id: Some(MatchId(id.into())),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            home: home.into(),
            away: away.into(),
            venue,
            score: Score::parse(score),
            handicap: ah.and_then(Handicap::parse),
            league_id: None,
            progression: None,
        }
    }

    fn header_with(ah: Option<&str>, goal: Option<&str>, live_ah: Option<&str>) -> StudyHeader {
        StudyHeader {
            match_id: MatchId("1".into()),
            home: "Alaves".into(),
            away: "Getafe".into(),
            league: None,
            league_id: None,
            kickoff: None,
            final_score: None,
            odds: MarketSnapshot {
                early: OddsLine {
                    ah_line: ah.and_then(Handicap::parse),
                    goal_line: goal.and_then(Handicap::parse),
                    ..OddsLine::default()
                },
                live: live_ah.map(|l| OddsLine {
                    ah_line: Handicap::parse(l),
                    ..OddsLine::default()
                }),
            },
        }
    }

    #[test]
    fn plan_table_matches_the_modes() {
        let ultra = DepthMode::Ultra.plan();
        assert_eq!(ultra.resolve_recent_per_side, 0);
        assert!(!ultra.resolve_h2h);
        assert_eq!(ultra.recent_window, 0);

        let ligero = DepthMode::Ligero.plan();
        assert!(ligero.recent_summaries);
        assert!(!ligero.h2h_indirect);
        assert_eq!(ligero.recent_window, 2);

        let completo = DepthMode::Completo.plan();
        assert!(completo.h2h_indirect && completo.standings && completo.narrative);
        assert_eq!(completo.recent_window, 8);
    }

    #[test]
    fn form_summary_is_venue_aware() {
        let records = vec![
            rec("1", (2025, 2, 23), "A", "B", Venue::Home, "2-0", None),
            rec("2", (2025, 2, 16), "C", "A", Venue::Away, "2-0", None),
            rec("3", (2025, 2, 9), "D", "A", Venue::Away, "1-2", None),
            rec("4", (2025, 2, 2), "A", "E", Venue::Home, "1-1", None),
        ];
        let s = form_summary(&records);
        assert_eq!((s.wins, s.draws, s.losses, s.total), (2, 1, 1, 4));
    }

    #[test]
    fn dnb_cover_follows_the_main_home_side() {
        let line = Handicap::from_line(0.0);
        let cover = handicap_cover(
            Score { home: 2, away: 1 },
            line,
            None,
            "Alaves",
            "Getafe",
            "Alaves",
        );
        assert_eq!(cover, CoverOutcome::Covered);
        // same result, but our home side played away in the precedent
        let cover = handicap_cover(
            Score { home: 2, away: 1 },
            line,
            None,
            "Getafe",
            "Alaves",
            "Alaves",
        );
        assert_eq!(cover, CoverOutcome::NotCovered);
        let cover = handicap_cover(
            Score { home: 1, away: 1 },
            line,
            None,
            "Alaves",
            "Getafe",
            "Alaves",
        );
        assert_eq!(cover, CoverOutcome::Push);
    }

    #[test]
    fn favored_margin_is_measured_against_the_line() {
        let line = Handicap::parse("-0.5").unwrap(); // away favored
        let covered = handicap_cover(
            Score { home: 0, away: 1 },
            line,
            Some("Getafe"),
            "Alaves",
            "Getafe",
            "Alaves",
        );
        assert_eq!(covered, CoverOutcome::Covered);
        let not = handicap_cover(
            Score { home: 1, away: 1 },
            line,
            Some("Getafe"),
            "Alaves",
            "Getafe",
            "Alaves",
        );
        assert_eq!(not, CoverOutcome::NotCovered);
        // favorite absent from the precedent: no verdict
        let unknown = handicap_cover(
            Score { home: 1, away: 1 },
            line,
            Some("Sevilla"),
            "Alaves",
            "Getafe",
            "Alaves",
        );
        assert_eq!(unknown, CoverOutcome::Unknown);
    }

    #[test]
    fn whole_line_exact_margin_is_a_push() {
        let line = Handicap::parse("1").unwrap();
        let push = handicap_cover(
            Score { home: 2, away: 1 },
            line,
            Some("Alaves"),
            "Alaves",
            "Getafe",
            "Alaves",
        );
        assert_eq!(push, CoverOutcome::Push);
    }

    #[test]
    fn goal_line_cover_reads_over_under() {
        let line = Handicap::parse("2.5").unwrap();
        assert_eq!(
            goal_line_cover(Score { home: 2, away: 1 }, line),
            CoverOutcome::Covered
        );
        assert_eq!(
            goal_line_cover(Score { home: 1, away: 1 }, line),
            CoverOutcome::NotCovered
        );
        assert_eq!(
            goal_line_cover(Score { home: 1, away: 1 }, Handicap::parse("2").unwrap()),
            CoverOutcome::Push
        );
    }

    #[test]
    fn favorite_shift_covers_all_transitions() {
        let h = |s: &str| Handicap::parse(s).unwrap();
        // same favorite, bigger bucket
        assert_eq!(
            favorite_shift(h("1"), "A", "B", h("0.5"), "A", "B"),
            FavoriteShift::Strengthened
        );
        assert_eq!(
            favorite_shift(h("0.5"), "A", "B", h("1"), "A", "B"),
            FavoriteShift::Weakened
        );
        // quarter and half of the same bucket: unchanged
        assert_eq!(
            favorite_shift(h("0.5"), "A", "B", h("0/0.5"), "A", "B"),
            FavoriteShift::Unchanged
        );
        assert_eq!(
            favorite_shift(h("0.5"), "A", "B", h("-0.5"), "A", "B"),
            FavoriteShift::FavoriteSwapped
        );
        assert_eq!(
            favorite_shift(h("0.5"), "A", "B", h("0"), "A", "B"),
            FavoriteShift::FavoriteSet
        );
        assert_eq!(
            favorite_shift(h("0"), "A", "B", h("0.5"), "A", "B"),
            FavoriteShift::FavoriteRemoved
        );
        // same favorite through swapped venues
        assert_eq!(
            favorite_shift(h("0.5"), "A", "B", h("-0.5"), "B", "A"),
            FavoriteShift::Unchanged
        );
    }

    #[test]
    fn indirect_rows_sort_by_latest_meeting_then_opponent() {
        let home = vec![
            rec("1", (2025, 1, 10), "Us", "Zeta", Venue::Home, "2-0", None),
            rec("2", (2025, 1, 3), "Us", "Alpha", Venue::Home, "1-0", None),
            rec("3", (2025, 1, 1), "Us", "Mid", Venue::Home, "0-0", None),
        ];
        let away = vec![
            rec("4", (2025, 1, 10), "Zeta", "Them", Venue::Away, "1-1", None),
            rec("5", (2025, 1, 10), "Alpha", "Them", Venue::Away, "0-2", None),
            rec("6", (2025, 1, 2), "Mid", "Them", Venue::Away, "3-0", None),
        ];
        let rows = indirect_h2h(&home, &away, 10);
        assert_eq!(rows.len(), 3);
        // Alpha and Zeta tie on 2025-01-10; Alpha wins the name tiebreak
        assert_eq!(rows[0].opponent, "Alpha");
        assert_eq!(rows[1].opponent, "Zeta");
        assert_eq!(rows[2].opponent, "Mid");
        assert_eq!(rows[0].verdict, IndirectVerdict::AwayBetter);
        assert_eq!(rows[1].verdict, IndirectVerdict::HomeBetter);
        assert_eq!(rows[2].verdict, IndirectVerdict::HomeBetter);
    }

    #[test]
    fn indirect_uses_each_sides_most_recent_meeting() {
        let home = vec![
            rec("1", (2025, 2, 1), "Us", "Zeta", Venue::Home, "0-1", None),
            rec("2", (2025, 1, 1), "Us", "Zeta", Venue::Home, "5-0", None),
        ];
        let away = vec![rec(
            "3",
            (2025, 1, 15),
            "Zeta",
            "Them",
            Venue::Away,
            "1-1",
            None,
        )];
        let rows = indirect_h2h(&home, &away, 10);
        assert_eq!(rows.len(), 1);
        // the 5-0 is older and must not be picked
        assert_eq!(rows[0].home_margin, -1);
        assert_eq!(rows[0].verdict, IndirectVerdict::AwayBetter);
    }

    #[test]
    fn market_comparison_requires_an_alternate_line() {
        let header = header_with(Some("-0.5"), Some("2.5"), None);
        assert_eq!(
            market_comparison(&header),
            MarketComparison::NoComparison {
                current: Handicap::parse("-0.5")
            }
        );

        let header = header_with(None, None, None);
        assert_eq!(
            market_comparison(&header),
            MarketComparison::NoComparison { current: None }
        );
    }

    #[test]
    fn market_comparison_reports_normalized_delta() {
        let header = header_with(Some("0/0.5"), None, Some("1"));
        match market_comparison(&header) {
            MarketComparison::Compared { delta, shift, .. } => {
                // 0.25 buckets to 0.5; alternate 1.0 → delta 0.5
                assert_eq!(delta, 0.5);
                assert_eq!(shift, FavoriteShift::Strengthened);
            }
            other => panic!("expected Compared, got {other:?}"),
        }
    }

    #[test]
    fn direct_h2h_distinguishes_the_stadium_precedent() {
        let header = header_with(Some("0.5"), Some("2.5"), None);
        let meetings = vec![
            // most recent was at the other ground
            rec(
                "10",
                (2025, 2, 1),
                "Getafe",
                "Alaves",
                Venue::Away,
                "2-2",
                Some("0"),
            ),
            rec(
                "11",
                (2024, 9, 1),
                "Alaves",
                "Getafe",
                Venue::Home,
                "2-0",
                Some("0.5"),
            ),
        ];
        let direct = direct_h2h(meetings, &header).unwrap();
        assert_eq!(direct.summary.home_wins, 1);
        assert_eq!(direct.summary.draws, 1);
        assert!(!direct.same_precedent);
        let stadium = direct.same_stadium.unwrap();
        assert_eq!(stadium.meeting.match_id, Some(MatchId("11".into())));
        assert_eq!(stadium.handicap_cover, CoverOutcome::Covered);
        assert_eq!(stadium.line_delta, Some(0.0));
        // 2-0 against a 2.5 goal line: under
        assert_eq!(stadium.goal_line_cover, CoverOutcome::NotCovered);
        let recent = direct.most_recent.unwrap();
        assert_eq!(recent.meeting.match_id, Some(MatchId("10".into())));
    }

    #[test]
    fn narrative_mentions_form_market_and_common_opponents() {
        let header = header_with(Some("0.5"), None, Some("1"));
        let form = SidePair {
            home: recent_form(vec![rec(
                "1",
                (2025, 2, 1),
                "Alaves",
                "X",
                Venue::Home,
                "1-0",
                None,
            )]),
            away: recent_form(vec![]),
        };
        let market = market_comparison(&header);
        let rows = vec![];
        let lines = narrative_fragments(&header, Some(&form), None, Some(&rows), &market, None);
        assert!(lines.iter().any(|l| l.contains("Alaves took 1W")));
        assert!(lines.iter().any(|l| l.contains("strengthened")));
    }
}
