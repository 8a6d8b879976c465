use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EstudioError, Result};
use crate::handicap::Handicap;

/// Opaque key for one match on the source site. The same key space covers
/// the primary match and every historical match referenced in its tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(pub String);

impl MatchId {
    /// Validate raw user/markup input: the site keys matches numerically.
    pub fn parse(raw: &str) -> Result<Self> {
        let t = raw.trim();
        if t.is_empty() || !t.chars().all(|c| c.is_ascii_digit()) {
            return Err(EstudioError::InvalidMatchId(raw.to_string()));
        }
        Ok(MatchId(t.to_string()))
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Depth of the aggregation pipeline for one study request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    /// Header + market comparison only; no historical lookups.
    Ultra,
    /// Adds recent-performance summaries.
    Ligero,
    /// Full study: recent form, H2H direct + indirect, standings, narrative.
    #[default]
    Completo,
}

impl fmt::Display for DepthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DepthMode::Ultra => "ultra",
            DepthMode::Ligero => "ligero",
            DepthMode::Completo => "completo",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    /// Accepts "2-1" and "2:1" (with optional spaces).
    pub fn parse(text: &str) -> Option<Self> {
        let t = text.trim();
        let (h, a) = t.split_once(['-', ':'])?;
        Some(Score {
            home: h.trim().parse().ok()?,
            away: a.trim().parse().ok()?,
        })
    }

    pub fn total(&self) -> u32 {
        self.home + self.away
    }

    /// Goal margin from the home side's perspective.
    pub fn margin(&self) -> i32 {
        self.home as i32 - self.away as i32
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// Venue of a historical meeting from the subject team's perspective.
/// The source markup never marks neutral grounds; `Neutral` exists for
/// completeness of the model but parsers only emit `Home`/`Away`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Home,
    Away,
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatPair {
    pub home: u32,
    pub away: u32,
}

/// Per-match progression statistics from the secondary endpoint.
/// Absent stats stay `None`; they are never zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionStats {
    pub corners: Option<StatPair>,
    pub shots: Option<StatPair>,
    pub shots_on_goal: Option<StatPair>,
    pub attacks: Option<StatPair>,
    pub dangerous_attacks: Option<StatPair>,
    pub red_cards: Option<StatPair>,
}

impl ProgressionStats {
    pub fn is_empty(&self) -> bool {
        self.corners.is_none()
            && self.shots.is_none()
            && self.shots_on_goal.is_none()
            && self.attacks.is_none()
            && self.dangerous_attacks.is_none()
            && self.red_cards.is_none()
    }
}

/// One historical match row from a recent-form or H2H table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentMatchRecord {
    pub match_id: Option<MatchId>,
    pub date: Option<NaiveDate>,
    pub home: String,
    pub away: String,
    /// Subject team's venue in this meeting.
    pub venue: Venue,
    pub score: Option<Score>,
    /// Line at kickoff, as captured in the row.
    pub handicap: Option<Handicap>,
    pub league_id: Option<String>,
    /// Filled by the stat resolver; `None` when the lookup failed or the
    /// mode skipped resolution.
    pub progression: Option<ProgressionStats>,
}

impl RecentMatchRecord {
    /// Goal margin from the subject team's perspective.
    pub fn subject_margin(&self) -> Option<i32> {
        let s = self.score?;
        Some(match self.venue {
            Venue::Home | Venue::Neutral => s.margin(),
            Venue::Away => -s.margin(),
        })
    }

    /// The non-subject side of this meeting.
    pub fn opponent(&self) -> &str {
        match self.venue {
            Venue::Home | Venue::Neutral => &self.away,
            Venue::Away => &self.home,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidePair<T> {
    pub home: T,
    pub away: T,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub total: u32,
}

/// Recent form for one side: the summary plus the rows it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentForm {
    pub summary: FormSummary,
    pub matches: Vec<RecentMatchRecord>,
}

/// Outcome of replaying a line against a known final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverOutcome {
    Covered,
    NotCovered,
    Push,
    Unknown,
}

/// How the current market relates to a historical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteShift {
    /// Same favorite, larger magnitude.
    Strengthened,
    /// Same favorite, smaller magnitude.
    Weakened,
    /// Same favorite, same bucket.
    Unchanged,
    /// The favorite moved from one team to the other.
    FavoriteSwapped,
    /// A favorite appeared where the historical line was level.
    FavoriteSet,
    /// The historical favorite is gone; the line is level now.
    FavoriteRemoved,
}

/// A distinguished H2H precedent replayed against the current market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentComparison {
    pub meeting: RecentMatchRecord,
    /// current bucket − precedent bucket, on the half lattice.
    pub line_delta: Option<f64>,
    pub shift: Option<FavoriteShift>,
    pub handicap_cover: CoverOutcome,
    pub goal_line_cover: CoverOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct H2HSummary {
    pub home_wins: u32,
    pub away_wins: u32,
    pub draws: u32,
}

/// Direct meeting history between exactly the two teams of the study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2HDirect {
    pub summary: H2HSummary,
    pub meetings: Vec<RecentMatchRecord>,
    /// Most recent meeting at the current home side's ground.
    pub same_stadium: Option<PrecedentComparison>,
    /// Most recent meeting at any venue.
    pub most_recent: Option<PrecedentComparison>,
    /// True when both precedents are the same match.
    pub same_precedent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndirectVerdict {
    HomeBetter,
    AwayBetter,
    Level,
}

/// One common opponent, with each team's most recent result against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndirectRow {
    pub opponent: String,
    pub home_meeting: RecentMatchRecord,
    pub away_meeting: RecentMatchRecord,
    pub home_margin: i32,
    pub away_margin: i32,
    pub verdict: IndirectVerdict,
    /// Most recent of the two meeting dates; rows sort by it, descending.
    pub latest_meeting: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandingsScope {
    Overall,
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub scope: StandingsScope,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl StandingsRow {
    pub fn goal_diff(&self) -> i32 {
        self.goals_for as i32 - self.goals_against as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStandings {
    pub team: String,
    pub ranking: Option<u32>,
    pub rows: Vec<StandingsRow>,
}

/// Over/push/under split for one side's recent window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverUnderSplit {
    pub over_pct: f64,
    pub push_pct: f64,
    pub under_pct: f64,
    pub total: u32,
}

/// One provider row of the odds widget: handicap triplet + goals triplet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsLine {
    pub ah_home_quote: Option<f64>,
    pub ah_line: Option<Handicap>,
    pub ah_away_quote: Option<f64>,
    pub goals_over_quote: Option<f64>,
    pub goal_line: Option<Handicap>,
    pub goals_under_quote: Option<f64>,
}

/// Opening line plus whatever alternate the secondary widget showed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub early: OddsLine,
    pub live: Option<OddsLine>,
}

/// Identity + kickoff market snapshot of the study's match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyHeader {
    pub match_id: MatchId,
    pub home: String,
    pub away: String,
    pub league: Option<String>,
    pub league_id: Option<String>,
    pub kickoff: Option<NaiveDateTime>,
    pub final_score: Option<Score>,
    pub odds: MarketSnapshot,
}

/// Opening line vs alternate line, normalized to half buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketComparison {
    /// No alternate line was captured (or no line at all).
    NoComparison { current: Option<Handicap> },
    Compared {
        current: Handicap,
        alternate: Handicap,
        /// alternate bucket − current bucket.
        delta: f64,
        shift: FavoriteShift,
        /// alternate goal-line bucket − current goal-line bucket.
        goal_delta: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyMeta {
    pub mode: DepthMode,
    /// True when any section or historical lookup degraded.
    pub partial: bool,
    /// Which slices degraded, e.g. "standings" or "progression:2334972".
    pub partial_sections: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

/// The root aggregate handed to the rendering layer. Immutable once
/// assembled; identified by `(match_id, meta.mode)`. Optional sections
/// serialize as explicit `null`, never by omission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDocument {
    pub header: StudyHeader,
    pub standings: Option<SidePair<TeamStandings>>,
    pub over_under: Option<SidePair<OverUnderSplit>>,
    pub recent_form: Option<SidePair<RecentForm>>,
    pub h2h_direct: Option<H2HDirect>,
    pub h2h_indirect: Option<Vec<IndirectRow>>,
    pub market_comparison: MarketComparison,
    pub narrative_fragments: Vec<String>,
    pub meta: StudyMeta,
}

/* ---------- interchange with the export collaborator ---------- */

/// One row of the flat match-list document. Produced by the list scraper,
/// consumed by the export collaborator; shared here as the type contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedMatch {
    pub id: MatchId,
    pub time: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
    /// Present for finished matches only.
    pub score: Option<Score>,
    pub handicap: Option<Handicap>,
    pub goal_line: Option<Handicap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchListDoc {
    pub upcoming_matches: Vec<ListedMatch>,
    pub finished_matches: Vec<ListedMatch>,
}

/* ---------- CLI/API envelope ---------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
