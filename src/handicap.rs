//! Asian-handicap (and goal-line) parsing and normalization.
//!
//! Every handicap or goal-line string observed anywhere in the markup goes
//! through this module, so all sections agree on bucket semantics.
//!
//! Raw forms accepted: plain decimals ("0.5", "-1", "+0.25", "0,5", with
//! ASCII or unicode minus), and split lines ("0/0.5", "-0.5/-1"). A split
//! line is the average of its two legs; a leading minus on a zero first leg
//! distributes to the second leg, so "-0/0.5" parses to -0.25.
//!
//! Bucketing rule (deterministic, documented here once): a quarter-valued
//! line always buckets to the half-point between its surrounding integers,
//! so x.25 and x.75 both map to x.5, sign preserved. Whole and half values
//! are already canonical. Anything off the quarter lattice rounds to the
//! nearest half. The mapping is total over parseable input and idempotent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side the line favors. Positive lines favor the home side,
/// negative lines the away side, zero favors neither (draw no bet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Favored {
    Home,
    Away,
    None,
}

/// A signed line on the quarter-point lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Handicap {
    pub line: f64,
}

impl Handicap {
    pub fn from_line(line: f64) -> Self {
        Handicap { line }
    }

    /// Parse a raw textual line. Returns `None` for placeholders
    /// ("-", "?", empty) and anything non-numeric.
    pub fn parse(raw: &str) -> Option<Self> {
        parse_line(raw).map(Handicap::from_line)
    }

    /// Side this line favors.
    pub fn favored(&self) -> Favored {
        if self.line > 0.0 {
            Favored::Home
        } else if self.line < 0.0 {
            Favored::Away
        } else {
            Favored::None
        }
    }

    /// Canonical half-point bucket (see module docs for the quarter rule).
    pub fn half_bucket(&self) -> f64 {
        bucket_to_half(self.line)
    }

    /// The line with its bucketed value, for lattice-level comparisons.
    pub fn bucketed(&self) -> Handicap {
        Handicap::from_line(self.half_bucket())
    }
}

/// Display preserves quarter precision ("−0.25" stays "-0.25"); bucket
/// comparisons always go through [`Handicap::half_bucket`].
impl fmt::Display for Handicap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapped = (self.line * 4.0).round() / 4.0;
        if snapped == 0.0 {
            write!(f, "0")
        } else if snapped.fract() == 0.0 {
            write!(f, "{}", snapped as i64)
        } else if (snapped * 2.0).fract() == 0.0 {
            write!(f, "{:.1}", snapped)
        } else {
            write!(f, "{:.2}", snapped)
        }
    }
}

/// Normalize one numeric leg: unicode minus, comma decimals, stray '+'
/// and spaces. Rejects anything that is not a signed decimal.
fn clean_number(s: &str) -> Option<f64> {
    let t: String = s
        .trim()
        .replace('\u{2212}', "-")
        .replace(',', ".")
        .replace('+', "")
        .replace(' ', "");
    if t.is_empty() {
        return None;
    }
    let mut chars = t.chars();
    let first = chars.next()?;
    if first != '-' && !first.is_ascii_digit() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    t.parse::<f64>().ok()
}

fn parse_line(raw: &str) -> Option<f64> {
    let s: String = raw
        .trim()
        .replace('\u{2212}', "-")
        .replace(',', ".")
        .replace(' ', "");
    if s.is_empty() || s == "-" || s == "?" {
        return None;
    }
    match s.split_once('/') {
        Some((p1, p2)) => {
            let v1 = clean_number(p1)?;
            let mut v2 = clean_number(p2)?;
            // "-0/0.5" and "-0.5/1": the leading minus covers both legs
            // when the second leg is written unsigned.
            let minus_first = p1.starts_with('-');
            if (v1 < 0.0 || (minus_first && v1 == 0.0)) && !p2.starts_with('-') && v2 > 0.0 {
                v2 = -v2;
            }
            Some((v1 + v2) / 2.0)
        }
        None => clean_number(&s),
    }
}

/// Map any line to the canonical half-point lattice.
pub fn bucket_to_half(v: f64) -> f64 {
    if v == 0.0 {
        return 0.0;
    }
    let sign = if v < 0.0 { -1.0 } else { 1.0 };
    let av = v.abs();
    let base = (av + 1e-9).floor();
    let frac = av - base;
    let close = |a: f64, b: f64| (a - b).abs() < 1e-6;
    let bucket = if close(frac, 0.0) {
        base
    } else if close(frac, 0.25) || close(frac, 0.5) || close(frac, 0.75) {
        base + 0.5
    } else {
        (av * 2.0).round() / 2.0
    };
    sign * bucket
}
