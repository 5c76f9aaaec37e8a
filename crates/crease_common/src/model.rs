//! Match model - batters, events, dismissals and the match state.
//!
//! `MatchState` is a value: transitions build a new one rather than editing
//! the old, so any snapshot a reader holds stays internally consistent.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::overs::Overs;
use crate::MAX_WICKETS;

/// Kind of delivery outcome carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Runs,
    Wicket,
    Maiden,
    Boundary,
    Dot,
    Wide,
    NoBall,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Runs => "runs",
            EventKind::Wicket => "wicket",
            EventKind::Maiden => "maiden",
            EventKind::Boundary => "boundary",
            EventKind::Dot => "dot",
            EventKind::Wide => "wide",
            EventKind::NoBall => "no_ball",
        }
    }

    /// Wides and no-balls do not count towards the over or balls faced.
    pub fn is_legal_delivery(&self) -> bool {
        !matches!(self, EventKind::Wide | EventKind::NoBall)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "runs" => Ok(EventKind::Runs),
            "wicket" => Ok(EventKind::Wicket),
            "maiden" => Ok(EventKind::Maiden),
            "boundary" => Ok(EventKind::Boundary),
            "dot" => Ok(EventKind::Dot),
            "wide" => Ok(EventKind::Wide),
            "no_ball" | "no-ball" | "noball" => Ok(EventKind::NoBall),
            other => Err(format!("unknown event type '{}'", other)),
        }
    }
}

/// How a batter was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissalMode {
    Caught,
    Bowled,
    Lbw,
    Stumped,
    Other,
}

impl DismissalMode {
    /// Lenient parse used for feed data: anything unrecognised is `Other`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "caught" | "c" => DismissalMode::Caught,
            "bowled" | "b" => DismissalMode::Bowled,
            "lbw" => DismissalMode::Lbw,
            "stumped" | "st" => DismissalMode::Stumped,
            _ => DismissalMode::Other,
        }
    }
}

impl fmt::Display for DismissalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DismissalMode::Caught => "caught",
            DismissalMode::Bowled => "bowled",
            DismissalMode::Lbw => "lbw",
            DismissalMode::Stumped => "stumped",
            DismissalMode::Other => "other",
        };
        f.write_str(s)
    }
}

/// A batter at the crease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batter {
    pub name: String,
    pub runs: u32,
    pub balls_faced: u32,
    pub on_strike: bool,
}

impl Batter {
    pub fn new(name: impl Into<String>, runs: u32, balls_faced: u32) -> Self {
        Self {
            name: name.into(),
            runs,
            balls_faced,
            on_strike: true,
        }
    }
}

/// A validated match event. Only `validate::validate` produces these from
/// external input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<FixedOffset>,
    pub kind: EventKind,
    pub runs_scored: u32,
    pub batter: Option<String>,
    pub bowler: Option<String>,
    pub overs_played: Overs,
    pub dismissal_mode: Option<DismissalMode>,
    pub fielder: Option<String>,
    /// Authoritative team score after this event.
    pub current_score: u32,
    /// Authoritative wickets down after this event.
    pub current_wickets: u8,
    pub ball_in_over: Option<u8>,
    /// Display only.
    pub commentary: Option<String>,
}

impl Event {
    pub fn is_boundary_hit(&self) -> bool {
        self.runs_scored >= 4
    }

    /// One-line description for logs and fallback answers.
    pub fn describe(&self) -> String {
        let who = self.batter.as_deref().unwrap_or("Unknown");
        match self.kind {
            EventKind::Wicket => {
                let bowler = self.bowler.as_deref().unwrap_or("unknown");
                format!("{} dismissed by {} at {}", who, bowler, self.overs_played)
            }
            EventKind::Runs | EventKind::Boundary => format!(
                "{} scored {} at {} ({}/{})",
                who, self.runs_scored, self.overs_played, self.current_score, self.current_wickets
            ),
            kind => format!(
                "{} at {} ({}/{})",
                kind, self.overs_played, self.current_score, self.current_wickets
            ),
        }
    }
}

/// Historical record of a dismissal. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DismissedPlayer {
    pub name: String,
    pub runs: u32,
    #[serde(default)]
    pub balls_faced: u32,
    pub dismissal_mode: DismissalMode,
    pub bowler: String,
    #[serde(default)]
    pub fielder: Option<String>,
    pub score_at_dismissal: u32,
    pub overs_at_dismissal: Overs,
}

impl DismissedPlayer {
    /// Scorecard-style dismissal text, e.g. `c Jansen b Rabada`.
    pub fn dismissal_text(&self) -> String {
        match (&self.fielder, self.dismissal_mode) {
            (Some(fielder), DismissalMode::Caught) => format!("c {} b {}", fielder, self.bowler),
            (_, DismissalMode::Bowled) => format!("b {}", self.bowler),
            (_, DismissalMode::Lbw) => format!("lbw b {}", self.bowler),
            (Some(fielder), DismissalMode::Stumped) => {
                format!("st {} b {}", fielder, self.bowler)
            }
            (_, mode) => format!("{} b {}", mode, self.bowler),
        }
    }
}

/// The single authoritative match state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub match_id: String,
    pub batting_side: String,
    pub bowling_side: String,
    pub total_runs: u32,
    pub wickets_lost: u8,
    pub overs_played: Overs,
    pub target: u32,
    /// Overs available to the batting side in this match.
    pub overs_budget: u32,
    pub current_batter: Batter,
    #[serde(default)]
    pub dismissed_players: Vec<DismissedPlayer>,
    /// Oldest first, bounded by the ingestion window.
    #[serde(default)]
    pub recent_events: Vec<Event>,
    pub p_draw: f64,
    /// Timestamp of the last accepted event; `None` until one is accepted.
    #[serde(default)]
    pub last_updated: Option<DateTime<FixedOffset>>,
}

impl MatchState {
    /// Probability the bowling side wins.
    pub fn p_opponent_win(&self) -> f64 {
        1.0 - self.p_draw
    }

    pub fn wickets_remaining(&self) -> u8 {
        MAX_WICKETS.saturating_sub(self.wickets_lost)
    }

    pub fn overs_remaining(&self) -> f64 {
        self.overs_played.remaining_of(self.overs_budget)
    }

    pub fn runs_needed(&self) -> u32 {
        self.target.saturating_sub(self.total_runs)
    }

    pub fn last_event(&self) -> Option<&Event> {
        self.recent_events.last()
    }

    /// `India 27/2`
    pub fn score_line(&self) -> String {
        format!(
            "{} {}/{}",
            self.batting_side, self.total_runs, self.wickets_lost
        )
    }

    /// Score-relevant subset used for cache keys.
    pub fn fingerprint(&self) -> StateFingerprint {
        StateFingerprint {
            total_runs: self.total_runs,
            wickets_lost: self.wickets_lost,
            overs_played: self.overs_played,
            p_draw_bp: (self.p_draw * 10_000.0).round() as u32,
        }
    }

    /// Find a dismissed player whose name appears in `text` (case-insensitive).
    /// Matches on the full name or any single name part of four letters or more.
    pub fn find_dismissed_in(&self, text: &str) -> Option<&DismissedPlayer> {
        let text = text.to_lowercase();
        self.dismissed_players.iter().rev().find(|p| {
            let name = p.name.to_lowercase();
            text.contains(&name)
                || name
                    .split_whitespace()
                    .any(|part| part.len() >= 4 && text.contains(part))
        })
    }
}

/// Stable digest input for a state: runs, wickets, overs, probability in basis
/// points. The recent-events log is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StateFingerprint {
    pub total_runs: u32,
    pub wickets_lost: u8,
    pub overs_played: Overs,
    pub p_draw_bp: u32,
}

impl fmt::Display for StateFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}#{}",
            self.total_runs, self.wickets_lost, self.overs_played, self.p_draw_bp
        )
    }
}
