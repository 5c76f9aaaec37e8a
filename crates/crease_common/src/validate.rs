//! Event validation.
//!
//! `validate` is the only way a candidate record becomes an `Event`. It is
//! all-or-nothing and side-effect free: a rejected candidate leaves no trace.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{DismissalMode, Event, EventKind, MatchState};
use crate::overs::Overs;
use crate::MAX_WICKETS;

/// Candidate event as it arrives from a feed, a file or a test.
///
/// Every field is optional at this stage so that a missing field is reported
/// as `MissingField` instead of a decoder error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_wickets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overs_played: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs_scored: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bowler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissal_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fielder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balls_in_over: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
}

impl RawEvent {
    /// Candidate with all required fields filled in.
    pub fn new(
        kind: EventKind,
        timestamp: &str,
        current_score: i64,
        current_wickets: i64,
        overs_played: &str,
    ) -> Self {
        Self {
            event_type: Some(kind.as_str().to_string()),
            timestamp: Some(timestamp.to_string()),
            current_score: Some(current_score),
            current_wickets: Some(current_wickets),
            overs_played: Some(serde_json::Value::String(overs_played.to_string())),
            ..Self::default()
        }
    }

    pub fn with_runs(mut self, runs: i64) -> Self {
        self.runs_scored = Some(runs);
        self
    }

    pub fn with_batter(mut self, batter: &str) -> Self {
        self.batter = Some(batter.to_string());
        self
    }

    pub fn with_bowler(mut self, bowler: &str) -> Self {
        self.bowler = Some(bowler.to_string());
        self
    }

    pub fn with_dismissal(mut self, mode: &str, fielder: Option<&str>) -> Self {
        self.dismissal_mode = Some(mode.to_string());
        self.fielder = fielder.map(str::to_string);
        self
    }

    pub fn with_ball(mut self, ball: i64) -> Self {
        self.balls_in_over = Some(ball);
        self
    }

    pub fn with_commentary(mut self, text: &str) -> Self {
        self.commentary = Some(text.to_string());
        self
    }

    /// Decode one JSON record.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

fn required<T: Clone>(value: &Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.clone().ok_or(ValidationError::MissingField(field))
}

/// Check `candidate` against `state` and produce a typed `Event`.
pub fn validate(candidate: &RawEvent, state: &MatchState) -> Result<Event, ValidationError> {
    // Structural presence
    let event_type = required(&candidate.event_type, "event_type")?;
    let timestamp = required(&candidate.timestamp, "timestamp")?;
    let current_score = required(&candidate.current_score, "current_score")?;
    let current_wickets = required(&candidate.current_wickets, "current_wickets")?;
    let overs_raw = required(&candidate.overs_played, "overs_played")?;

    // Well-formedness
    let kind: EventKind = event_type
        .parse()
        .map_err(|e: String| ValidationError::malformed("event_type", e))?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp.trim())
        .map_err(|e| ValidationError::malformed("timestamp", e.to_string()))?;
    let overs = Overs::from_json(&overs_raw)
        .map_err(|e| ValidationError::malformed("overs_played", e))?;
    let ball_in_over = match candidate.balls_in_over {
        None => None,
        Some(b) if (1..=6).contains(&b) => Some(b as u8),
        Some(b) => {
            return Err(ValidationError::malformed(
                "balls_in_over",
                format!("{} is outside 1..=6", b),
            ))
        }
    };
    let dismissal_mode = candidate
        .dismissal_mode
        .as_deref()
        .map(DismissalMode::parse_lenient);

    // Non-negative runs
    let runs_scored = candidate.runs_scored.unwrap_or(0);
    if runs_scored < 0 {
        return Err(ValidationError::NegativeRuns {
            field: "runs_scored",
            value: runs_scored,
        });
    }
    if current_score < 0 {
        return Err(ValidationError::NegativeRuns {
            field: "current_score",
            value: current_score,
        });
    }

    // Ordering against the current state
    if overs < state.overs_played {
        return Err(ValidationError::OversRegressed {
            current: state.overs_played,
            candidate: overs,
        });
    }
    if let Some(last) = state.last_updated {
        if timestamp < last {
            return Err(ValidationError::TimestampRegressed {
                current: last.to_rfc3339(),
                candidate: timestamp.to_rfc3339(),
            });
        }
    }

    // Wicket bounds
    if kind == EventKind::Wicket && state.wickets_lost + 1 > MAX_WICKETS {
        return Err(ValidationError::WicketOverflow {
            wickets: i64::from(state.wickets_lost) + 1,
        });
    }
    if current_wickets > i64::from(MAX_WICKETS) {
        return Err(ValidationError::WicketOverflow {
            wickets: current_wickets,
        });
    }
    if current_wickets < 0 {
        return Err(ValidationError::malformed(
            "current_wickets",
            format!("{} is negative", current_wickets),
        ));
    }
    if kind == EventKind::Wicket && dismissal_mode.is_none() {
        return Err(ValidationError::MissingField("dismissal_mode"));
    }

    // Absolute totals never go backwards
    if current_score < i64::from(state.total_runs) {
        return Err(ValidationError::TotalsRegressed {
            field: "current_score",
            current: i64::from(state.total_runs),
            candidate: current_score,
        });
    }
    if current_wickets < i64::from(state.wickets_lost) {
        return Err(ValidationError::TotalsRegressed {
            field: "current_wickets",
            current: i64::from(state.wickets_lost),
            candidate: current_wickets,
        });
    }
    if kind == EventKind::Wicket && current_wickets == i64::from(state.wickets_lost) {
        return Err(ValidationError::WicketNotCounted {
            wickets: current_wickets,
        });
    }

    let current_score = u32::try_from(current_score)
        .map_err(|_| ValidationError::malformed("current_score", "out of range"))?;
    let runs_scored = u32::try_from(runs_scored)
        .map_err(|_| ValidationError::malformed("runs_scored", "out of range"))?;

    Ok(Event {
        timestamp,
        kind,
        runs_scored,
        batter: candidate.batter.clone(),
        bowler: candidate.bowler.clone(),
        overs_played: overs,
        dismissal_mode,
        fielder: candidate.fielder.clone(),
        current_score,
        current_wickets: current_wickets as u8,
        ball_in_over,
        commentary: candidate.commentary.clone(),
    })
}
