//! State transition function.
//!
//! `apply` is total for validated events: it cannot fail and it never edits
//! its input. Totals are copied from the event, not summed, so a missed or
//! reordered intermediate event cannot make the score drift.

use crate::model::{Batter, DismissalMode, DismissedPlayer, Event, EventKind, MatchState};
use crate::probability;

/// Build the state that follows `event`. `window` bounds the recent-events log.
pub fn apply(state: &MatchState, event: &Event, window: usize) -> MatchState {
    let mut recent_events = Vec::with_capacity(state.recent_events.len() + 1);
    recent_events.extend(state.recent_events.iter().cloned());
    recent_events.push(event.clone());
    if recent_events.len() > window {
        let excess = recent_events.len() - window;
        recent_events.drain(..excess);
    }

    let mut dismissed_players = state.dismissed_players.clone();
    if let Some(record) = dismissal_record(state, event) {
        dismissed_players.push(record);
    }

    let mut next = MatchState {
        match_id: state.match_id.clone(),
        batting_side: state.batting_side.clone(),
        bowling_side: state.bowling_side.clone(),
        total_runs: event.current_score,
        wickets_lost: event.current_wickets,
        overs_played: event.overs_played,
        target: state.target,
        overs_budget: state.overs_budget,
        current_batter: next_batter(&state.current_batter, event),
        dismissed_players,
        recent_events,
        p_draw: state.p_draw,
        last_updated: Some(event.timestamp),
    };

    next.p_draw = probability::update(state.p_draw, event, &next);
    next
}

/// Tally the delivery against the batter on strike when the event names them.
fn next_batter(current: &Batter, event: &Event) -> Batter {
    let mut batter = current.clone();
    if event.batter.as_deref() != Some(current.name.as_str()) {
        return batter;
    }
    if event.kind.is_legal_delivery() {
        batter.balls_faced += 1;
    }
    if matches!(event.kind, EventKind::Runs | EventKind::Boundary) {
        batter.runs += event.runs_scored;
    }
    batter
}

fn dismissal_record(state: &MatchState, event: &Event) -> Option<DismissedPlayer> {
    if event.kind != EventKind::Wicket {
        return None;
    }
    let name = event.batter.as_deref()?;
    // A batter is out once per innings; a repeated wicket report adds nothing.
    if state.dismissed_players.iter().any(|p| p.name == name) {
        return None;
    }

    let (runs, balls_faced) = if state.current_batter.name == name {
        (state.current_batter.runs, state.current_batter.balls_faced)
    } else {
        let runs = state
            .recent_events
            .iter()
            .filter(|e| e.kind == EventKind::Runs && e.batter.as_deref() == Some(name))
            .map(|e| e.runs_scored)
            .sum();
        (runs, 0)
    };

    Some(DismissedPlayer {
        name: name.to_string(),
        runs,
        balls_faced,
        dismissal_mode: event.dismissal_mode.unwrap_or(DismissalMode::Other),
        bowler: event
            .bowler
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        fielder: event.fielder.clone(),
        score_at_dismissal: event.current_score,
        overs_at_dismissal: event.overs_played,
    })
}
