//! Draw probability model.
//!
//! A cheap multiplicative heuristic rather than a fitted regression:
//! - time factor from overs remaining
//! - wicket penalty, steeper once five are down
//! - boundary boost for scoring shots
//!
//! The result is always clamped to [`P_MIN`, `P_MAX`], so no sequence of
//! events can drift it to certainty.

use crate::model::{Event, EventKind, MatchState};

pub const P_MIN: f64 = 0.05;
pub const P_MAX: f64 = 0.95;

/// Default overs available to the batting side (a full final day).
pub const TOTAL_OVERS_BUDGET: u32 = 90;

/// Up to +20% from time remaining.
pub const TIME_WEIGHT: f64 = 0.2;

pub const WICKET_PENALTY_EARLY: f64 = 0.85;
pub const WICKET_PENALTY_COLLAPSE: f64 = 0.70;

/// Wickets down (after the event) at which the collapse penalty applies.
pub const COLLAPSE_THRESHOLD: u8 = 5;

pub const BOUNDARY_BOOST: f64 = 1.05;

/// Clamp into the allowed probability band. NaN collapses to the lower bound.
pub fn clamp(p: f64) -> f64 {
    if p.is_nan() {
        return P_MIN;
    }
    p.clamp(P_MIN, P_MAX)
}

/// New draw probability after `event`, given the state it produced.
pub fn update(p_draw: f64, event: &Event, resulting_state: &MatchState) -> f64 {
    let budget = if resulting_state.overs_budget == 0 {
        TOTAL_OVERS_BUDGET
    } else {
        resulting_state.overs_budget
    };
    let budget_f = f64::from(budget);

    let overs_remaining = budget_f - resulting_state.overs_played.as_f64();
    let time_factor = (1.0 + (overs_remaining / budget_f) * TIME_WEIGHT).min(1.0);
    let mut p = p_draw * time_factor;

    match event.kind {
        EventKind::Wicket => {
            if resulting_state.wickets_lost < COLLAPSE_THRESHOLD {
                p *= WICKET_PENALTY_EARLY;
            } else {
                p *= WICKET_PENALTY_COLLAPSE;
            }
        }
        EventKind::Runs if event.runs_scored >= 4 => {
            p *= BOUNDARY_BOOST;
        }
        _ => {}
    }

    clamp(p)
}
