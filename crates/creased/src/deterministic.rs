//! Deterministic answerer - produces answers from the match state alone.
//!
//! Used whenever the augmented path is disabled, slow, failing or empty.
//! Every function here returns a non-empty string for any state.

use crease_common::{EventKind, MatchState};

use crate::router::Category;

/// Events looked at by the momentum heuristic.
const MOMENTUM_WINDOW: usize = 10;

/// Runs in the momentum window that count as the batting side building.
const MOMENTUM_RUNS: u32 = 20;

/// Answer `query` in `category` from `state`.
pub fn answer(category: Category, query: &str, state: &MatchState) -> String {
    match category {
        Category::Stats => answer_stats(query, state),
        Category::Momentum => answer_momentum(state),
        Category::Probability => answer_probability(state),
        Category::Tactical => answer_tactical(query, state),
    }
}

/// Scorecard line plus what is left and who is in.
pub fn scorecard(state: &MatchState) -> String {
    format!(
        "{} {}/{} in {} overs, target {}. {:.1} overs remaining, {} wickets in hand. Batting: {} {}* ({}).",
        state.batting_side,
        state.total_runs,
        state.wickets_lost,
        state.overs_played,
        state.target,
        state.overs_remaining(),
        state.wickets_remaining(),
        state.current_batter.name,
        state.current_batter.runs,
        state.current_batter.balls_faced,
    )
}

fn answer_stats(query: &str, state: &MatchState) -> String {
    let q = query.to_lowercase();
    let side = &state.batting_side;

    if q.contains("wicket") && (q.contains("remain") || q.contains("left") || q.contains("hand")) {
        return format!(
            "{} have {} wickets remaining ({} down).",
            side,
            state.wickets_remaining(),
            state.wickets_lost
        );
    }

    if q.contains("wicket") && q.contains("lost") {
        return format!("{} have lost {} wickets so far.", side, state.wickets_lost);
    }

    if q.contains("bat") && (q.contains("who") || q.contains("current")) {
        let b = &state.current_batter;
        return format!(
            "Currently batting: {} ({}* runs, {} balls).",
            b.name, b.runs, b.balls_faced
        );
    }

    if q.contains("run") && (q.contains("need") || q.contains("require") || q.contains("win")) {
        if state.runs_needed() == 0 {
            return format!("{} have reached the target of {}.", side, state.target);
        }
        return format!(
            "{} need {} more runs to win (currently {}/{}).",
            side,
            state.runs_needed(),
            state.total_runs,
            state.wickets_lost
        );
    }

    if let Some(player) = state.find_dismissed_in(&q) {
        return format!(
            "{} scored {} runs. Dismissed: {}.",
            player.name,
            player.runs,
            player.dismissal_text()
        );
    }

    if (q.contains("out") || q.contains("dismiss"))
        && ["how", "what", "who", "when"].iter().any(|w| q.contains(w))
    {
        if let Some(player) = state.dismissed_players.last() {
            return format!(
                "{} scored {} runs. Dismissed: {}.",
                player.name,
                player.runs,
                player.dismissal_text()
            );
        }
    }

    if q.contains("over") && (q.contains("remain") || q.contains("left")) {
        return format!(
            "About {:.1} overs remaining (currently at {} overs).",
            state.overs_remaining(),
            state.overs_played
        );
    }

    if q.contains("target") {
        return format!(
            "{}'s target is {} runs. Currently at {}/{}.",
            side, state.target, state.total_runs, state.wickets_lost
        );
    }

    scorecard(state)
}

fn answer_probability(state: &MatchState) -> String {
    let note = if state.p_draw >= 0.6 {
        "Strong draw chances."
    } else if state.p_draw >= 0.4 {
        "Evenly poised."
    } else {
        "Slim draw chances."
    };

    let survival = match state.wickets_remaining() {
        0 => format!("{} are all out.", state.batting_side),
        w => format!(
            "{} need to bat {:.0}+ overs without losing more than {} wickets.",
            state.batting_side,
            state.overs_remaining(),
            w - 1
        ),
    };

    format!(
        "P(Draw): {:.0}%, P({} win): {:.0}%. {} {}",
        state.p_draw * 100.0,
        state.bowling_side,
        state.p_opponent_win() * 100.0,
        note,
        survival
    )
}

fn answer_momentum(state: &MatchState) -> String {
    let start = state.recent_events.len().saturating_sub(MOMENTUM_WINDOW);
    let window = &state.recent_events[start..];

    let wickets = window.iter().filter(|e| e.kind == EventKind::Wicket).count();
    let runs: u32 = window
        .iter()
        .filter(|e| matches!(e.kind, EventKind::Runs | EventKind::Boundary))
        .map(|e| e.runs_scored)
        .sum();

    if wickets > 0 {
        format!("{} has momentum with recent wickets.", state.bowling_side)
    } else if runs >= MOMENTUM_RUNS {
        format!("{} building momentum with good scoring.", state.batting_side)
    } else {
        "Match is balanced, both teams fighting.".to_string()
    }
}

fn answer_tactical(query: &str, state: &MatchState) -> String {
    if let Some(player) = state.find_dismissed_in(query) {
        return format!(
            "{} scored {} runs and was dismissed {}.",
            player.name,
            player.runs,
            player.dismissal_text()
        );
    }

    if let Some(wicket) = state
        .recent_events
        .iter()
        .rev()
        .find(|e| e.kind == EventKind::Wicket)
    {
        let how = wicket
            .batter
            .as_deref()
            .and_then(|name| {
                state
                    .dismissed_players
                    .iter()
                    .rev()
                    .find(|p| p.name == name)
            })
            .map(|p| format!("{} dismissed {}.", p.name, p.dismissal_text()))
            .unwrap_or_else(|| format!("{}.", wicket.describe()));
        let commentary = wicket.commentary.as_deref().unwrap_or("Wicket falls!");
        return format!("{} {}", how, commentary);
    }

    match state.last_event() {
        Some(event) => match event.commentary.as_deref() {
            Some(text) if !text.trim().is_empty() => format!("Last ball: {}", text),
            _ => format!("Last ball: {}.", event.describe()),
        },
        None => "No recent events to analyze.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_common::{apply, validate, MatchConfig, RawEvent, RECENT_EVENTS_WINDOW};

    fn day_five() -> MatchState {
        MatchConfig::default().initial_state().unwrap()
    }

    fn feed(state: MatchState, raw: RawEvent) -> MatchState {
        let event = validate(&raw, &state).unwrap();
        apply(&state, &event, RECENT_EVENTS_WINDOW)
    }

    #[test]
    fn test_scorecard_default() {
        let state = day_five();
        assert_eq!(
            answer(Category::Stats, "what's the score?", &state),
            "India 27/2 in 6.0 overs, target 549. 84.0 overs remaining, 8 wickets in hand. Batting: Sai Sudharsan 2* (4)."
        );
    }

    #[test]
    fn test_stats_sub_answers() {
        let state = day_five();
        assert_eq!(
            answer(Category::Stats, "How many wickets left?", &state),
            "India have 8 wickets remaining (2 down)."
        );
        assert_eq!(
            answer(Category::Stats, "runs needed?", &state),
            "India need 522 more runs to win (currently 27/2)."
        );
        assert!(answer(Category::Stats, "who is batting", &state).contains("Sai Sudharsan"));
        assert!(answer(Category::Stats, "overs left", &state).starts_with("About 84.0 overs"));
    }

    #[test]
    fn test_probability_text() {
        let state = day_five();
        assert_eq!(
            answer(Category::Probability, "can india draw", &state),
            "P(Draw): 35%, P(South Africa win): 65%. Slim draw chances. India need to bat 84+ overs without losing more than 7 wickets."
        );
    }

    #[test]
    fn test_momentum_heuristic() {
        let state = day_five();
        assert_eq!(
            answer(Category::Momentum, "what just happened", &state),
            "Match is balanced, both teams fighting."
        );

        let after_wicket = feed(
            state.clone(),
            RawEvent::new(EventKind::Wicket, "2025-11-26T09:20:00+05:30", 27, 3, "6.3")
                .with_batter("Sai Sudharsan")
                .with_bowler("Harmer")
                .with_dismissal("bowled", None),
        );
        assert_eq!(
            answer(Category::Momentum, "momentum?", &after_wicket),
            "South Africa has momentum with recent wickets."
        );

        let mut scoring = state;
        for (i, score) in [33, 39, 45, 51].iter().enumerate() {
            let overs = format!("6.{}", i + 1);
            scoring = feed(
                scoring,
                RawEvent::new(EventKind::Runs, "2025-11-26T09:30:00+05:30", *score, 2, &overs)
                    .with_runs(6),
            );
        }
        assert_eq!(
            answer(Category::Momentum, "momentum?", &scoring),
            "India building momentum with good scoring."
        );
    }

    #[test]
    fn test_tactical_fallbacks() {
        let state = day_five();
        assert_eq!(
            answer(Category::Tactical, "why?", &state),
            "No recent events to analyze."
        );

        let dot = feed(
            state,
            RawEvent::new(EventKind::Dot, "2025-11-26T09:05:00+05:30", 27, 2, "6.1")
                .with_commentary("Defended back to the bowler."),
        );
        assert_eq!(
            answer(Category::Tactical, "how?", &dot),
            "Last ball: Defended back to the bowler."
        );

        let out = feed(
            dot,
            RawEvent::new(EventKind::Wicket, "2025-11-26T09:10:00+05:30", 27, 3, "6.2")
                .with_batter("Sai Sudharsan")
                .with_bowler("Jansen")
                .with_dismissal("caught", Some("Markram")),
        );
        assert_eq!(
            answer(Category::Tactical, "how did that happen", &out),
            "Sai Sudharsan dismissed c Markram b Jansen. Wicket falls!"
        );
        assert_eq!(
            answer(Category::Tactical, "why was sudharsan dismissed", &out),
            "Sai Sudharsan scored 2 runs and was dismissed c Markram b Jansen."
        );
    }

    #[test]
    fn test_every_category_non_empty() {
        let mut state = day_five();
        state.wickets_lost = 10;
        state.total_runs = 600;
        for category in Category::ALL {
            for query in ["", "???", "score", "why"] {
                assert!(!answer(category, query, &state).is_empty());
            }
        }
    }
}
