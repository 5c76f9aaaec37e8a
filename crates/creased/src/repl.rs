//! REPL - interactive question prompt
//!
//! Reads one question per line and prints `{TAG} {answer}`. Ingestion keeps
//! running underneath; every question is answered against the state current
//! at the moment it is asked.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;
use uuid::Uuid;

use crate::dispatcher::{Answer, Dispatcher};
use crate::router::Category;
use crate::state::StateReader;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

/// `{TAG} {text}`, with a coloured tag on terminals.
pub fn format_answer(answer: &Answer, color: bool) -> String {
    let tag = answer.category.tag();
    if !color {
        return format!("{} {}", tag, answer.text);
    }
    let tag = match answer.category {
        Category::Stats => tag.cyan().bold().to_string(),
        Category::Momentum => tag.yellow().bold().to_string(),
        Category::Probability => tag.green().bold().to_string(),
        Category::Tactical => tag.magenta().bold().to_string(),
    };
    format!("{} {}", tag, answer.text)
}

fn print_welcome<W: Write>(out: &mut W, headline: &str, color: bool) -> Result<()> {
    if color {
        writeln!(out, "{}", headline.bold())?;
    } else {
        writeln!(out, "{}", headline)?;
    }
    writeln!(
        out,
        "Ask about the score, momentum, draw chances or dismissals. Type 'exit' to quit."
    )?;
    Ok(())
}

/// Run the prompt until an exit word or end of input.
pub async fn run_repl<R, W>(
    input: R,
    out: &mut W,
    dispatcher: &Dispatcher,
    reader: &StateReader,
    color: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let opening = reader.snapshot().await;
    print_welcome(
        out,
        &format!(
            "{} v {} - {} ({} ov)",
            opening.batting_side,
            opening.bowling_side,
            opening.score_line(),
            opening.overs_played
        ),
        color,
    )?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            writeln!(out)?;
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
            break;
        }

        let query_id = Uuid::new_v4();
        let state = reader.snapshot().await;
        info!("[QUERY] {} '{}' at {}", query_id, query, state.score_line());

        let answer = dispatcher.answer(query, &state).await;
        writeln!(out, "{}", format_answer(&answer, color))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_shared_state;
    use crease_common::MatchConfig;

    #[test]
    fn test_plain_format() {
        let answer = Answer {
            category: Category::Momentum,
            text: "Match is balanced, both teams fighting.".to_string(),
            source: crate::dispatcher::AnswerSource::Deterministic,
            cached: false,
        };
        assert_eq!(
            format_answer(&answer, false),
            "[MOMENTUM] Match is balanced, both teams fighting."
        );
        assert!(format_answer(&answer, true).contains("[MOMENTUM]"));
    }

    #[tokio::test]
    async fn test_session_until_quit() {
        let (_writer, reader) =
            create_shared_state(MatchConfig::default().initial_state().unwrap());
        let dispatcher = Dispatcher::deterministic_only();

        let input: &[u8] = b"What's the score?\n\n  QUIT \nCan India draw?\n";
        let mut out = Vec::new();
        run_repl(input, &mut out, &dispatcher, &reader, false)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("India v South Africa - India 27/2 (6.0 ov)"));
        assert!(text.contains("[STATS] India 27/2 in 6.0 overs, target 549."));
        assert!(!text.contains("[PROBABILITY]"));
    }

    #[tokio::test]
    async fn test_session_ends_at_eof() {
        let (_writer, reader) =
            create_shared_state(MatchConfig::default().initial_state().unwrap());
        let dispatcher = Dispatcher::deterministic_only();

        let input: &[u8] = b"Why did Jaiswal get out?";
        let mut out = Vec::new();
        run_repl(input, &mut out, &dispatcher, &reader, false)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[TACTICAL] No recent events to analyze."));
    }
}
