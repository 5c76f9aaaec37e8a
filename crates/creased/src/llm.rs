//! Augmented response path.
//!
//! A `TextGenerator` turns a category prompt into free text. Production uses
//! an OpenAI-compatible chat-completions endpoint; tests use `FakeGenerator`.
//! `augment` races one call against a deadline and reports what happened as
//! an `AugmentOutcome` instead of an error.

use async_trait::async_trait;
use crease_common::config::LlmConfig;
use crease_common::{EventKind, MatchState};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::AugmentError;
use crate::router::Category;

const SYSTEM_PROMPT: &str =
    "You are a helpful cricket commentary assistant. Answer questions accurately and concisely.";

/// Events summarised in momentum and tactical prompts.
const PROMPT_EVENTS: usize = 5;

// ============================================================================
// Prompt
// ============================================================================

/// Prompt for one query. Plain data; building it never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub category: Category,
    pub system: String,
    pub user: String,
}

/// Build the category prompt for `query` against `state`.
pub fn build_prompt(category: Category, query: &str, state: &MatchState) -> Prompt {
    let mut ctx = format!(
        "You are a cricket commentary agent answering questions about a live Test match.\n\n\
         Current Match State:\n\
         - Team: {}\n\
         - Opponent: {}\n\
         - Score: {}/{}\n\
         - Overs played: {}\n\
         - Target: {} runs\n",
        state.batting_side,
        state.bowling_side,
        state.total_runs,
        state.wickets_lost,
        state.overs_played,
        state.target
    );

    let batter = &state.current_batter;
    let instruction = match category {
        Category::Stats => {
            ctx.push_str(&format!(
                "- Current batter: {} ({}* runs, {} balls)\n\
                 - Wickets remaining: {}\n\
                 - Runs needed: {}\n",
                batter.name,
                batter.runs,
                batter.balls_faced,
                state.wickets_remaining(),
                state.runs_needed()
            ));
            push_dismissals(&mut ctx, state);
            "Provide a concise, accurate answer about match statistics. Be specific with numbers."
        }
        Category::Probability => {
            ctx.push_str(&format!(
                "- Overs remaining: {:.1}\n\
                 - Wickets remaining: {}\n\
                 - Runs needed: {}\n\
                 - P(Draw): {:.0}%\n\
                 - P({} win): {:.0}%\n",
                state.overs_remaining(),
                state.wickets_remaining(),
                state.runs_needed(),
                state.p_draw * 100.0,
                state.bowling_side,
                state.p_opponent_win() * 100.0
            ));
            "Analyze the probability of different match outcomes. Consider the match situation, \
             required run rate, wickets remaining, and time left."
        }
        Category::Momentum => {
            let notable: Vec<String> = state
                .recent_events
                .iter()
                .rev()
                .take(PROMPT_EVENTS)
                .rev()
                .filter(|e| e.kind == EventKind::Wicket || e.is_boundary_hit())
                .map(|e| e.describe())
                .collect();
            let events = if notable.is_empty() {
                "None".to_string()
            } else {
                notable.join(", ")
            };
            ctx.push_str(&format!(
                "- Recent events: {}\n\
                 - P(Draw): {:.0}%\n\
                 - P({} win): {:.0}%\n",
                events,
                state.p_draw * 100.0,
                state.bowling_side,
                state.p_opponent_win() * 100.0
            ));
            "Analyze the current momentum in the match. Consider recent events, scoring rate, \
             wickets, and which team has the upper hand."
        }
        Category::Tactical => {
            ctx.push_str(&format!(
                "- Current batter: {} ({}* runs)\n",
                batter.name, batter.runs
            ));
            ctx.push_str("- Recent events:\n");
            for event in state.recent_events.iter().rev().take(PROMPT_EVENTS).rev() {
                ctx.push_str(&format!("  - {}", event.describe()));
                if let Some(text) = &event.commentary {
                    ctx.push_str(&format!(" ({})", text));
                }
                ctx.push('\n');
            }
            push_dismissals(&mut ctx, state);
            "Provide tactical analysis of dismissals, bowling strategies, batting approaches, \
             and match situation."
        }
    };

    let user = format!("{}\nUser Question: {}\n\n{}\n", ctx, query.trim(), instruction);
    Prompt {
        category,
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

fn push_dismissals(ctx: &mut String, state: &MatchState) {
    if state.dismissed_players.is_empty() {
        return;
    }
    ctx.push_str("- Dismissed:\n");
    for p in &state.dismissed_players {
        ctx.push_str(&format!(
            "  - {} {} ({} at {}/{})\n",
            p.name,
            p.runs,
            p.dismissal_text(),
            p.score_at_dismissal,
            p.overs_at_dismissal
        ));
    }
}

// ============================================================================
// Generator trait
// ============================================================================

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for `prompt`. May take arbitrarily long; callers bound it.
    async fn generate(&self, prompt: &Prompt) -> Result<String, AugmentError>;
}

/// Result of one bounded augmented call.
#[derive(Debug)]
pub enum AugmentOutcome {
    Generated(String),
    Empty,
    TimedOut,
    Failed(AugmentError),
    Disabled,
}

/// Race `generator` against `deadline`. The pending call is dropped (and its
/// request cancelled) when the deadline wins.
pub async fn augment(
    generator: Option<&dyn TextGenerator>,
    prompt: &Prompt,
    deadline: Duration,
) -> AugmentOutcome {
    let Some(generator) = generator else {
        return AugmentOutcome::Disabled;
    };

    match tokio::time::timeout(deadline, generator.generate(prompt)).await {
        Err(_) => AugmentOutcome::TimedOut,
        Ok(Err(e)) => AugmentOutcome::Failed(e),
        Ok(Ok(text)) => {
            let text = text.trim();
            if text.is_empty() {
                AugmentOutcome::Empty
            } else {
                AugmentOutcome::Generated(text.to_string())
            }
        }
    }
}

// ============================================================================
// OpenAI-compatible client (production)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client
pub struct OpenAiGenerator {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiGenerator {
    /// Build from config. `Ok(None)` when no credential is configured.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>, AugmentError> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };

        // Above the dispatcher deadline so the timeout race decides, not reqwest.
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.saturating_mul(2).max(1)))
            .build()?;

        info!(
            "[BOOT] Augmented answers enabled ({} via {})",
            config.model, config.endpoint
        );
        Ok(Some(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }))
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, AugmentError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            "[QUERY] LLM call [{}] {} ({} chars)",
            self.model,
            prompt.category,
            prompt.user.len()
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AugmentError::Status(response.status().as_u16()));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!("[QUERY] LLM reply ({} chars)", content.len());
        Ok(content)
    }
}

// ============================================================================
// Fake generator (testing)
// ============================================================================

/// Scripted behaviour for `FakeGenerator`.
#[derive(Debug, Clone)]
pub enum FakeReply {
    Text(String),
    /// Reply after a delay, for deadline tests under a paused clock.
    Delayed(Duration, String),
    Status(u16),
}

/// Fake text generator for deterministic testing
pub struct FakeGenerator {
    reply: FakeReply,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(reply: FakeReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(FakeReply::Text(text.to_string()))
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, AugmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            FakeReply::Text(text) => Ok(text.clone()),
            FakeReply::Delayed(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            FakeReply::Status(code) => Err(AugmentError::Status(*code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_common::MatchConfig;

    fn day_five() -> MatchState {
        MatchConfig::default().initial_state().unwrap()
    }

    #[test]
    fn test_prompt_carries_state() {
        let state = day_five();
        let prompt = build_prompt(Category::Probability, "  Can India draw?  ", &state);
        assert_eq!(prompt.category, Category::Probability);
        assert!(prompt.user.contains("Score: 27/2"));
        assert!(prompt.user.contains("Overs played: 6.0"));
        assert!(prompt.user.contains("P(Draw): 35%"));
        assert!(prompt.user.contains("User Question: Can India draw?\n"));
        assert!(prompt.system.contains("cricket"));
    }

    #[test]
    fn test_prompt_per_category() {
        let state = day_five();
        let stats = build_prompt(Category::Stats, "score", &state);
        assert!(stats.user.contains("Runs needed: 522"));
        let momentum = build_prompt(Category::Momentum, "momentum", &state);
        assert!(momentum.user.contains("Recent events: None"));
        let tactical = build_prompt(Category::Tactical, "why", &state);
        assert!(tactical.user.contains("Current batter: Sai Sudharsan (2* runs)"));
    }

    #[tokio::test]
    async fn test_augment_disabled() {
        let prompt = build_prompt(Category::Stats, "score", &day_five());
        let outcome = augment(None, &prompt, Duration::from_secs(2)).await;
        assert!(matches!(outcome, AugmentOutcome::Disabled));
    }

    #[tokio::test]
    async fn test_augment_trims_and_flags_empty() {
        let prompt = build_prompt(Category::Stats, "score", &day_five());

        let fake = FakeGenerator::text("  27 for 2.  ");
        match augment(Some(&fake), &prompt, Duration::from_secs(2)).await {
            AugmentOutcome::Generated(text) => assert_eq!(text, "27 for 2."),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let blank = FakeGenerator::text(" \n ");
        assert!(matches!(
            augment(Some(&blank), &prompt, Duration::from_secs(2)).await,
            AugmentOutcome::Empty
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_augment_deadline() {
        let prompt = build_prompt(Category::Stats, "score", &day_five());
        let slow = FakeGenerator::new(FakeReply::Delayed(
            Duration::from_secs(10),
            "late".to_string(),
        ));
        let outcome = augment(Some(&slow), &prompt, Duration::from_secs(2)).await;
        assert!(matches!(outcome, AugmentOutcome::TimedOut));
        assert_eq!(slow.call_count(), 1);
    }

    #[tokio::test]
    async fn test_augment_failure() {
        let prompt = build_prompt(Category::Stats, "score", &day_five());
        let failing = FakeGenerator::new(FakeReply::Status(503));
        assert!(matches!(
            augment(Some(&failing), &prompt, Duration::from_secs(2)).await,
            AugmentOutcome::Failed(AugmentError::Status(503))
        ));
    }

    #[test]
    fn test_no_client_without_key() {
        let config = LlmConfig::default();
        assert!(OpenAiGenerator::from_config(&config).unwrap().is_none());
    }
}
