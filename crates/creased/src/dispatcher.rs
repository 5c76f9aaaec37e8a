//! Response dispatcher.
//!
//! Same shape for every category: cache, then the augmented path under a
//! deadline, then the deterministic formatter. Never returns an error; the
//! caller always gets displayable text.

use crease_common::config::{CacheConfig, LlmConfig};
use crease_common::MatchState;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, ResponseCache};
use crate::deterministic;
use crate::llm::{augment, build_prompt, AugmentOutcome, TextGenerator};
use crate::router::{classify, Category};

/// Which path produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Augmented,
    Deterministic,
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Augmented => f.write_str("augmented"),
            Self::Deterministic => f.write_str("deterministic"),
        }
    }
}

/// A routed, answered query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub category: Category,
    pub text: String,
    pub source: AnswerSource,
    pub cached: bool,
}

#[derive(Clone)]
pub struct Dispatcher {
    generator: Option<Arc<dyn TextGenerator>>,
    cache: ResponseCache,
    deadline: Duration,
    augmented_ttl: Duration,
    fallback_ttl: Duration,
}

impl Dispatcher {
    /// `generator` is `None` when no credential is configured; the augmented
    /// path is then skipped entirely.
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        llm: &LlmConfig,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            generator,
            cache: ResponseCache::new(cache.capacity),
            deadline: Duration::from_millis(llm.timeout_ms),
            augmented_ttl: Duration::from_secs(cache.augmented_ttl_secs),
            fallback_ttl: Duration::from_secs(cache.fallback_ttl_secs),
        }
    }

    /// Dispatcher with the augmented path disabled.
    pub fn deterministic_only() -> Self {
        Self::new(None, &LlmConfig::default(), &CacheConfig::default())
    }

    pub fn augmented_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Classify `query` and answer it.
    pub async fn answer(&self, query: &str, state: &MatchState) -> Answer {
        let category = classify(query);
        self.answer_in(category, query, state).await
    }

    /// Answer text for an already-classified query.
    pub async fn respond(&self, category: Category, query: &str, state: &MatchState) -> String {
        self.answer_in(category, query, state).await.text
    }

    pub async fn answer_in(&self, category: Category, query: &str, state: &MatchState) -> Answer {
        let Some(generator) = self.generator.as_deref() else {
            return Answer {
                category,
                text: deterministic::answer(category, query, state),
                source: AnswerSource::Deterministic,
                cached: false,
            };
        };

        let key = cache_key(category, query, &state.fingerprint());
        if let Some(hit) = self.cache.get(&key).await {
            debug!("[QUERY] Cache hit ({}, {})", category, hit.source);
            return Answer {
                category,
                text: hit.text,
                source: hit.source,
                cached: true,
            };
        }

        let prompt = build_prompt(category, query, state);
        let (text, source, ttl) = match augment(Some(generator), &prompt, self.deadline).await {
            AugmentOutcome::Generated(text) => {
                (text, AnswerSource::Augmented, self.augmented_ttl)
            }
            outcome => {
                match &outcome {
                    AugmentOutcome::TimedOut => warn!(
                        "[QUERY] Augmented {} answer timed out after {:?}, using fallback",
                        category, self.deadline
                    ),
                    AugmentOutcome::Failed(e) => {
                        warn!("[QUERY] Augmented {} answer failed: {}, using fallback", category, e)
                    }
                    _ => warn!("[QUERY] Augmented {} answer was empty, using fallback", category),
                }
                (
                    deterministic::answer(category, query, state),
                    AnswerSource::Deterministic,
                    self.fallback_ttl,
                )
            }
        };

        info!("[QUERY] {} answered ({})", category, source);
        self.cache.insert(key, text.clone(), source, ttl).await;
        Answer {
            category,
            text,
            source,
            cached: false,
        }
    }
}
