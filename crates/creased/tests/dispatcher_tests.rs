//! Deterministic dispatch tests.
//!
//! These tests use FakeGenerator to verify every branch of the answer path
//! without any network calls: augmented success, timeout, failure, empty
//! reply and the disabled path.

use chrono::DateTime;
use crease_common::config::{CacheConfig, LlmConfig};
use crease_common::{apply, validate, EventKind, MatchConfig, MatchState, RawEvent};
use creased::deterministic;
use creased::llm::{FakeGenerator, FakeReply, TextGenerator};
use creased::{classify, AnswerSource, Category, Dispatcher};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Helpers
// ============================================================================

fn day_five() -> MatchState {
    MatchConfig::default().initial_state().unwrap()
}

fn with_fake(fake: Arc<FakeGenerator>) -> Dispatcher {
    let generator: Arc<dyn TextGenerator> = fake;
    Dispatcher::new(Some(generator), &LlmConfig::default(), &CacheConfig::default())
}

const QUERIES: [&str; 8] = [
    "What's the score?",
    "Can India draw?",
    "Why did Jaiswal get out?",
    "What just happened?",
    "how many wickets left",
    "who has the momentum",
    "odds of a result",
    "",
];

// ============================================================================
// Router corpus
// ============================================================================

#[test]
fn test_router_corpus() {
    let corpus = [
        ("What's the score?", Category::Stats),
        ("Can India draw?", Category::Probability),
        ("Why did Jaiswal get out?", Category::Tactical),
        ("What just happened?", Category::Momentum),
        ("How many overs are left?", Category::Stats),
        ("Who is batting?", Category::Stats),
        ("Are India in trouble?", Category::Momentum),
        ("Is South Africa likely to win?", Category::Probability),
        ("How was Rahul dismissed?", Category::Tactical),
        ("Tell me a joke", Category::Stats),
    ];
    for (query, expected) in corpus {
        assert_eq!(classify(query), expected, "query: {:?}", query);
    }
}

// ============================================================================
// Disabled path
// ============================================================================

#[tokio::test]
async fn test_disabled_path_is_formatter_output() {
    let dispatcher = Dispatcher::deterministic_only();
    let state = day_five();

    for query in QUERIES {
        let category = classify(query);
        let first = dispatcher.respond(category, query, &state).await;
        let second = dispatcher.respond(category, query, &state).await;
        assert_eq!(first, deterministic::answer(category, query, &state));
        assert_eq!(first, second, "not reproducible for {:?}", query);
        assert!(!first.is_empty());
    }
}

#[tokio::test]
async fn test_disabled_path_tracks_state() {
    let dispatcher = Dispatcher::deterministic_only();
    let state = day_five();
    let raw = RawEvent::new(
        EventKind::Runs,
        "2025-11-26T09:10:00+05:30",
        31,
        2,
        "7.1",
    )
    .with_runs(4);
    let next = apply(&state, &validate(&raw, &state).unwrap(), 50);

    let before = dispatcher.answer("score", &state).await;
    let after = dispatcher.answer("score", &next).await;
    assert!(before.text.starts_with("India 27/2 in 6.0 overs"));
    assert!(after.text.starts_with("India 31/2 in 7.1 overs"));
}

// ============================================================================
// Augmented path
// ============================================================================

#[tokio::test]
async fn test_augmented_reply_wins() {
    let fake = Arc::new(FakeGenerator::text("India will need to bat all day."));
    let dispatcher = with_fake(fake.clone());

    let answer = dispatcher.answer("Can India draw?", &day_five()).await;
    assert_eq!(answer.category, Category::Probability);
    assert_eq!(answer.source, AnswerSource::Augmented);
    assert_eq!(answer.text, "India will need to bat all day.");
    assert_eq!(fake.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_falls_back_within_deadline() {
    let fake = Arc::new(FakeGenerator::new(FakeReply::Delayed(
        Duration::from_secs(30),
        "too late".to_string(),
    )));
    let dispatcher = with_fake(fake.clone());
    let state = day_five();

    let started = tokio::time::Instant::now();
    let answer = dispatcher.answer("What's the score?", &state).await;
    let waited = started.elapsed();

    assert_eq!(answer.source, AnswerSource::Deterministic);
    assert_eq!(
        answer.text,
        deterministic::answer(Category::Stats, "What's the score?", &state)
    );
    assert!(waited <= Duration::from_millis(2_000) + Duration::from_millis(50));
}

#[tokio::test]
async fn test_failure_and_empty_fall_back() {
    let state = day_five();

    for reply in [FakeReply::Status(500), FakeReply::Text("   ".to_string())] {
        let dispatcher = with_fake(Arc::new(FakeGenerator::new(reply)));
        let answer = dispatcher.answer("What just happened?", &state).await;
        assert_eq!(answer.category, Category::Momentum);
        assert_eq!(answer.source, AnswerSource::Deterministic);
        assert_eq!(answer.text, "Match is balanced, both teams fighting.");
    }
}

#[tokio::test(start_paused = true)]
async fn test_fallback_cached_for_short_ttl() {
    let fake = Arc::new(FakeGenerator::new(FakeReply::Status(503)));
    let dispatcher = with_fake(fake.clone());
    let state = day_five();

    dispatcher.answer("Can India draw?", &state).await;
    let again = dispatcher.answer("Can India draw?", &state).await;
    assert!(again.cached);
    assert_eq!(fake.call_count(), 1);

    // Past the fallback TTL the augmented path is retried.
    tokio::time::advance(Duration::from_secs(31)).await;
    let retried = dispatcher.answer("Can India draw?", &state).await;
    assert!(!retried.cached);
    assert_eq!(fake.call_count(), 2);
}

#[tokio::test]
async fn test_cache_follows_fingerprint() {
    let fake = Arc::new(FakeGenerator::text("Steady."));
    let dispatcher = with_fake(fake.clone());
    let state = day_five();

    dispatcher.answer("score", &state).await;
    dispatcher.answer("score", &state).await;
    assert_eq!(fake.call_count(), 1);

    let mut moved = state.clone();
    moved.total_runs += 1;
    dispatcher.answer("score", &moved).await;
    assert_eq!(fake.call_count(), 2);

    // The event log is not part of the fingerprint.
    let mut logged = state.clone();
    logged.last_updated = Some(DateTime::parse_from_rfc3339("2025-11-26T10:00:00+05:30").unwrap());
    let answer = dispatcher.answer("score", &logged).await;
    assert!(answer.cached);
    assert_eq!(fake.call_count(), 2);
}

#[tokio::test]
async fn test_concurrent_queries_never_fail() {
    let fake = Arc::new(FakeGenerator::new(FakeReply::Status(502)));
    let dispatcher = with_fake(fake);
    let state = Arc::new(day_five());

    let mut tasks = Vec::new();
    for i in 0..32 {
        let dispatcher = dispatcher.clone();
        let state = state.clone();
        tasks.push(tokio::spawn(async move {
            let query = QUERIES[i % QUERIES.len()];
            dispatcher.answer(query, &state).await
        }));
    }
    for task in tasks {
        let answer = task.await.unwrap();
        assert!(!answer.text.is_empty());
        assert_eq!(answer.source, AnswerSource::Deterministic);
    }
}
