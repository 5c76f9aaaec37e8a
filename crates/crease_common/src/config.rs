//! Configuration management.
//!
//! Loads settings from `$CREASE_CONFIG`, then /etc/crease/config.toml, or uses
//! defaults. Environment variables are applied on top of whatever was loaded.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::model::{Batter, DismissedPlayer, MatchState};
use crate::overs::Overs;
use crate::probability::{P_MAX, P_MIN, TOTAL_OVERS_BUDGET};
use crate::{MAX_WICKETS, RECENT_EVENTS_WINDOW};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/crease/config.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "CREASE_CONFIG";

/// Environment variable holding the text-generation credential
pub const LLM_CREDENTIAL_ENV: &str = "OPENAI_API_KEY";

/// Starting position of the tracked innings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_match_id")]
    pub match_id: String,

    #[serde(default = "default_batting_side")]
    pub batting_side: String,

    #[serde(default = "default_bowling_side")]
    pub bowling_side: String,

    #[serde(default = "default_target")]
    pub target: u32,

    /// Overs available to the batting side
    #[serde(default = "default_overs_budget")]
    pub overs_budget: u32,

    #[serde(default = "default_initial_runs")]
    pub initial_runs: u32,

    #[serde(default = "default_initial_wickets")]
    pub initial_wickets: u8,

    #[serde(default = "default_initial_overs")]
    pub initial_overs: Overs,

    #[serde(default = "default_batter_name")]
    pub batter_name: String,

    #[serde(default = "default_batter_runs")]
    pub batter_runs: u32,

    #[serde(default = "default_batter_balls")]
    pub batter_balls: u32,

    #[serde(default = "default_initial_p_draw")]
    pub initial_p_draw: f64,

    /// Dismissals known before tracking started
    #[serde(default)]
    pub dismissed: Vec<DismissedPlayer>,

    /// Events stamped before this are refused. Unset, the first event may
    /// carry any timestamp.
    #[serde(default)]
    pub start_time: Option<DateTime<FixedOffset>>,
}

fn default_match_id() -> String {
    "117380".to_string()
}

fn default_batting_side() -> String {
    "India".to_string()
}

fn default_bowling_side() -> String {
    "South Africa".to_string()
}

fn default_target() -> u32 {
    549
}

fn default_overs_budget() -> u32 {
    TOTAL_OVERS_BUDGET
}

fn default_initial_runs() -> u32 {
    27 // stumps on day four
}

fn default_initial_wickets() -> u8 {
    2
}

fn default_initial_overs() -> Overs {
    Overs::from_whole(6)
}

fn default_batter_name() -> String {
    "Sai Sudharsan".to_string()
}

fn default_batter_runs() -> u32 {
    2
}

fn default_batter_balls() -> u32 {
    4
}

fn default_initial_p_draw() -> f64 {
    0.35
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_id: default_match_id(),
            batting_side: default_batting_side(),
            bowling_side: default_bowling_side(),
            target: default_target(),
            overs_budget: default_overs_budget(),
            initial_runs: default_initial_runs(),
            initial_wickets: default_initial_wickets(),
            initial_overs: default_initial_overs(),
            batter_name: default_batter_name(),
            batter_runs: default_batter_runs(),
            batter_balls: default_batter_balls(),
            initial_p_draw: default_initial_p_draw(),
            dismissed: Vec::new(),
            start_time: None,
        }
    }
}

impl MatchConfig {
    /// Build the initial state, refusing a configuration that would start the
    /// engine outside its own invariants.
    pub fn initial_state(&self) -> Result<MatchState, ConfigError> {
        if self.initial_wickets > MAX_WICKETS {
            return Err(ConfigError::InvalidValue {
                key: "match.initial_wickets".to_string(),
                reason: format!("{} exceeds {}", self.initial_wickets, MAX_WICKETS),
            });
        }
        if !(P_MIN..=P_MAX).contains(&self.initial_p_draw) {
            return Err(ConfigError::InvalidValue {
                key: "match.initial_p_draw".to_string(),
                reason: format!("{} is outside [{}, {}]", self.initial_p_draw, P_MIN, P_MAX),
            });
        }
        if self.overs_budget == 0 {
            return Err(ConfigError::InvalidValue {
                key: "match.overs_budget".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(MatchState {
            match_id: self.match_id.clone(),
            batting_side: self.batting_side.clone(),
            bowling_side: self.bowling_side.clone(),
            total_runs: self.initial_runs,
            wickets_lost: self.initial_wickets,
            overs_played: self.initial_overs,
            target: self.target,
            overs_budget: self.overs_budget,
            current_batter: Batter::new(
                self.batter_name.clone(),
                self.batter_runs,
                self.batter_balls,
            ),
            dismissed_players: self.dismissed.clone(),
            recent_events: Vec::new(),
            p_draw: self.initial_p_draw,
            last_updated: self.start_time,
        })
    }
}

/// Ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Events kept in the recent-events log
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// Pending candidates before submitters wait
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_recent_window() -> usize {
    RECENT_EVENTS_WINDOW
}

fn default_queue_capacity() -> usize {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recent_window: default_recent_window(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Upstream event feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_true")]
    pub auto_poll: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_true")]
    pub fetch_history: bool,

    /// Endpoint returning the latest event record as JSON
    #[serde(default)]
    pub feed_url: Option<String>,

    /// Endpoint returning known dismissals as JSON
    #[serde(default)]
    pub history_url: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    5
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            auto_poll: true,
            poll_interval_secs: default_poll_interval(),
            fetch_history: true,
            feed_url: None,
            history_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Text-generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Deadline for one augmented response in milliseconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Never read from the config file; only from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u64 {
    2_000
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            timeout_ms: default_llm_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key: None,
        }
    }
}

impl LlmConfig {
    /// The augmented path only exists when a credential is present.
    pub fn enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    #[serde(default = "default_augmented_ttl")]
    pub augmented_ttl_secs: u64,

    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl_secs: u64,
}

fn default_cache_capacity() -> usize {
    512
}

fn default_augmented_ttl() -> u64 {
    600
}

fn default_fallback_ttl() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            augmented_ttl_secs: default_augmented_ttl(),
            fallback_ttl_secs: default_fallback_ttl(),
        }
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, rename = "match")]
    pub match_setup: MatchConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load from an explicit path, `$CREASE_CONFIG`, the system path, or
    /// defaults, then apply environment overrides.
    ///
    /// An explicit path that cannot be read is an error; a missing system
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
        let mut config = match path {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::load_from_path(Path::new(CONFIG_PATH)).unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            }),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: shown.clone(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: shown.clone(),
            source,
        })?;
        info!("Loaded config from {}", shown);
        Ok(config)
    }

    /// Apply `AUTO_POLL`, `POLL_INTERVAL`, `FETCH_HISTORY`, the feed URLs and
    /// the LLM credential from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AUTO_POLL") {
            self.feed.auto_poll = parse_bool("AUTO_POLL", &v)?;
        }
        if let Some(v) = lookup("POLL_INTERVAL") {
            let secs: u64 = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "POLL_INTERVAL".to_string(),
                reason: format!("'{}' is not a whole number of seconds", v),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "POLL_INTERVAL".to_string(),
                    reason: "must be at least 1 second".to_string(),
                });
            }
            self.feed.poll_interval_secs = secs;
        }
        if let Some(v) = lookup("FETCH_HISTORY") {
            self.feed.fetch_history = parse_bool("FETCH_HISTORY", &v)?;
        }
        if let Some(v) = lookup("CREASE_FEED_URL") {
            self.feed.feed_url = Some(v);
        }
        if let Some(v) = lookup("CREASE_HISTORY_URL") {
            self.feed.history_url = Some(v);
        }
        if let Some(v) = lookup(LLM_CREDENTIAL_ENV) {
            if !v.trim().is_empty() {
                self.llm.api_key = Some(v);
            }
        }
        Ok(())
    }

    /// Initial state from the `[match]` section.
    pub fn initial_state(&self) -> Result<MatchState, ConfigError> {
        self.match_setup.initial_state()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.feed.auto_poll);
        assert_eq!(config.feed.poll_interval_secs, 30);
        assert!(config.feed.fetch_history);
        assert_eq!(config.llm.timeout_ms, 2_000);
        assert_eq!(config.engine.recent_window, 50);
        assert!(!config.llm.enabled());
        assert_eq!(config.match_setup.initial_overs.to_string(), "6.0");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("AUTO_POLL", "false"),
                ("POLL_INTERVAL", "10"),
                ("FETCH_HISTORY", "No"),
                ("OPENAI_API_KEY", "sk-test"),
            ]))
            .unwrap();
        assert!(!config.feed.auto_poll);
        assert_eq!(config.feed.poll_interval_secs, 10);
        assert!(!config.feed.fetch_history);
        assert!(config.llm.enabled());
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("AUTO_POLL", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = config.apply_env(env(&[("POLL_INTERVAL", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_blank_credential_keeps_path_disabled() {
        let mut config = Config::default();
        config.apply_env(env(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert!(!config.llm.enabled());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[match]
batting_side = "England"
bowling_side = "Australia"
target = 384
initial_runs = 12
initial_wickets = 0
initial_overs = 3.2

[llm]
model = "custom-mini"
timeout_ms = 1500
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.match_setup.batting_side, "England");
        assert_eq!(config.match_setup.initial_overs.to_string(), "3.2");
        assert_eq!(config.llm.model, "custom-mini");
        assert_eq!(config.llm.timeout_ms, 1500);
        // Defaults for missing fields
        assert_eq!(config.llm.max_tokens, 150);
        assert_eq!(config.cache.fallback_ttl_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[feed]\npoll_interval_secs = 45").unwrap();
        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.feed.poll_interval_secs, 45);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let err = Config::load_from_path(Path::new("/nonexistent/crease.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_initial_state() {
        let state = MatchConfig::default().initial_state().unwrap();
        assert_eq!(state.total_runs, 27);
        assert_eq!(state.wickets_lost, 2);
        assert_eq!(state.current_batter.name, "Sai Sudharsan");
        assert_eq!(state.last_updated, None);
    }

    #[test]
    fn test_start_time_from_toml() {
        let config: Config = toml::from_str(
            r#"
[match]
start_time = "2025-11-26T09:30:00+05:30"
"#,
        )
        .unwrap();
        let start = DateTime::parse_from_rfc3339("2025-11-26T09:30:00+05:30").unwrap();
        let state = config.initial_state().unwrap();
        assert_eq!(state.last_updated, Some(start));
    }

    #[test]
    fn test_initial_state_rejects_bad_values() {
        let setup = MatchConfig {
            initial_wickets: 11,
            ..MatchConfig::default()
        };
        assert!(setup.initial_state().is_err());

        let setup = MatchConfig {
            initial_p_draw: 0.99,
            ..MatchConfig::default()
        };
        assert!(setup.initial_state().is_err());
    }
}
