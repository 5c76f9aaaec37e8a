//! Error types for the match engine.

use thiserror::Error;

use crate::overs::Overs;

/// Why a candidate event was refused.
///
/// Every variant is recoverable: the current state is left untouched and the
/// caller learns which field or rule failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("malformed {field}: {reason}")]
    MalformedField { field: &'static str, reason: String },

    #[error("overs went backwards: {current} -> {candidate}")]
    OversRegressed { current: Overs, candidate: Overs },

    #[error("timestamp {candidate} is earlier than last accepted event at {current}")]
    TimestampRegressed { current: String, candidate: String },

    #[error("{field} went backwards: {current} -> {candidate}")]
    TotalsRegressed {
        field: &'static str,
        current: i64,
        candidate: i64,
    },

    #[error("{field} cannot be negative (got {value})")]
    NegativeRuns { field: &'static str, value: i64 },

    #[error("cannot lose more than 10 wickets (would be {wickets})")]
    WicketOverflow { wickets: i64 },

    #[error("wicket event leaves wickets at {wickets}")]
    WicketNotCounted { wickets: i64 },
}

impl ValidationError {
    /// Short stable identifier, used in logs and replay output.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::MalformedField { .. } => "malformed_field",
            ValidationError::OversRegressed { .. } => "overs_regressed",
            ValidationError::TimestampRegressed { .. } => "timestamp_regressed",
            ValidationError::TotalsRegressed { .. } => "totals_regressed",
            ValidationError::NegativeRuns { .. } => "negative_runs",
            ValidationError::WicketOverflow { .. } => "wicket_overflow",
            ValidationError::WicketNotCounted { .. } => "wicket_not_counted",
        }
    }

    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::MalformedField {
            field,
            reason: reason.into(),
        }
    }
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
