//! Deterministic query router.
//!
//! Case-insensitive keyword match, checked in a fixed priority order
//! (stats, momentum, probability, tactical). Anything unmatched is a stats
//! question.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Answer category for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Score, wickets, overs, target, who is batting
    Stats,
    /// What is happening, who is on top
    Momentum,
    /// Chances of a draw or a result
    Probability,
    /// Why and how something happened
    Tactical,
}

const STATS_KEYWORDS: &[&str] = &["score", "runs", "wickets", "overs", "batting", "target"];
const MOMENTUM_KEYWORDS: &[&str] = &["momentum", "happening", "happened", "situation", "trouble"];
const PROBABILITY_KEYWORDS: &[&str] = &["chance", "draw", "win", "probability", "odds", "likely"];
const TACTICAL_KEYWORDS: &[&str] = &["why", "how", "dismissed", "dismissal"];

/// Priority order. First category with a matching keyword wins.
const ROUTES: [(Category, &[&str]); 4] = [
    (Category::Stats, STATS_KEYWORDS),
    (Category::Momentum, MOMENTUM_KEYWORDS),
    (Category::Probability, PROBABILITY_KEYWORDS),
    (Category::Tactical, TACTICAL_KEYWORDS),
];

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Stats,
        Category::Momentum,
        Category::Probability,
        Category::Tactical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Momentum => "momentum",
            Self::Probability => "probability",
            Self::Tactical => "tactical",
        }
    }

    /// Prefix printed in front of an answer.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Stats => "[STATS]",
            Self::Momentum => "[MOMENTUM]",
            Self::Probability => "[PROBABILITY]",
            Self::Tactical => "[TACTICAL]",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stats" => Ok(Self::Stats),
            "momentum" => Ok(Self::Momentum),
            "probability" => Ok(Self::Probability),
            "tactical" => Ok(Self::Tactical),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// Classify a query. Total: every input maps to exactly one category.
pub fn classify(query: &str) -> Category {
    let q = query.to_lowercase();

    for (category, keywords) in ROUTES {
        if let Some(hit) = keywords.iter().find(|k| q.contains(*k)) {
            debug!("[QUERY] '{}' -> {} (keyword '{}')", query, category, hit);
            return category;
        }
    }

    debug!("[QUERY] '{}' -> stats (default)", query);
    Category::Stats
}
