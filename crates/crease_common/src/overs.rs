//! Overs arithmetic.
//!
//! Cricket writes overs as `whole.balls`, so `7.1` is seven overs and one ball,
//! not seven and a tenth. Comparing or subtracting the decimal directly gives
//! wrong answers past the fifth ball, hence the dedicated type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Legal deliveries in an over.
pub const BALLS_PER_OVER: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Overs {
    whole: u32,
    balls: u8,
}

impl Overs {
    /// Build from whole overs and balls into the current over (0..=5).
    pub fn new(whole: u32, balls: u8) -> Option<Self> {
        if u32::from(balls) >= BALLS_PER_OVER {
            return None;
        }
        Some(Self { whole, balls })
    }

    /// Completed overs with no balls into the next.
    pub fn from_whole(whole: u32) -> Self {
        Self { whole, balls: 0 }
    }

    pub fn whole(&self) -> u32 {
        self.whole
    }

    pub fn balls(&self) -> u8 {
        self.balls
    }

    /// Total legal deliveries bowled. Wide enough for any `u32` of overs.
    pub fn total_balls(&self) -> u64 {
        u64::from(self.whole) * u64::from(BALLS_PER_OVER) + u64::from(self.balls)
    }

    /// Overs as a real number (`7.3` -> 7.5).
    pub fn as_f64(&self) -> f64 {
        f64::from(self.whole) + f64::from(self.balls) / f64::from(BALLS_PER_OVER)
    }

    /// Overs left out of `budget`, never negative.
    pub fn remaining_of(&self, budget: u32) -> f64 {
        (f64::from(budget) - self.as_f64()).max(0.0)
    }

    /// Parse a JSON number or string in `overs.balls` notation.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, String> {
        match value {
            serde_json::Value::Number(n) => {
                let f = n
                    .as_f64()
                    .ok_or_else(|| format!("not a finite number: {}", n))?;
                // f64 Display is the shortest round-trip form, so 7.1 prints "7.1"
                f.to_string().parse()
            }
            serde_json::Value::String(s) => s.parse(),
            other => Err(format!("expected number or string, got {}", other)),
        }
    }
}

impl FromStr for Overs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole_part, balls_part) = match s.split_once('.') {
            Some((w, b)) => (w, Some(b)),
            None => (s, None),
        };

        let whole: u32 = whole_part
            .parse()
            .map_err(|_| format!("invalid whole overs in '{}'", s))?;

        let balls = match balls_part {
            None | Some("") => 0,
            Some(b) if b.len() == 1 => b
                .parse::<u8>()
                .map_err(|_| format!("invalid balls in '{}'", s))?,
            Some(_) => return Err(format!("balls must be a single digit in '{}'", s)),
        };

        Overs::new(whole, balls).ok_or_else(|| format!("an over has six balls, got '{}'", s))
    }
}

impl Ord for Overs {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_balls().cmp(&other.total_balls())
    }
}

impl PartialOrd for Overs {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Overs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole, self.balls)
    }
}

impl Serialize for Overs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Overs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Overs::from_json(&value).map_err(serde::de::Error::custom)
    }
}
