//! Crease common library - match model, validation, transitions, probability.
//!
//! Everything in here is synchronous and free of network I/O. The daemon crate
//! (`creased`) owns the async plumbing around it.

pub mod config;
pub mod error;
pub mod model;
pub mod overs;
pub mod probability;
pub mod transition;
pub mod validate;

pub use config::{Config, MatchConfig};
pub use error::{ConfigError, ValidationError};
pub use model::{
    Batter, DismissalMode, DismissedPlayer, Event, EventKind, MatchState, StateFingerprint,
};
pub use overs::Overs;
pub use transition::apply;
pub use validate::{validate, RawEvent};

/// Maximum wickets in an innings.
pub const MAX_WICKETS: u8 = 10;

/// Default number of events kept in the recent-events log.
pub const RECENT_EVENTS_WINDOW: usize = 50;
