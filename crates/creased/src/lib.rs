//! Crease daemon library - exposes modules for testing.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod deterministic;
pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod history;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod repl;
pub mod router;
pub mod state;

pub use dispatcher::{Answer, AnswerSource, Dispatcher};
pub use error::{AugmentError, FetchError, IngestError};
pub use ingest::{ingest_channel, IngestHandle, Ingestor};
pub use router::{classify, Category};
pub use state::{create_shared_state, StateReader, StateWriter};
