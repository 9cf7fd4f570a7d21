#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Multi-turn conversation state and the turn pipeline.
//!
//! [`HistoryStore`] owns all in-memory conversation histories and their
//! durable export; [`ConversationManager`] drives the prepare/generate/
//! persist pipeline against a pluggable backend, with a semaphore
//! bounding how many turns run at once.

mod manager;
mod store;

pub use manager::{ConversationError, ConversationManager, TurnOutcome};
pub use store::{HistoryError, HistoryStore};
