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

//! Externally tunable values, collected into one explicit record.
//!
//! Library crates take a [`Config`] (or a section of it) at
//! construction time and never read the environment themselves;
//! [`Config::from_env`] is the single adapter that does, at the process
//! boundary.

mod schema;

pub use schema::{Config, HistorySettings, OllamaSettings, OpenAiSettings};
