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

//! Core data model for structured multi-turn conversations.
//!
//! A single dialogue turn may carry several heterogeneous pieces of
//! content (free text, an image reference, a JSON payload). This crate
//! defines the ordered block model for such content, the message and
//! history types built on top of it, and the backend capability trait
//! that providers implement.

pub mod backend;
pub mod content;
pub mod error;
pub mod message;

pub use backend::{ChatBackend, WireMessage};
pub use content::{BlockKind, BlockPayload, Content, ContentBlock, ContentItem, Extras};
pub use error::ProviderError;
pub use message::{History, Message, MessageBody, Role};
