//! The capability set every chat backend implements.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::content::Content;
use crate::error::ProviderError;
use crate::message::{Message, Role};

/// One message in a backend's wire format: a role string plus whatever
/// content shape that backend expects (plain string or part array).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: Value,
}

impl WireMessage {
    #[must_use]
    pub fn new(role: Role, content: Value) -> Self {
        Self {
            role: role.as_str().to_string(),
            content,
        }
    }

    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, Value::String(text.into()))
    }
}

/// A pluggable text/vision model backend.
///
/// Implementations normalize the generic content model into their own
/// request shape and produce reply text. Variants are selected at
/// construction time through the factory, never by runtime inspection.
#[async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Render `(prior messages, new input)` into this backend's wire
    /// messages.
    fn normalize(&self, history: &[Message], input: &Content) -> Vec<WireMessage>;

    /// Produce reply text for the new input given the prior messages.
    async fn complete(
        &self,
        history: &[Message],
        input: &Content,
    ) -> Result<String, ProviderError>;
}
