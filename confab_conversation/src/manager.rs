//! The turn pipeline: prepare, generate, persist.
//!
//! Each `chat` call runs the three stages strictly in order under one
//! unit of the admission gate. A failed generate stage surfaces to the
//! caller and leaves the stored history exactly as it was; the gate
//! unit is released on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use uuid::Uuid;

use confab_core::{ChatBackend, Content, Message, ProviderError, Role};

use crate::store::{HistoryError, HistoryStore};

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("turn gate closed")]
    GateClosed,
}

/// What one `chat` call produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The id passed in, or the one generated for a fresh conversation.
    pub conversation_id: String,
    /// Reply text; `None` when generation was skipped.
    pub reply: Option<String>,
    /// Stored message count after the persist stage.
    pub message_count: usize,
}

/// Multi-turn conversation orchestrator over a pluggable backend.
pub struct ConversationManager {
    backend: Arc<dyn ChatBackend>,
    store: Arc<HistoryStore>,
    gate: Arc<Semaphore>,
}

impl ConversationManager {
    /// `max_concurrent_turns` fixes the admission gate capacity for the
    /// manager's lifetime.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<HistoryStore>,
        max_concurrent_turns: usize,
    ) -> Self {
        Self {
            backend,
            store,
            gate: Arc::new(Semaphore::new(max_concurrent_turns)),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Run one turn.
    ///
    /// A missing `conversation_id` starts a fresh conversation; a
    /// missing `content` skips generation and persists nothing new; the
    /// `system_prompt` is applied only before the first stored message.
    pub async fn chat(
        &self,
        conversation_id: Option<String>,
        system_prompt: Option<&str>,
        content: Option<Content>,
    ) -> Result<TurnOutcome, ConversationError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ConversationError::GateClosed)?;

        let conversation_id =
            conversation_id.unwrap_or_else(|| Uuid::now_v7().to_string());
        debug!("Starting turn for conversation {conversation_id}");

        // Prepare: seed the system message on a conversation with no
        // stored messages yet.
        if let Some(prompt) = system_prompt {
            if self.store.message_count(&conversation_id) <= 0 {
                self.store
                    .save_message(&conversation_id, Message::text(Role::System, prompt));
            }
        }

        // Generate: only when the caller supplied new content.
        let reply = match &content {
            Some(input) => {
                let history = self.store.messages(&conversation_id);
                Some(self.backend.complete(&history, input).await?)
            }
            None => None,
        };

        // Persist: user turn first, then the reply.
        if let Some(input) = content {
            self.store
                .save_message(&conversation_id, Message::structured(Role::User, input));
        }
        if let Some(text) = &reply {
            self.store
                .save_message(&conversation_id, Message::text(Role::Assistant, text.clone()));
        }

        let message_count =
            usize::try_from(self.store.message_count(&conversation_id).max(0)).unwrap_or(0);
        info!("Completed turn for {conversation_id}: {message_count} stored messages");

        Ok(TurnOutcome {
            conversation_id,
            reply,
            message_count,
        })
    }

    /// Finish a conversation: optionally export it, then drop it from
    /// memory. Not part of the turn pipeline; safe to call repeatedly.
    pub async fn end(
        &self,
        conversation_id: &str,
        persist: bool,
    ) -> Result<Option<PathBuf>, ConversationError> {
        let location = if persist {
            Some(self.store.export(conversation_id).await?)
        } else {
            None
        };
        self.store.evict(conversation_id);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use async_trait::async_trait;
    use confab_core::{ContentItem, WireMessage};
    use confab_providers::MockBackend;
    use serde_json::json;
    use std::time::Duration;

    fn manager(max_concurrent_turns: usize) -> (tempfile::TempDir, ConversationManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(HistoryStore::new(dir.path()));
        let manager =
            ConversationManager::new(Arc::new(MockBackend::new()), store, max_concurrent_turns);
        (dir, manager)
    }

    #[derive(Debug)]
    struct FailingBackend;

    #[async_trait]
    impl ChatBackend for FailingBackend {
        fn normalize(&self, _history: &[Message], _input: &Content) -> Vec<WireMessage> {
            Vec::new()
        }

        async fn complete(
            &self,
            _history: &[Message],
            _input: &Content,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn first_turn_stores_system_user_and_reply() {
        let (_dir, manager) = manager(2);

        let outcome = manager
            .chat(None, Some("Be terse."), Some(Content::text("hi")))
            .await
            .unwrap();
        assert_eq!(outcome.message_count, 3);
        assert!(outcome.reply.is_some());

        let messages = manager.store().messages(&outcome.conversation_id);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn system_prompt_is_not_reinserted() {
        let (_dir, manager) = manager(2);

        let first = manager
            .chat(None, Some("Be terse."), Some(Content::text("hi")))
            .await
            .unwrap();
        let second = manager
            .chat(Some(first.conversation_id.clone()), None, Some(Content::text("more")))
            .await
            .unwrap();

        assert_eq!(second.message_count, 5);
        let system_count = manager
            .store()
            .messages(&first.conversation_id)
            .iter()
            .filter(|m| m.role == Role::System)
            .count();
        assert_eq!(system_count, 1);
    }

    #[tokio::test]
    async fn no_content_skips_generation_and_persistence() {
        let (_dir, manager) = manager(2);

        let outcome = manager.chat(Some("idle".to_string()), None, None).await.unwrap();
        assert!(outcome.reply.is_none());
        assert_eq!(outcome.message_count, 0);
        assert!(!manager.store().exists("idle"));
    }

    #[tokio::test]
    async fn failed_generation_leaves_history_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(HistoryStore::new(dir.path()));
        let manager = ConversationManager::new(Arc::new(FailingBackend), store, 2);

        let err = manager
            .chat(Some("c1".to_string()), None, Some(Content::text("hi")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConversationError::Provider(ProviderError::Status { status: 500, .. })
        ));
        assert!(!manager.store().exists("c1"));

        // The gate unit was released: the next turn still runs.
        let retry = manager.chat(Some("c1".to_string()), None, None).await;
        assert!(retry.is_ok());
    }

    #[tokio::test]
    async fn gate_admits_two_turns_at_a_time() {
        let (_dir, manager) = manager(2);
        let manager = Arc::new(manager);

        let start = tokio::time::Instant::now();
        let (a, b, c) = tokio::join!(
            manager.chat(Some("a".to_string()), None, Some(Content::text("x"))),
            manager.chat(Some("b".to_string()), None, Some(Content::text("x"))),
            manager.chat(Some("c".to_string()), None, Some(Content::text("x"))),
        );
        let elapsed = start.elapsed();

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        // Two 100ms generations run together, the third waits for a slot.
        assert!(elapsed >= Duration::from_millis(150), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(300), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn reply_reflects_ordered_blocks() {
        let (_dir, manager) = manager(2);

        let content = Content::from_items([
            ContentItem::text("a"),
            ContentItem::json(json!({"k": 1})),
        ]);
        let outcome = manager.chat(None, None, Some(content)).await.unwrap();

        let reply = outcome.reply.unwrap();
        assert!(reply.contains('a'));
        assert!(reply.contains("1 field(s)"));
    }

    #[tokio::test]
    async fn end_exports_then_evicts() {
        let (_dir, manager) = manager(2);

        let outcome = manager
            .chat(None, None, Some(Content::text("hi")))
            .await
            .unwrap();
        let id = outcome.conversation_id;

        let location = manager.end(&id, true).await.unwrap();
        let path = location.unwrap();
        assert!(path.exists());
        assert!(!manager.store().exists(&id));

        // Ending an already-ended conversation without persist is fine.
        assert!(manager.end(&id, false).await.unwrap().is_none());

        // With persist it is the explicit not-found condition.
        let err = manager.end(&id, true).await.unwrap_err();
        assert!(matches!(
            err,
            ConversationError::History(HistoryError::NotFound(_))
        ));
    }
}
