//! In-memory conversation state with durable export.
//!
//! The store owns every [`History`]: exactly one per conversation id,
//! created lazily on the first append and removed only by explicit
//! eviction. Read paths are total and use sentinel returns; the one
//! hard error is exporting an unknown conversation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use confab_core::{History, Message};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("conversation not found: {0}")]
    NotFound(String),

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("export serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Process-wide map from conversation id to its history.
///
/// All map access goes through one mutex so appends stay atomic under a
/// multi-threaded runtime.
pub struct HistoryStore {
    conversations: Mutex<HashMap<String, History>>,
    save_dir: PathBuf,
}

impl HistoryStore {
    #[must_use]
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            save_dir: save_dir.into(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, History>> {
        self.conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn exists(&self, conversation_id: &str) -> bool {
        self.lock().contains_key(conversation_id)
    }

    /// Messages in append order; empty when the id is unknown.
    #[must_use]
    pub fn messages(&self, conversation_id: &str) -> Vec<Message> {
        self.lock()
            .get(conversation_id)
            .map(|history| history.messages.clone())
            .unwrap_or_default()
    }

    /// Message count, or `-1` when the id is unknown. Callers that must
    /// tell "unknown" from "empty" check [`Self::exists`] first.
    #[must_use]
    pub fn message_count(&self, conversation_id: &str) -> i64 {
        self.lock().get(conversation_id).map_or(-1, |history| {
            i64::try_from(history.messages.len()).unwrap_or(i64::MAX)
        })
    }

    /// Append a message, creating the history on first use. The only
    /// mutator of conversation state.
    pub fn save_message(&self, conversation_id: &str, message: Message) {
        let now = Utc::now();
        let mut conversations = self.lock();
        let history = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| History::new_at(conversation_id, now));
        history.append_at(message, now);
        debug!(
            "Saved {} message to {conversation_id} ({} total)",
            history.messages.last().map_or("?", |m| m.role.as_str()),
            history.messages.len()
        );
    }

    /// Serialize the full history to a timestamped JSON file and return
    /// its location. The in-memory copy is left untouched.
    pub async fn export(&self, conversation_id: &str) -> Result<PathBuf, HistoryError> {
        let snapshot = self
            .lock()
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| HistoryError::NotFound(conversation_id.to_string()))?;

        fs::create_dir_all(&self.save_dir).await?;
        let filename = format!(
            "{conversation_id}_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.save_dir.join(filename);
        let encoded = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&path, encoded).await?;

        info!(
            "Exported conversation {conversation_id} ({} messages) to {}",
            snapshot.messages.len(),
            path.display()
        );
        Ok(path)
    }

    /// Drop the in-memory history. A no-op for unknown ids; exported
    /// files are not touched.
    pub fn evict(&self, conversation_id: &str) {
        if self.lock().remove(conversation_id).is_some() {
            debug!("Evicted conversation {conversation_id}");
        }
    }

    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }
}
