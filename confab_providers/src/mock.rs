//! Offline backend used as the default and in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;

use confab_core::{BlockPayload, ChatBackend, Content, Message, ProviderError, Role, WireMessage};

/// Models the real call shape (latency included) without any network.
/// Replies deterministically enumerate the input blocks in order, so
/// ordering and multi-block behavior can be asserted against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

const SIMULATED_DELAY: Duration = Duration::from_millis(100);

impl MockBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn describe_block(index: usize, payload: &BlockPayload) -> String {
        let item = index + 1;
        match payload {
            BlockPayload::Text(text) => format!("item {item}: text - {text}"),
            BlockPayload::Image(reference) => format!("item {item}: image - {reference}"),
            BlockPayload::Json(value) => {
                let fields = value.as_object().map_or(0, serde_json::Map::len);
                format!("item {item}: json - object with {fields} field(s)")
            }
        }
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn normalize(&self, history: &[Message], input: &Content) -> Vec<WireMessage> {
        let mut wire: Vec<WireMessage> = history
            .iter()
            .map(|message| WireMessage::new(message.role, Value::String(message.display_text())))
            .collect();
        wire.push(WireMessage::text(Role::User, input.display_text()));
        wire
    }

    async fn complete(
        &self,
        history: &[Message],
        input: &Content,
    ) -> Result<String, ProviderError> {
        sleep(SIMULATED_DELAY).await;

        let mut parts = vec!["I went through your content in the given order:".to_string()];
        for (index, block) in input.blocks().iter().enumerate() {
            parts.push(Self::describe_block(index, block.payload()));
        }

        let prior_user_turns = history
            .iter()
            .filter(|message| message.role == Role::User)
            .count();
        parts.push(format!(
            "This is interaction #{} in our conversation.",
            prior_user_turns + 1
        ));

        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use confab_core::ContentItem;
    use serde_json::json;

    #[tokio::test]
    async fn reply_enumerates_blocks_in_order() {
        let input = Content::from_items([
            ContentItem::text("a"),
            ContentItem::json(json!({"k": 1})),
        ]);

        let reply = MockBackend::new().complete(&[], &input).await.unwrap();
        assert!(reply.contains("item 1: text - a"));
        assert!(reply.contains("item 2: json - object with 1 field(s)"));

        let text_pos = reply.find("item 1").unwrap();
        let json_pos = reply.find("item 2").unwrap();
        assert!(text_pos < json_pos);
    }

    #[tokio::test]
    async fn interaction_counter_tracks_prior_user_turns() {
        let history = vec![
            Message::text(Role::System, "be brief"),
            Message::text(Role::User, "hi"),
            Message::text(Role::Assistant, "hello"),
        ];

        let reply = MockBackend::new()
            .complete(&history, &Content::text("again"))
            .await
            .unwrap();
        assert!(reply.contains("interaction #2"));
    }

    #[tokio::test]
    async fn normalize_appends_input_after_history() {
        let history = vec![Message::text(Role::User, "hi")];
        let wire = MockBackend::new().normalize(&history, &Content::text("next"));

        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[1].content, json!("next"));
    }
}
