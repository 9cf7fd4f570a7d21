//! OpenAI-style chat-completions backend.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use confab_config::OpenAiSettings;
use confab_core::{BlockPayload, ChatBackend, Content, Message, ProviderError, Role, WireMessage};

use crate::image;

#[derive(Debug)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    image_base_dir: Option<PathBuf>,
}

impl OpenAiBackend {
    /// Fails fast when the credential is absent; a keyless backend would
    /// only ever produce 401s at call time.
    pub fn new(
        settings: &OpenAiSettings,
        image_base_dir: Option<PathBuf>,
    ) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::MissingCredential("OPENAI_API_KEY"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ProviderError::transport)?;

        info!("Creating OpenAiBackend for {}", settings.base_url);
        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            image_base_dir,
        })
    }

    fn image_url_for(&self, reference: &str) -> String {
        if image::is_remote(reference) {
            return reference.to_string();
        }
        match image::to_data_url(reference, self.image_base_dir.as_deref()) {
            Ok(data_url) => data_url,
            Err(err) => {
                warn!("Could not embed image {reference}: {err}");
                image::resolve(reference, self.image_base_dir.as_deref())
            }
        }
    }

    fn render_part(&self, payload: &BlockPayload) -> Value {
        match payload {
            BlockPayload::Text(text) => json!({"type": "text", "text": text}),
            BlockPayload::Image(reference) => json!({
                "type": "image_url",
                "image_url": {"url": self.image_url_for(reference)},
            }),
            BlockPayload::Json(value) => {
                let compact = serde_json::to_string(value).unwrap_or_default();
                json!({"type": "text", "text": format!("JSON data: {compact}")})
            }
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn normalize(&self, history: &[Message], input: &Content) -> Vec<WireMessage> {
        let mut wire: Vec<WireMessage> = history
            .iter()
            .map(|message| WireMessage::text(message.role, message.display_text()))
            .collect();

        let mut parts: Vec<Value> = input
            .blocks()
            .iter()
            .map(|block| self.render_part(block.payload()))
            .collect();

        // A lone text part stays a plain string for backward
        // compatibility with text-only models.
        let content = if parts.len() == 1 && parts[0]["type"] == "text" {
            parts[0]["text"].take()
        } else {
            Value::Array(parts)
        };
        wire.push(WireMessage::new(Role::User, content));
        wire
    }

    async fn complete(
        &self,
        history: &[Message],
        input: &Content,
    ) -> Result<String, ProviderError> {
        let messages = self.normalize(history, input);
        let payload = json!({
            "model": self.model,
            "messages": messages,
        });
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        debug!("POST {url} with {} messages", messages.len());
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(ProviderError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.map_err(ProviderError::transport)?;
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("missing choices[0].message.content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use confab_core::ContentItem;
    use serde_json::json;

    fn backend() -> OpenAiBackend {
        let settings = OpenAiSettings {
            api_key: Some("sk-test".to_string()),
            ..OpenAiSettings::default()
        };
        OpenAiBackend::new(&settings, None).unwrap()
    }

    #[test]
    fn missing_credential_fails_construction() {
        let err = OpenAiBackend::new(&OpenAiSettings::default(), None).unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential(_)));

        let empty = OpenAiSettings {
            api_key: Some(String::new()),
            ..OpenAiSettings::default()
        };
        assert!(OpenAiBackend::new(&empty, None).is_err());
    }

    #[test]
    fn lone_text_part_collapses_to_a_string() {
        let wire = backend().normalize(&[], &Content::text("hi"));
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].content, json!("hi"));
    }

    #[test]
    fn mixed_input_becomes_a_part_array() {
        let input = Content::from_items([
            ContentItem::text("look"),
            ContentItem::image("https://example.com/cat.png"),
        ]);

        let wire = backend().normalize(&[], &input);
        let parts = wire[0].content.as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], json!({"type": "text", "text": "look"}));
        assert_eq!(
            parts[1],
            json!({"type": "image_url", "image_url": {"url": "https://example.com/cat.png"}})
        );
    }

    #[test]
    fn lone_json_block_collapses_like_text() {
        let input = Content::new().add_json(json!({"a": 1}));
        let wire = backend().normalize(&[], &input);
        assert_eq!(wire[0].content, json!(r#"JSON data: {"a":1}"#));
    }

    #[test]
    fn lone_image_stays_a_part_array() {
        let input = Content::new().add_image("https://example.com/cat.png");
        let wire = backend().normalize(&[], &input);
        assert!(wire[0].content.is_array());
    }

    #[test]
    fn history_flattens_to_display_text() {
        let history = vec![Message::structured(
            Role::User,
            Content::text("see").add_image("cat.png"),
        )];
        let wire = backend().normalize(&history, &Content::text("next"));
        assert_eq!(wire[0].content, json!("see [image: cat.png]"));
    }
}
