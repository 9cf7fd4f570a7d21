//! Ollama backend: a self-hosted inference endpoint speaking
//! `/api/chat` with plain string message content.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use confab_config::OllamaSettings;
use confab_core::{BlockPayload, ChatBackend, Content, Message, ProviderError, Role, WireMessage};

use crate::image;

#[derive(Debug)]
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    image_base_dir: Option<PathBuf>,
}

impl OllamaBackend {
    pub fn new(
        settings: &OllamaSettings,
        image_base_dir: Option<PathBuf>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ProviderError::transport)?;

        info!("Creating OllamaBackend for {}", settings.base_url);
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            image_base_dir,
        })
    }

    /// Flatten one input block to the string fragment Ollama receives.
    /// The endpoint has no dedicated multimodal field, so local images
    /// are inlined as data URLs.
    fn render_block(&self, payload: &BlockPayload) -> String {
        match payload {
            BlockPayload::Text(text) => text.clone(),
            BlockPayload::Image(reference) => {
                if image::is_remote(reference) {
                    return format!("[image: {reference}]");
                }
                match image::to_data_url(reference, self.image_base_dir.as_deref()) {
                    Ok(data_url) => data_url,
                    Err(err) => {
                        warn!("Could not inline image {reference}: {err}");
                        format!("[image: {reference}]")
                    }
                }
            }
            BlockPayload::Json(value) => {
                format!("JSON data: {}", serde_json::to_string(value).unwrap_or_default())
            }
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn normalize(&self, history: &[Message], input: &Content) -> Vec<WireMessage> {
        let mut wire: Vec<WireMessage> = history
            .iter()
            .map(|message| WireMessage::text(message.role, message.display_text()))
            .collect();

        let fragments: Vec<String> = input
            .blocks()
            .iter()
            .map(|block| self.render_block(block.payload()))
            .collect();
        wire.push(WireMessage::text(Role::User, fragments.join(" ")));
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
            "stream": false,
        });
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        debug!("POST {url} with {} messages", messages.len());
        let response = self
            .client
            .post(&url)
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
        body.pointer("/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::MalformedResponse("missing message.content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use confab_core::ContentItem;
    use serde_json::json;

    fn backend() -> OllamaBackend {
        OllamaBackend::new(&OllamaSettings::default(), None).unwrap()
    }

    #[test]
    fn history_flattens_to_role_content_pairs() {
        let history = vec![
            Message::text(Role::System, "be brief"),
            Message::structured(Role::User, Content::text("look").add_image("cat.png")),
        ];

        let wire = backend().normalize(&history, &Content::text("next"));
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].content, json!("look [image: cat.png]"));
        assert_eq!(wire[2], WireMessage::text(Role::User, "next"));
    }

    #[test]
    fn json_blocks_carry_the_data_prefix() {
        let input = Content::from_items([
            ContentItem::text("totals"),
            ContentItem::json(json!({"a": 1})),
        ]);

        let wire = backend().normalize(&[], &input);
        assert_eq!(wire[0].content, json!(r#"totals JSON data: {"a":1}"#));
    }

    #[test]
    fn local_images_inline_as_data_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let input = Content::new().add_image(path.to_str().unwrap());
        let wire = backend().normalize(&[], &input);
        let rendered = wire[0].content.as_str().unwrap();
        assert!(rendered.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn unreadable_images_fall_back_to_placeholders() {
        let input = Content::new().add_image("not/a/real/file.png");
        let wire = backend().normalize(&[], &input);
        assert_eq!(wire[0].content, json!("[image: not/a/real/file.png]"));
    }
}
