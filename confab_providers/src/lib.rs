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

//! Chat backend implementations and the name-keyed factory.
//!
//! Three variants of the [`ChatBackend`] capability set: an offline
//! mock (the default), a self-hosted Ollama endpoint, and an
//! OpenAI-style chat-completions API.

pub mod image;
mod mock;
mod ollama;
mod openai;

use std::sync::Arc;

use tracing::info;

use confab_config::Config;
use confab_core::{ChatBackend, ProviderError};

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

/// Build the backend registered under `name`.
///
/// Known names: `mock`, `ollama`, `openai` (alias `oai`). Configuration
/// problems (unknown name, missing credential) surface here, at
/// construction time.
pub fn create_backend(name: &str, config: &Config) -> Result<Arc<dyn ChatBackend>, ProviderError> {
    info!("Creating backend: {name}");
    match name.to_ascii_lowercase().as_str() {
        "mock" => Ok(Arc::new(MockBackend::new())),
        "ollama" => Ok(Arc::new(OllamaBackend::new(
            &config.ollama,
            config.image_base_dir.clone(),
        )?)),
        "openai" | "oai" => Ok(Arc::new(OpenAiBackend::new(
            &config.openai,
            config.image_base_dir.clone(),
        )?)),
        other => Err(ProviderError::UnsupportedProvider(other.to_string())),
    }
}

/// Build the backend the configuration selects.
pub fn backend_from_config(config: &Config) -> Result<Arc<dyn ChatBackend>, ProviderError> {
    create_backend(&config.provider, config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn default_config_selects_the_mock() {
        let config = Config::default();
        assert!(backend_from_config(&config).is_ok());
    }

    #[test]
    fn names_are_case_insensitive_and_aliased() {
        let mut config = Config::default();
        config.openai.api_key = Some("sk-test".to_string());

        assert!(create_backend("MOCK", &config).is_ok());
        assert!(create_backend("ollama", &config).is_ok());
        assert!(create_backend("oai", &config).is_ok());
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = create_backend("bard", &Config::default()).unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedProvider(name) if name == "bard"));
    }

    #[test]
    fn openai_without_credential_fails_at_the_factory() {
        let err = create_backend("openai", &Config::default()).unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential(_)));
    }
}
