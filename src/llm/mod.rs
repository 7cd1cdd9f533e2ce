pub mod gemini;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatibleProvider;
pub use provider::{EmbeddingProvider, LlmProvider};
pub use types::{ChatMessage, EmbeddingTask, GenerationRequest, LlmError};

use crate::core::config::settings::{LlmSettings, ProviderKind};

/// Generation and embedding clients built from one provider config.
#[derive(Clone)]
pub struct LlmClients {
    pub generator: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

pub fn build_clients(settings: &LlmSettings) -> Result<LlmClients, LlmError> {
    match settings.provider {
        ProviderKind::Gemini => {
            let provider = Arc::new(GeminiProvider::new(
                settings.base_url.clone(),
                settings.api_key.clone(),
                settings.model.clone(),
                settings.embedding_model.clone(),
                settings.timeout(),
            )?);
            Ok(LlmClients {
                generator: provider.clone(),
                embedder: provider,
            })
        }
        ProviderKind::OpenAiCompatible => {
            let provider = Arc::new(OpenAiCompatibleProvider::new(
                settings.base_url.clone(),
                settings.api_key.clone(),
                settings.model.clone(),
                settings.embedding_model.clone(),
                settings.timeout(),
            )?);
            Ok(LlmClients {
                generator: provider.clone(),
                embedder: provider,
            })
        }
    }
}
