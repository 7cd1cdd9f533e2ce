use async_trait::async_trait;

use super::types::{EmbeddingTask, GenerationRequest, LlmError};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name used in logs (e.g. "gemini", "openai_compatible")
    fn name(&self) -> &str;

    /// single-turn text generation
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// embed each input, returning vectors in input order
    async fn embed(&self, inputs: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>, LlmError>;
}
