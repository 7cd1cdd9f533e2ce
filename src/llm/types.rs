use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single-turn generation: one user prompt plus an optional system
/// instruction and sampling limits.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// System instruction (when present) followed by the user prompt.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(instruction) = &self.system_instruction {
            messages.push(ChatMessage::system(instruction.clone()));
        }
        messages.push(ChatMessage::user(self.prompt.clone()));
        messages
    }
}

/// What an embedding will be used for. Providers that distinguish document
/// and query embeddings map this onto their task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Document,
    Query,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider}: no API key configured")]
    MissingApiKey { provider: &'static str },
    #[error("{provider}: request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider}: HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider}: unexpected response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_put_system_instruction_first() {
        let request = GenerationRequest::new("What is Rust?").with_system_instruction("Be brief.");

        assert_eq!(
            request.to_messages(),
            vec![ChatMessage::system("Be brief."), ChatMessage::user("What is Rust?")]
        );
        assert_eq!(
            GenerationRequest::new("hi").to_messages(),
            vec![ChatMessage::user("hi")]
        );
    }
}
