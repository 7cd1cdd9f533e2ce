use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, LlmProvider};
use super::types::{EmbeddingTask, GenerationRequest, LlmError};

const PROVIDER: &str = "openai_compatible";
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";

/// Client for servers speaking the OpenAI REST dialect (LM Studio, Ollama,
/// vLLM, OpenAI itself).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        model: String,
        embedding_model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| LlmError::Request {
                provider: PROVIDER,
                source,
            })?;
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/');
        let base_url = base_url.strip_suffix("/v1").unwrap_or(base_url).to_string();
        Ok(Self {
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model,
            embedding_model,
            client,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = builder.send().await.map_err(|source| LlmError::Request {
            provider: PROVIDER,
            source,
        })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                provider: PROVIDER,
                status,
                body: text,
            });
        }

        res.json().await.map_err(|err| LlmError::InvalidResponse {
            provider: PROVIDER,
            message: err.to_string(),
        })
    }
}

fn build_chat_body(model: &str, request: GenerationRequest) -> Value {
    let mut body = json!({
        "model": model,
        "messages": request.to_messages(),
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = request.max_output_tokens {
            obj.insert("max_tokens".to_string(), json!(t));
        }
    }
    body
}

fn parse_chat_content(payload: &Value) -> Result<String, LlmError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER,
            message: "missing choices[0].message.content".to_string(),
        })
}

fn parse_embeddings(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    let mut indexed = Vec::new();
    if let Some(data) = payload["data"].as_array() {
        for (position, item) in data.iter().enumerate() {
            let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
            if let Some(vals) = item["embedding"].as_array() {
                let vec: Vec<f32> = vals
                    .iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect();
                indexed.push((index, vec));
            }
        }
    }

    if indexed.len() != expected {
        return Err(LlmError::InvalidResponse {
            provider: PROVIDER,
            message: format!("returned {} embeddings for {} inputs", indexed.len(), expected),
        });
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let body = build_chat_body(&self.model, request);
        let payload = self.post("/v1/chat/completions", &body).await?;
        parse_chat_content(&payload)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    async fn embed(&self, inputs: &[String], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });
        let payload = self.post("/v1/embeddings", &body).await?;
        parse_embeddings(&payload, inputs.len())
    }
}
