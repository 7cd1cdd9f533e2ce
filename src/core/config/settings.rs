//! Typed view over the merged YAML config.
//!
//! Every field has a default so an empty config runs the service against
//! Gemini with the same parameters the pipeline was tuned for.

use std::env;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_PORT: u16 = 3005;
pub const DEFAULT_CONTENT_SELECTOR: &str = "#mw-content-text";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Gemini,
    OpenAiCompatible,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(ProviderKind::Gemini),
            "openai" | "openai_compatible" | "lmstudio" | "ollama" => {
                Some(ProviderKind::OpenAiCompatible)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerSettings {
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppSection {
    pub request_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub content_selector: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySettings {
    pub summary_limit: usize,
    pub history_limit: usize,
    pub summary_max_chars: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub base_url: Option<String>,
    pub model: String,
    pub embedding_model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub app: AppSection,
    pub rag: RagSettings,
    pub memory: MemorySettings,
    pub llm: LlmSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_value(&Value::Null)
    }
}

impl AppSettings {
    pub fn from_value(config: &Value) -> Self {
        let server = config.get("server");
        let app = config.get("app");
        let rag = config.get("rag");
        let memory = config.get("memory");
        let llm = config.get("llm");

        let provider = str_field(llm, "provider")
            .and_then(ProviderKind::parse)
            .unwrap_or(ProviderKind::Gemini);
        let (default_model, default_embedding_model) = match provider {
            ProviderKind::Gemini => ("gemini-2.0-flash", "text-embedding-004"),
            ProviderKind::OpenAiCompatible => ("gpt-4o-mini", "text-embedding-3-small"),
        };

        Self {
            server: ServerSettings {
                port: u64_field(server, "port")
                    .and_then(|v| u16::try_from(v).ok())
                    .unwrap_or(DEFAULT_PORT),
                cors_allowed_origins: server
                    .and_then(|s| s.get("cors_allowed_origins"))
                    .and_then(|v| v.as_array())
                    .map(|list| {
                        list.iter()
                            .filter_map(|item| item.as_str())
                            .map(str::trim)
                            .filter(|item| !item.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            app: AppSection {
                request_timeout_secs: u64_field(app, "request_timeout_secs").unwrap_or(120),
                fetch_timeout_secs: u64_field(app, "fetch_timeout_secs").unwrap_or(30),
                content_selector: str_field(app, "content_selector")
                    .unwrap_or(DEFAULT_CONTENT_SELECTOR)
                    .to_string(),
            },
            rag: RagSettings {
                chunk_size: usize_field(rag, "chunk_size").unwrap_or(500),
                chunk_overlap: usize_field(rag, "chunk_overlap").unwrap_or(50),
                top_k: usize_field(rag, "top_k").unwrap_or(4),
            },
            memory: MemorySettings {
                summary_limit: usize_field(memory, "summary_limit").unwrap_or(5),
                history_limit: usize_field(memory, "history_limit").unwrap_or(5),
                summary_max_chars: usize_field(memory, "summary_max_chars").unwrap_or(500),
            },
            llm: LlmSettings {
                provider,
                base_url: str_field(llm, "base_url").map(str::to_string),
                model: str_field(llm, "model").unwrap_or(default_model).to_string(),
                embedding_model: str_field(llm, "embedding_model")
                    .unwrap_or(default_embedding_model)
                    .to_string(),
                api_key: str_field(llm, "api_key")
                    .map(str::to_string)
                    .or_else(|| env::var("GEMINI_API_KEY").ok())
                    .or_else(|| env::var("LLM_API_KEY").ok())
                    .filter(|key| !key.trim().is_empty()),
                temperature: llm
                    .and_then(|v| v.get("temperature"))
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.2),
                max_output_tokens: u64_field(llm, "max_output_tokens")
                    .and_then(|v| u32::try_from(v).ok())
                    .unwrap_or(512),
                timeout_secs: u64_field(llm, "timeout_secs").unwrap_or(60),
            },
        }
    }
}

impl AppSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn str_field<'a>(section: Option<&'a Value>, key: &str) -> Option<&'a str> {
    section
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn u64_field(section: Option<&Value>, key: &str) -> Option<u64> {
    section.and_then(|v| v.get(key)).and_then(|v| v.as_u64())
}

fn usize_field(section: Option<&Value>, key: &str) -> Option<usize> {
    u64_field(section, key).and_then(|v| usize::try_from(v).ok())
}
