use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize memory store: {0}")]
    Memory(#[source] anyhow::Error),

    #[error("Failed to initialize LLM clients: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize page fetcher: {0}")]
    Fetcher(#[source] anyhow::Error),

    #[error("Invalid text splitter settings: {0}")]
    Splitter(#[source] anyhow::Error),
}
