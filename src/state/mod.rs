use std::sync::Arc;

use crate::core::config::{AppPaths, AppSettings, ConfigService};
use crate::llm::build_clients;
use crate::memory::{MemoryLimits, MemoryStore};
use crate::pipeline::{Answerer, Pipeline};
use crate::rag::{EmbeddingRetriever, SplitterConfig, TextSplitter};
use crate::scrape::HttpFetcher;
use crate::session::SessionRegistry;

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Contains:
/// - Configuration, typed settings and paths
/// - Per-session scrape targets
/// - The memory store and the answer pipeline built on it
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppSettings>,
    pub sessions: SessionRegistry,
    pub memory: MemoryStore,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Initializes the application state from discovered paths.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        Self::initialize_with_paths(Arc::new(AppPaths::new())).await
    }

    /// Loads config and builds every collaborator:
    /// 1. Validated settings from config.yml and secrets.yaml
    /// 2. The sqlite memory store
    /// 3. LLM and embedding clients for the configured provider
    /// 4. The HTTP fetcher, splitter and retriever behind the pipeline
    pub async fn initialize_with_paths(
        paths: Arc<AppPaths>,
    ) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let memory = MemoryStore::new(&paths.db_path, MemoryLimits::from(&settings.memory))
            .await
            .map_err(|e| InitializationError::Memory(e.into()))?;

        let clients =
            build_clients(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?;
        tracing::info!(
            "LLM provider: {} (model {}, embeddings {})",
            clients.generator.name(),
            settings.llm.model,
            settings.llm.embedding_model
        );

        let fetcher = HttpFetcher::new(settings.app.fetch_timeout(), settings.app.content_selector.clone())
            .map_err(|e| InitializationError::Fetcher(e.into()))?;

        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: settings.rag.chunk_size,
            chunk_overlap: settings.rag.chunk_overlap,
        })
        .map_err(|e| InitializationError::Splitter(e.into()))?;

        let retriever = EmbeddingRetriever::new(clients.embedder.clone(), settings.rag.top_k);
        let answerer = Answerer::new(clients.generator.clone(), memory.clone()).with_settings(&settings.llm);

        let pipeline = Pipeline::new(
            Arc::new(fetcher),
            splitter,
            Arc::new(retriever),
            memory.clone(),
            answerer,
            settings.memory.history_limit,
        );

        Ok(Arc::new(Self::from_parts(paths, settings, memory, pipeline)))
    }

    /// Assembles state from already-built parts.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        settings: AppSettings,
        memory: MemoryStore,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            config: ConfigService::new(paths.clone()),
            paths,
            settings: Arc::new(settings),
            sessions: SessionRegistry::new(),
            memory,
            pipeline: Arc::new(pipeline),
        }
    }
}
