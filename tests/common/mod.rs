#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use pagewise_backend::core::config::{AppPaths, AppSettings};
use pagewise_backend::llm::{GenerationRequest, LlmError, LlmProvider};
use pagewise_backend::memory::{MemoryLimits, MemoryStore};
use pagewise_backend::pipeline::{Answerer, Pipeline};
use pagewise_backend::rag::{
    RetrievalError, RetrievedPassage, Retriever, SplitterConfig, TextChunk, TextSplitter,
};
use pagewise_backend::scrape::{Fetcher, ScrapeError, ScrapeTarget};
use pagewise_backend::state::AppState;

pub const PAGE_TEXT: &str = "Rust is a systems programming language.\n\nIt was first released in 2015.";

pub enum FetchBehavior {
    Text(String),
    Fail,
    Empty,
    Slow(Duration),
}

pub struct FakeFetcher {
    behavior: FetchBehavior,
    pub calls: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(behavior: FetchBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn page(text: &str) -> Arc<Self> {
        Self::new(FetchBehavior::Text(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.urls.lock().expect("lock").last().cloned()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_text(&self, target: &ScrapeTarget) -> Result<String, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().expect("lock").push(target.to_string());
        match &self.behavior {
            FetchBehavior::Text(text) => Ok(text.clone()),
            FetchBehavior::Fail => Err(ScrapeError::Status {
                url: target.to_string(),
                status: 503,
            }),
            FetchBehavior::Empty => Err(ScrapeError::Empty(target.to_string())),
            FetchBehavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(PAGE_TEXT.to_string())
            }
        }
    }
}

pub enum RetrieveBehavior {
    /// One passage per question, naming it, so each answer stores a
    /// distinguishable summary.
    EchoQuestion,
    /// Every chunk it is given, in order.
    AllChunks,
    Nothing,
    Fail,
}

pub struct FakeRetriever {
    behavior: RetrieveBehavior,
    pub calls: AtomicUsize,
    pub chunk_counts: Mutex<Vec<usize>>,
}

impl FakeRetriever {
    pub fn new(behavior: RetrieveBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            chunk_counts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(
        &self,
        chunks: Vec<TextChunk>,
        question: &str,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.chunk_counts.lock().expect("lock").push(chunks.len());
        match self.behavior {
            RetrieveBehavior::EchoQuestion => Ok(vec![RetrievedPassage::new(format!(
                "context for {}",
                question
            ))]),
            RetrieveBehavior::AllChunks => Ok(chunks
                .into_iter()
                .map(|chunk| RetrievedPassage::new(chunk.text))
                .collect()),
            RetrieveBehavior::Nothing => Ok(Vec::new()),
            RetrieveBehavior::Fail => Err(RetrievalError::EmptyQuery),
        }
    }
}

pub struct FakeLlm {
    fail: bool,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeLlm {
    pub fn answering() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .expect("lock")
            .last()
            .map(|r| r.prompt.clone())
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let index = {
            let mut requests = self.requests.lock().expect("lock");
            requests.push(request);
            requests.len()
        };
        if self.fail {
            return Err(LlmError::Status {
                provider: "fake",
                status: 500,
                body: "model unavailable".to_string(),
            });
        }
        Ok(format!("answer #{}", index))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub fetcher: Arc<FakeFetcher>,
    pub retriever: Arc<FakeRetriever>,
    pub llm: Arc<FakeLlm>,
    pub memory: MemoryStore,
    pub state: Arc<AppState>,
}

pub async fn harness(
    fetcher: Arc<FakeFetcher>,
    retriever: Arc<FakeRetriever>,
    llm: Arc<FakeLlm>,
) -> Harness {
    harness_with_settings(fetcher, retriever, llm, AppSettings::default()).await
}

pub async fn harness_with_settings(
    fetcher: Arc<FakeFetcher>,
    retriever: Arc<FakeRetriever>,
    llm: Arc<FakeLlm>,
    settings: AppSettings,
) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = Arc::new(AppPaths::from_data_dir(dir.path()));
    let memory = MemoryStore::new(&paths.db_path, MemoryLimits::from(&settings.memory))
        .await
        .expect("memory store");

    let splitter = TextSplitter::new(SplitterConfig {
        chunk_size: settings.rag.chunk_size,
        chunk_overlap: settings.rag.chunk_overlap,
    })
    .expect("splitter");
    let answerer = Answerer::new(llm.clone(), memory.clone()).with_settings(&settings.llm);
    let pipeline = Pipeline::new(
        fetcher.clone(),
        splitter,
        retriever.clone(),
        memory.clone(),
        answerer,
        settings.memory.history_limit,
    );

    let state = Arc::new(AppState::from_parts(paths, settings, memory.clone(), pipeline));

    Harness {
        dir,
        fetcher,
        retriever,
        llm,
        memory,
        state,
    }
}

/// Runs raw SQL against the harness database on a separate connection.
pub async fn execute_sql(h: &Harness, statement: &str) {
    let url = format!("sqlite://{}", h.state.paths.db_path.to_string_lossy());
    let pool = sqlx::SqlitePool::connect(&url).await.expect("connect");
    sqlx::query(statement).execute(&pool).await.expect("execute");
    pool.close().await;
}

pub fn target(raw: &str) -> ScrapeTarget {
    ScrapeTarget::parse(raw).expect("valid url")
}
