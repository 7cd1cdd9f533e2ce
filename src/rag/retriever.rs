//! Similarity retrieval over freshly split page chunks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::splitter::TextChunk;
use super::vector_index::MemoryVectorIndex;
use crate::llm::{EmbeddingProvider, EmbeddingTask, LlmError};

/// A chunk selected as relevant to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub chunk_index: usize,
    /// Similarity score (higher = better).
    pub score: f64,
}

impl RetrievedPassage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            chunk_index: 0,
            score: 0.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),
    #[error("embedding count mismatch: {embeddings} vectors for {chunks} chunks")]
    CountMismatch { chunks: usize, embeddings: usize },
    #[error("query embedding was empty")]
    EmptyQuery,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns passages ranked by relevance, best first. An empty result
    /// means nothing in `chunks` could be matched.
    async fn retrieve(
        &self,
        chunks: Vec<TextChunk>,
        question: &str,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError>;
}

/// Embeds chunks and question with an `EmbeddingProvider` and ranks the
/// chunks in a per-request `MemoryVectorIndex`.
pub struct EmbeddingRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl EmbeddingRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            embedder,
            top_k: top_k.max(1),
        }
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    async fn retrieve(
        &self,
        chunks: Vec<TextChunk>,
        question: &str,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts, EmbeddingTask::Document).await?;
        if embeddings.len() != chunks.len() {
            return Err(RetrievalError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let query = self
            .embedder
            .embed(&[question.to_string()], EmbeddingTask::Query)
            .await?
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(RetrievalError::EmptyQuery)?;

        let index = MemoryVectorIndex::from_embeddings(chunks, embeddings);
        let results = index.search(&query, self.top_k);
        tracing::debug!(
            "Retrieved {} of {} chunks (top_k={})",
            results.len(),
            index.len(),
            self.top_k
        );

        Ok(results
            .into_iter()
            .map(|scored| RetrievedPassage {
                text: scored.chunk.text,
                chunk_index: scored.chunk.index,
                score: scored.score,
            })
            .collect())
    }
}
