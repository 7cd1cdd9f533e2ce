use serde::Serialize;
use thiserror::Error;

use crate::llm::LlmError;
use crate::memory::MemoryError;
use crate::rag::RetrievalError;
use crate::scrape::ScrapeError;

pub const SCRAPE_FAILED_MESSAGE: &str = "Failed to scrape the webpage.";
pub const GENERATION_FAILED_MESSAGE: &str = "An error occurred while generating the answer.";
pub const PIPELINE_FAILED_MESSAGE: &str = "An unexpected error occurred during the RAG pipeline.";
pub const NO_CONTEXT_MESSAGE: &str = "Sorry, this question cannot be answered from the given context.";

/// The stage at which answering a question failed.
#[derive(Debug, Error)]
pub enum PipelineFailure {
    #[error("scrape failed: {0}")]
    Scrape(#[from] ScrapeError),
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("reading memory failed: {0}")]
    MemoryRead(#[source] MemoryError),
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
    #[error("recording the answer failed: {0}")]
    Persistence(#[source] MemoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Scrape,
    Retrieval,
    MemoryRead,
    Generation,
    Persistence,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Scrape => "scrape",
            FailureKind::Retrieval => "retrieval",
            FailureKind::MemoryRead => "memory_read",
            FailureKind::Generation => "generation",
            FailureKind::Persistence => "persistence",
        }
    }
}

impl PipelineFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineFailure::Scrape(_) => FailureKind::Scrape,
            PipelineFailure::Retrieval(_) => FailureKind::Retrieval,
            PipelineFailure::MemoryRead(_) => FailureKind::MemoryRead,
            PipelineFailure::Generation(_) => FailureKind::Generation,
            PipelineFailure::Persistence(_) => FailureKind::Persistence,
        }
    }

    /// The fail-soft text shown to the user in place of an answer.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            FailureKind::Scrape => SCRAPE_FAILED_MESSAGE,
            FailureKind::Generation | FailureKind::Persistence => GENERATION_FAILED_MESSAGE,
            FailureKind::Retrieval | FailureKind::MemoryRead => PIPELINE_FAILED_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Answered,
    NoContext,
    Failed,
}

#[derive(Debug)]
pub enum AnswerOutcome {
    Answered(String),
    /// Retrieval found nothing relevant; the model was not consulted.
    NoContext,
    Failed(PipelineFailure),
}

impl AnswerOutcome {
    /// Text returned to the client for this outcome.
    pub fn message(&self) -> &str {
        match self {
            AnswerOutcome::Answered(text) => text,
            AnswerOutcome::NoContext => NO_CONTEXT_MESSAGE,
            AnswerOutcome::Failed(failure) => failure.user_message(),
        }
    }

    pub fn status(&self) -> AnswerStatus {
        match self {
            AnswerOutcome::Answered(_) => AnswerStatus::Answered,
            AnswerOutcome::NoContext => AnswerStatus::NoContext,
            AnswerOutcome::Failed(_) => AnswerStatus::Failed,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            AnswerOutcome::Failed(failure) => Some(failure.kind()),
            _ => None,
        }
    }
}
