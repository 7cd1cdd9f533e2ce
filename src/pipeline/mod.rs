//! Question answering over a scraped page.
//!
//! `Pipeline::answer_from_web` runs scrape → split → retrieve, stops with
//! `AnswerOutcome::NoContext` when nothing relevant was found, and otherwise
//! assembles the prompt and hands it to the `Answerer`.

pub mod answerer;
pub mod outcome;

use std::sync::Arc;

pub use answerer::Answerer;
pub use outcome::{AnswerOutcome, AnswerStatus, FailureKind, PipelineFailure};

use crate::context::assemble;
use crate::memory::MemoryStore;
use crate::rag::{Retriever, TextSplitter};
use crate::scrape::{Fetcher, ScrapeError, ScrapeTarget};

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    splitter: TextSplitter,
    retriever: Arc<dyn Retriever>,
    memory: MemoryStore,
    answerer: Answerer,
    history_limit: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        splitter: TextSplitter,
        retriever: Arc<dyn Retriever>,
        memory: MemoryStore,
        answerer: Answerer,
        history_limit: usize,
    ) -> Self {
        Self {
            fetcher,
            splitter,
            retriever,
            memory,
            answerer,
            history_limit,
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Answers `question` from the page at `target`.
    ///
    /// Never returns an error: every stage failure becomes
    /// `AnswerOutcome::Failed` and is logged here once.
    pub async fn answer_from_web(
        &self,
        session_id: &str,
        target: &ScrapeTarget,
        question: &str,
    ) -> AnswerOutcome {
        match self.run(session_id, target, question).await {
            Ok(Some(answer)) => AnswerOutcome::Answered(answer),
            Ok(None) => {
                tracing::info!(
                    "No relevant context in {} for session {}",
                    target,
                    session_id
                );
                AnswerOutcome::NoContext
            }
            Err(failure) => {
                tracing::error!(
                    "Answer pipeline failed at {} for session {} ({}): {}",
                    failure.kind().as_str(),
                    session_id,
                    target,
                    failure
                );
                AnswerOutcome::Failed(failure)
            }
        }
    }

    async fn run(
        &self,
        session_id: &str,
        target: &ScrapeTarget,
        question: &str,
    ) -> Result<Option<String>, PipelineFailure> {
        let text = match self.fetcher.fetch_text(target).await {
            Ok(text) => text,
            // A page without readable text simply yields no chunks.
            Err(ScrapeError::Empty(_)) => String::new(),
            Err(err) => return Err(err.into()),
        };

        let chunks = self.splitter.split(&text);
        tracing::debug!("Split {} into {} chunks", target, chunks.len());

        let passages = self.retriever.retrieve(chunks, question).await?;
        if passages.is_empty() {
            return Ok(None);
        }

        let limits = self.memory.limits();
        let summaries = self
            .memory
            .recent_summaries(session_id, limits.summary_limit)
            .await
            .map_err(PipelineFailure::MemoryRead)?;
        let turns = self
            .memory
            .recent_chat_turns(session_id, self.history_limit)
            .await
            .map_err(PipelineFailure::MemoryRead)?;

        let assembled = assemble(&passages, question, &summaries, &turns);
        let answer = self.answerer.answer(session_id, &assembled, question).await?;
        Ok(Some(answer))
    }
}
