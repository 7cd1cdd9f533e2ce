use std::sync::Arc;

use super::outcome::PipelineFailure;
use crate::context::AssembledPrompt;
use crate::core::config::settings::LlmSettings;
use crate::llm::{GenerationRequest, LlmProvider};
use crate::memory::MemoryStore;

pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;

/// Generates the answer for an assembled prompt and records it.
pub struct Answerer {
    generator: Arc<dyn LlmProvider>,
    memory: MemoryStore,
    temperature: f64,
    max_output_tokens: u32,
}

impl Answerer {
    pub fn new(generator: Arc<dyn LlmProvider>, memory: MemoryStore) -> Self {
        Self {
            generator,
            memory,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_settings(mut self, settings: &LlmSettings) -> Self {
        self.temperature = settings.temperature;
        self.max_output_tokens = settings.max_output_tokens;
        self
    }

    /// Memory is only written after the model has produced text, and the
    /// summary is taken from the retrieved context rather than the prompt.
    pub async fn answer(
        &self,
        session_id: &str,
        assembled: &AssembledPrompt,
        question: &str,
    ) -> Result<String, PipelineFailure> {
        let mut request = GenerationRequest::new(assembled.prompt.clone())
            .with_system_instruction(assembled.system_instruction.clone());
        request.temperature = Some(self.temperature);
        request.max_output_tokens = Some(self.max_output_tokens);

        tracing::debug!(
            "Generating answer with {} (prompt {} chars)",
            self.generator.name(),
            assembled.prompt.len()
        );
        let text = self.generator.generate(request).await?;

        self.memory
            .record_answer(session_id, &assembled.context, question, &text)
            .await
            .map_err(PipelineFailure::Persistence)?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::assemble;
    use crate::llm::LlmError;
    use crate::memory::MemoryLimits;
    use crate::rag::RetrievedPassage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingLlm {
        requests: Mutex<Vec<GenerationRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
            self.requests.lock().expect("lock").push(request);
            if self.fail {
                return Err(LlmError::InvalidResponse {
                    provider: "recording",
                    message: "boom".to_string(),
                });
            }
            Ok("The answer.".to_string())
        }
    }

    #[tokio::test]
    async fn sends_fixed_sampling_and_records_context() {
        let dir = tempdir().expect("tempdir");
        let memory = MemoryStore::new(&dir.path().join("mem.db"), MemoryLimits::default())
            .await
            .expect("store");
        let llm = Arc::new(RecordingLlm::default());
        let answerer = Answerer::new(llm.clone(), memory.clone());

        let assembled = assemble(&[RetrievedPassage::new("ctx passage")], "q?", &[], &[]);
        let text = answerer.answer("default", &assembled, "q?").await.expect("answer");

        assert_eq!(text, "The answer.");
        let requests = llm.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(0.2));
        assert_eq!(requests[0].max_output_tokens, Some(512));
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some(assembled.system_instruction.as_str())
        );

        let summaries = memory.recent_summaries("default", 5).await.expect("summaries");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].summary, "ctx passage");
        let turns = memory.recent_chat_turns("default", 5).await.expect("turns");
        assert_eq!(turns[0].user_input, "q?");
        assert_eq!(turns[0].bot_reply, "The answer.");
    }

    #[tokio::test]
    async fn generation_failure_leaves_memory_untouched() {
        let dir = tempdir().expect("tempdir");
        let memory = MemoryStore::new(&dir.path().join("mem.db"), MemoryLimits::default())
            .await
            .expect("store");
        let llm = Arc::new(RecordingLlm {
            fail: true,
            ..Default::default()
        });
        let answerer = Answerer::new(llm, memory.clone());

        let assembled = assemble(&[RetrievedPassage::new("ctx")], "q", &[], &[]);
        let err = answerer.answer("default", &assembled, "q").await.unwrap_err();

        assert!(matches!(err, PipelineFailure::Generation(_)));
        assert_eq!(memory.summary_count("default").await.expect("count"), 0);
        assert_eq!(memory.chat_turn_count("default").await.expect("count"), 0);
    }

    #[tokio::test]
    async fn configured_sampling_overrides_defaults() {
        let dir = tempdir().expect("tempdir");
        let memory = MemoryStore::new(&dir.path().join("mem.db"), MemoryLimits::default())
            .await
            .expect("store");
        let llm = Arc::new(RecordingLlm::default());
        let mut settings = crate::core::config::AppSettings::default().llm;
        settings.temperature = 0.7;
        settings.max_output_tokens = 1024;
        let answerer = Answerer::new(llm.clone(), memory).with_settings(&settings);

        let assembled = assemble(&[RetrievedPassage::new("ctx")], "q", &[], &[]);
        answerer.answer("default", &assembled, "q").await.expect("answer");

        let requests = llm.requests.lock().expect("lock");
        assert_eq!(requests[0].temperature, Some(0.7));
        assert_eq!(requests[0].max_output_tokens, Some(1024));
    }
}
