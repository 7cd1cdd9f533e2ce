//! Prompt assembly for answer generation.
//!
//! Everything here is pure string building: the same passages, question,
//! summaries and turns always give the same bytes.

use serde::Serialize;

use crate::memory::{ChatTurn, MemorySummary};
use crate::rag::RetrievedPassage;

const ASSISTANT_PREAMBLE: &str = "You're an helpful assistant. You answer the question from the given context only and must do mathematical calculations to answer those questions that require mathematics.";

const ANSWER_POLICY: &str = "You are an AI assistant that strictly answers based on the given context. If the answer cannot be derived directly from the provided context, respond with: 'I do not have enough information to answer that.' When applying reasoning, show the steps briefly in the reply.";

pub const REFUSAL_SENTENCE: &str = "I do not have enough information to answer that.";

const EMPTY_SECTION: &str = "[None]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledPrompt {
    /// User turn sent to the model.
    pub prompt: String,
    pub system_instruction: String,
    /// Retrieved passages joined by blank lines. This, not the prompt, is
    /// what gets summarized into memory.
    pub context: String,
    pub memory_context: String,
    pub history_text: String,
}

/// Builds the prompt pair for `question`.
///
/// `summaries` are expected newest first and `turns` oldest first, which is
/// how `MemoryStore` returns them.
pub fn assemble(
    passages: &[RetrievedPassage],
    question: &str,
    summaries: &[MemorySummary],
    turns: &[ChatTurn],
) -> AssembledPrompt {
    let context = join_passages(passages);
    let memory_context = format_memory(summaries);
    let history_text = format_history(turns);

    let sections = render_sections(&context, &memory_context, &history_text);
    let prompt = format!(
        "{}\n\n{}\n\nNew user question:\n{}",
        ASSISTANT_PREAMBLE, sections, question
    );
    let system_instruction = format!("{}\n\n{}", ANSWER_POLICY, sections);

    AssembledPrompt {
        prompt,
        system_instruction,
        context,
        memory_context,
        history_text,
    }
}

pub fn join_passages(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_memory(summaries: &[MemorySummary]) -> String {
    summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Memory #{}:\n{}", i + 1, s.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_history(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("User: {}\nBot: {}", t.user_input, t.bot_reply))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_sections(context: &str, memory_context: &str, history_text: &str) -> String {
    format!(
        "Scraped context:\n{}\n\nSummarized memory context:\n{}\n\nConversation history:\n{}",
        or_none(context),
        or_none(memory_context),
        or_none(history_text)
    )
}

fn or_none(section: &str) -> &str {
    if section.is_empty() {
        EMPTY_SECTION
    } else {
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: i64, text: &str) -> MemorySummary {
        MemorySummary {
            id,
            session_id: "default".to_string(),
            summary: text.to_string(),
            created_at: format!("2026-01-01T00:00:0{}Z", id),
        }
    }

    fn turn(id: i64, question: &str, answer: &str) -> ChatTurn {
        ChatTurn {
            id,
            session_id: "default".to_string(),
            user_input: question.to_string(),
            bot_reply: answer.to_string(),
            created_at: format!("2026-01-01T00:00:0{}Z", id),
        }
    }

    #[test]
    fn renders_all_sections_in_order() {
        let passages = vec![
            RetrievedPassage::new("Rust was first released in 2015."),
            RetrievedPassage::new("Graydon Hoare started it."),
        ];
        let summaries = vec![summary(2, "newer"), summary(1, "older")];
        let turns = vec![turn(1, "Q1", "A1"), turn(2, "Q2", "A2")];

        let assembled = assemble(&passages, "When was Rust released?", &summaries, &turns);

        assert_eq!(
            assembled.context,
            "Rust was first released in 2015.\n\nGraydon Hoare started it."
        );
        assert_eq!(assembled.memory_context, "Memory #1:\nnewer\n\nMemory #2:\nolder");
        assert_eq!(assembled.history_text, "User: Q1\nBot: A1\nUser: Q2\nBot: A2");

        let prompt = &assembled.prompt;
        assert!(prompt.starts_with(ASSISTANT_PREAMBLE));
        let scraped = prompt.find("Scraped context:\n").expect("context section");
        let memory = prompt.find("Summarized memory context:\n").expect("memory section");
        let history = prompt.find("Conversation history:\n").expect("history section");
        let question = prompt.find("New user question:\n").expect("question section");
        assert!(scraped < memory && memory < history && history < question);
        assert!(prompt.ends_with("New user question:\nWhen was Rust released?"));
    }

    #[test]
    fn empty_sections_render_none() {
        let passages = vec![RetrievedPassage::new("only context")];

        let assembled = assemble(&passages, "q", &[], &[]);

        assert!(assembled
            .prompt
            .contains("Summarized memory context:\n[None]\n\nConversation history:\n[None]"));
        assert!(assembled.memory_context.is_empty());
        assert!(assembled.history_text.is_empty());
    }

    #[test]
    fn system_instruction_carries_policy_and_sections() {
        let passages = vec![RetrievedPassage::new("ctx")];
        let assembled = assemble(&passages, "q", &[summary(1, "mem")], &[]);

        assert!(assembled.system_instruction.starts_with(ANSWER_POLICY));
        assert!(assembled.system_instruction.contains(REFUSAL_SENTENCE));
        assert!(assembled.system_instruction.contains("Scraped context:\nctx"));
        assert!(assembled.system_instruction.contains("Memory #1:\nmem"));
        assert!(!assembled.system_instruction.contains("New user question:"));
    }

    #[test]
    fn assembly_is_idempotent() {
        let passages = vec![RetrievedPassage::new("a"), RetrievedPassage::new("b")];
        let summaries = vec![summary(1, "s")];
        let turns = vec![turn(1, "q", "a")];

        let first = assemble(&passages, "question", &summaries, &turns);
        let second = assemble(&passages, "question", &summaries, &turns);

        assert_eq!(first, second);
    }
}
