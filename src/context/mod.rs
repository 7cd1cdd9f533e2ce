//! Context assembly for the LLM.
//!
//! Turns retrieved passages and stored memory into the prompt pair sent to
//! the model.

pub mod prompt;

pub use prompt::{assemble, AssembledPrompt, REFUSAL_SENTENCE};
