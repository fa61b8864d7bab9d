//! Agent runtime: the language-model side of a form-filling conversation.
//!
//! This crate turns one user message into one turn result:
//! - builds the instruction prompt from the form and the current record (`prompt`)
//! - calls the model through the [`llm::LlmClient`] seam (`gemini` is the
//!   production implementation)
//! - parses the model's loosely structured reply (`reply`)
//! - hands the extraction to the core tracker (`runtime`)
//!
//! # Safety Principle
//!
//! The model is strictly an extractor and a voice. It NEVER decides which
//! fields are missing or whether the form is complete. Those are deterministic
//! decisions made by `intake_core::CompletionTracker`.

pub mod gemini;
pub mod llm;
pub mod prompt;
pub mod reply;
pub mod runtime;

pub use gemini::GeminiClient;
pub use llm::{LlmClient, LlmError};
pub use prompt::{PromptBuilder, PromptContext};
pub use reply::{parse_reply, OracleReply, FALLBACK_MESSAGE};
pub use runtime::{AgentRuntime, TurnInput, TurnReply};
