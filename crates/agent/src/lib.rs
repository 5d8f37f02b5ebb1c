//! Conversation orchestration engine.
//!
//! One inbound user message makes a single synchronous pass through a small
//! graph of nodes: a deterministic safety pre-filter, a stateless router,
//! one specialist or terminal handler, and a tone-convergence stage. The
//! engine owns no state across turns; a [`switchboard_core::SessionStore`]
//! supplies prior history and receives the whole turn delta in one commit.
//!
//! External capabilities (model completion, knowledge/web search, account
//! lookups) are injected traits with their own failure modes. Only session
//! persistence failures are fatal to a turn; everything else degrades into a
//! still-valid textual reply.

pub mod engine;
pub mod knowledge;
pub mod llm;
pub mod personality;
pub mod router;
pub mod safety;
pub mod support;
pub mod terminal;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{TurnEngine, TurnOutcome};
pub use llm::{ChatMessage, Completion, CompletionClient, CompletionError, ToolCallRequest};
pub use tools::{AccountDirectory, KnowledgeSearch, ToolError, ToolKind, ToolSpec, WebSearch};
