use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use switchboard_core::{MessageLog, Role};

use crate::tools::ToolSpec;

/// One entry of the prompt sent to the completion capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// The visible session history in prompt form.
    pub fn from_log(log: &MessageLog) -> Vec<ChatMessage> {
        log.visible()
            .map(|message| ChatMessage { role: message.role, content: message.content.clone() })
            .collect()
    }
}

/// A tool invocation the model asked for by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Model output for one completion call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), tool_calls: Vec::new() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion capability unavailable: {0}")]
    Unavailable(String),
    #[error("completion response was malformed: {0}")]
    Malformed(String),
}

/// The opaque text-completion capability. Implementations live outside the
/// orchestration core; handlers receive it injected at construction.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion, CompletionError>;
}
