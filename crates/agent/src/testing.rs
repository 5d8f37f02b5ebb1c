//! Shared scripted fakes for handler and engine tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{ChatMessage, Completion, CompletionClient, CompletionError};
use crate::tools::{AccountDirectory, KnowledgeSearch, ToolError, ToolSpec, WebSearch};

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tool_names: Vec<&'static str>,
}

/// Completion fake that replays a fixed script of results and records every
/// call it receives.
pub struct ScriptedCompletion {
    script: Mutex<Vec<Result<Completion, CompletionError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<Result<Completion, CompletionError>>) -> Self {
        Self { script: Mutex::new(script), calls: Mutex::new(Vec::new()) }
    }

    /// Plain-text answers, in call order.
    pub fn answering<const N: usize>(answers: [&str; N]) -> Self {
        Self::new(answers.into_iter().map(|a| Ok(Completion::text(a))).collect())
    }

    /// Every call fails as if the capability were unreachable.
    pub fn unavailable() -> Self {
        Self { script: Mutex::new(Vec::new()), calls: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().expect("calls lock").last().cloned()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion, CompletionError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            system: system.to_string(),
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|spec| spec.name).collect(),
        });

        let mut script = self.script.lock().expect("script lock");
        if script.is_empty() {
            return Err(CompletionError::Unavailable("scripted outage".to_string()));
        }
        script.remove(0)
    }
}

/// Knowledge search fake returning one canned payload.
pub struct StaticKnowledge(pub &'static str);

#[async_trait]
impl KnowledgeSearch for StaticKnowledge {
    async fn search(&self, _query: &str) -> Result<String, ToolError> {
        Ok(self.0.to_string())
    }
}

/// Knowledge search fake that always fails.
pub struct BrokenKnowledge;

#[async_trait]
impl KnowledgeSearch for BrokenKnowledge {
    async fn search(&self, _query: &str) -> Result<String, ToolError> {
        Err(ToolError("knowledge base unreachable".to_string()))
    }
}

pub struct StaticWeb(pub &'static str);

#[async_trait]
impl WebSearch for StaticWeb {
    async fn search(&self, _query: &str) -> Result<String, ToolError> {
        Ok(self.0.to_string())
    }
}

/// Account directory fake that records the user ids it was queried with.
#[derive(Default)]
pub struct RecordingDirectory {
    pub queried: Mutex<Vec<String>>,
}

#[async_trait]
impl AccountDirectory for RecordingDirectory {
    async fn profile(&self, user_id: &str) -> Result<Option<String>, ToolError> {
        self.queried.lock().expect("queried lock").push(user_id.to_string());
        if user_id == "client_happy" {
            Ok(Some("name: João da Silva | balance: 1500.50 | status: active".to_string()))
        } else {
            Ok(None)
        }
    }

    async fn transfer_status(&self, user_id: &str) -> Result<Option<String>, ToolError> {
        self.queried.lock().expect("queried lock").push(user_id.to_string());
        if user_id == "client_happy" {
            Ok(Some("Account is active and operational.".to_string()))
        } else {
            Ok(None)
        }
    }
}
