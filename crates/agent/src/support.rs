use std::sync::Arc;

use serde_json::Value;
use switchboard_core::{Message, SessionState};
use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionClient, ToolCallRequest};
use crate::tools::{AccountDirectory, ToolError, ToolKind, ToolSpec};

pub const DEGRADED_MESSAGE: &str = "Sorry, the support system is unstable right now.";

fn instruction(user_id: &str) -> String {
    format!(
        "You are a technical support assistant. Customer ID: {user_id}.\n\
         Goal: resolve account problems.\n\
         GUIDELINES:\n\
         1. Asked about balance or registration data? -> USE 'get_user_profile'.\n\
         2. Reported an error or a failed operation? -> USE 'check_transfer_status'.\n\
         3. NEVER invent data."
    )
}

/// Handler for account-action requests. Binds the two account-lookup tools
/// and injects the session's customer id into calls that omit it, since the
/// lookups cannot run without one.
pub struct SupportHandler {
    completion: Arc<dyn CompletionClient>,
    accounts: Arc<dyn AccountDirectory>,
}

impl SupportHandler {
    pub fn new(completion: Arc<dyn CompletionClient>, accounts: Arc<dyn AccountDirectory>) -> Self {
        Self { completion, accounts }
    }

    pub async fn handle(&self, state: &mut SessionState) -> String {
        let specs = [
            ToolSpec::for_kind(ToolKind::UserProfile),
            ToolSpec::for_kind(ToolKind::TransferStatus),
        ];
        let system = instruction(&state.session_id);
        let mut prompt = ChatMessage::from_log(&state.log);

        let first = match self.completion.complete(&system, &prompt, &specs).await {
            Ok(completion) => completion,
            Err(error) => {
                warn!(
                    event_name = "turn.support.completion_error",
                    session_id = %state.session_id,
                    error = %error,
                    "initial completion failed, serving degraded message"
                );
                state.log.append(Message::assistant(DEGRADED_MESSAGE));
                return DEGRADED_MESSAGE.to_string();
            }
        };

        let mut draft = first.content;

        if !first.tool_calls.is_empty() {
            for call in &first.tool_calls {
                let user_id = resolve_user_id(call, &state.session_id);
                let output = match ToolKind::from_name(&call.name) {
                    ToolKind::UserProfile => self.lookup_profile(&user_id).await,
                    ToolKind::TransferStatus => self.lookup_transfer_status(&user_id).await,
                    other => {
                        debug!(
                            event_name = "turn.support.tool_skipped",
                            session_id = %state.session_id,
                            tool_name = %call.name,
                            resolved = other.name(),
                            "tool not in this handler's set, ignoring"
                        );
                        continue;
                    }
                };

                prompt.push(match output {
                    Ok(result) => ChatMessage::system(format!("System: {result}")),
                    Err(error) => ChatMessage::system(format!("Tool error: {error}")),
                });
            }

            draft = match self.completion.complete(&system, &prompt, &[]).await {
                Ok(completion) => completion.content,
                Err(error) => {
                    warn!(
                        event_name = "turn.support.completion_error",
                        session_id = %state.session_id,
                        error = %error,
                        "post-tool completion failed, serving degraded message"
                    );
                    DEGRADED_MESSAGE.to_string()
                }
            };
        }

        state.log.append(Message::assistant(draft.clone()));
        draft
    }

    async fn lookup_profile(&self, user_id: &str) -> Result<String, ToolError> {
        Ok(self
            .accounts
            .profile(user_id)
            .await?
            .unwrap_or_else(|| format!("User '{user_id}' was not found in the directory.")))
    }

    async fn lookup_transfer_status(&self, user_id: &str) -> Result<String, ToolError> {
        Ok(self
            .accounts
            .transfer_status(user_id)
            .await?
            .unwrap_or_else(|| "User not found.".to_string()))
    }
}

/// The model sometimes omits `user_id` from its tool arguments; the session's
/// customer id fills the gap.
fn resolve_user_id(call: &ToolCallRequest, session_user_id: &str) -> String {
    match call.arguments.get("user_id").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => session_user_id.to_string(),
    }
}
