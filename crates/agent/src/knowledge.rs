use std::sync::Arc;

use switchboard_core::{Message, SessionState};
use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionClient};
use crate::tools::{KnowledgeSearch, ToolKind, ToolSpec, WebSearch};

const INSTRUCTION: &str = "You are a product specialist for a payments platform.\n\
1. Use the tools to look information up before answering.\n\
2. IMPORTANT: if a tool result provides a link, end your answer citing it in the exact form \
'Source: [url]'.\n\
3. If there is no link, do not invent one.";

pub const DEGRADED_MESSAGE: &str =
    "Sorry, the knowledge service is unstable right now. Please try again in a moment.";

/// Handler for informational questions. Context-aware: the full visible
/// session history goes into the prompt, unlike the router's classification.
pub struct KnowledgeHandler {
    completion: Arc<dyn CompletionClient>,
    knowledge: Arc<dyn KnowledgeSearch>,
    web: Arc<dyn WebSearch>,
}

impl KnowledgeHandler {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        knowledge: Arc<dyn KnowledgeSearch>,
        web: Arc<dyn WebSearch>,
    ) -> Self {
        Self { completion, knowledge, web }
    }

    /// Produces the draft reply and appends it to the session log so history
    /// stays consistent with what the user was shown, even when degraded.
    pub async fn handle(&self, state: &mut SessionState) -> String {
        let specs = [
            ToolSpec::for_kind(ToolKind::KnowledgeSearch),
            ToolSpec::for_kind(ToolKind::WebSearch),
        ];
        let mut prompt = ChatMessage::from_log(&state.log);

        let first = match self.completion.complete(INSTRUCTION, &prompt, &specs).await {
            Ok(completion) => completion,
            Err(error) => {
                warn!(
                    event_name = "turn.knowledge.completion_error",
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
            // One tool round only: results are fed back once and never
            // re-examined for further tool calls.
            for call in &first.tool_calls {
                let query = call.argument_str("query").unwrap_or_default();
                let output = match ToolKind::from_name(&call.name) {
                    ToolKind::KnowledgeSearch => self.knowledge.search(query).await,
                    ToolKind::WebSearch => self.web.search(query).await,
                    other => {
                        debug!(
                            event_name = "turn.knowledge.tool_skipped",
                            session_id = %state.session_id,
                            tool_name = %call.name,
                            resolved = other.name(),
                            "tool not in this handler's set, ignoring"
                        );
                        continue;
                    }
                };

                prompt.push(match output {
                    Ok(result) => ChatMessage::system(format!("Data: {result}")),
                    Err(error) => ChatMessage::system(format!("Error: {error}")),
                });
            }

            draft = match self.completion.complete(INSTRUCTION, &prompt, &[]).await {
                Ok(completion) => completion.content,
                Err(error) => {
                    warn!(
                        event_name = "turn.knowledge.completion_error",
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
}
