use std::sync::Arc;

use switchboard_core::Route;
use tracing::warn;

use crate::llm::CompletionClient;

const REWRITE_INSTRUCTION: &str = "You are the copy editor for a payments support assistant. \
Improve clarity and tone without changing the facts.\n\
STRICT RULES:\n\
1. If the original text ends with 'Source: [url]', you MUST keep it at the end, verbatim.\n\
2. If the original has no 'Source:', NEVER invent or write one.\n\
3. TONE: helpful, direct, friendly. Moderate emoji use (⚡, 🚀, 👨‍💼).";

/// Drafts shorter than this are returned as-is; the rewrite is not worth the
/// token cost.
const MIN_REWRITE_LEN: usize = 5;

const CITATION_MARKER: &str = "Source:";

/// Response convergence stage. Normalizes the final tone while preserving the
/// draft's substantive claims and its citation marker, if any.
pub struct PersonalityPass {
    completion: Arc<dyn CompletionClient>,
}

impl PersonalityPass {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    pub async fn polish(&self, session_id: &str, origin: Route, draft: &str) -> String {
        // Guardrail and fallback copy is already final-toned; rewriting a
        // refusal would only soften it.
        if matches!(origin, Route::Guardrail | Route::Fallback) {
            return draft.to_string();
        }
        if draft.chars().count() < MIN_REWRITE_LEN {
            return draft.to_string();
        }

        let system = format!("{REWRITE_INSTRUCTION}\nORIGINAL TEXT:\n{draft}");
        match self.completion.complete(&system, &[], &[]).await {
            Ok(completion) => sanitize(&completion.content),
            Err(error) => {
                warn!(
                    event_name = "turn.personality.completion_error",
                    session_id,
                    error = %error,
                    "rewrite failed, returning the original draft"
                );
                draft.to_string()
            }
        }
    }
}

/// Strips quote wrapping, then applies the anti-hallucination guard: a
/// citation marker without a URL-like token gets truncated away.
fn sanitize(rewritten: &str) -> String {
    let cleaned = rewritten.trim().replace('"', "");

    if let Some(marker_index) = cleaned.find(CITATION_MARKER) {
        if !cleaned[marker_index..].contains("http") {
            return cleaned[..marker_index].trim().to_string();
        }
    }

    cleaned
}
