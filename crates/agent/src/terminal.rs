//! Terminal handlers: canned outcomes that never call the model.
//!
//! Fallback and guardrail turns redact the triggering user message from the
//! persisted log (keeping it would bias future stateless classification) and
//! append no assistant message, so a failed turn leaves no trace beyond the
//! redaction. A human handoff is a legitimate conversational outcome and is
//! recorded in the log.

use rand::seq::SliceRandom;
use switchboard_core::{Message, Role, SessionState};
use tracing::info;

pub const FALLBACK_TEMPLATES: &[&str] = &[
    "Sorry, I only specialize in our payment products and finances.",
    "I didn't understand. Could you rephrase that around our services?",
    "That is outside my current knowledge.",
];

pub const GUARDRAIL_REFUSAL: &str = "🚫 Action blocked for safety and compliance reasons.";

pub const HANDOFF_ACK: &str = "Understood. Starting the transfer to a human agent.";

const HANDOFF_LOG_MARKER: &str = "[system] Transferring to a human agent...";

pub fn fallback(state: &mut SessionState) -> String {
    redact_triggering_message(state);
    let mut rng = rand::thread_rng();
    FALLBACK_TEMPLATES
        .choose(&mut rng)
        .copied()
        .unwrap_or(FALLBACK_TEMPLATES[0])
        .to_string()
}

pub fn guardrail(state: &mut SessionState) -> String {
    redact_triggering_message(state);
    GUARDRAIL_REFUSAL.to_string()
}

pub fn human_handoff(state: &mut SessionState) -> String {
    state.log.append(Message::assistant(HANDOFF_LOG_MARKER));
    HANDOFF_ACK.to_string()
}

fn redact_triggering_message(state: &mut SessionState) {
    let target = state
        .log
        .last_visible()
        .filter(|message| message.role == Role::User)
        .map(|message| message.id.clone());

    if let Some(id) = target {
        state.log.redact(&id);
        info!(
            event_name = "turn.terminal.message_redacted",
            session_id = %state.session_id,
            "triggering user message redacted from the persisted log"
        );
    }
}
