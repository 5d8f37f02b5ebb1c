use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::message::MessageLog;
use crate::errors::StoreError;

/// The five terminal destinations the router can select for a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Knowledge,
    Support,
    Guardrail,
    HumanHandoff,
    Fallback,
}

impl Route {
    pub const ALL: [Route; 5] =
        [Route::Knowledge, Route::Support, Route::Guardrail, Route::HumanHandoff, Route::Fallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::Support => "support",
            Self::Guardrail => "guardrail",
            Self::HumanHandoff => "human_handoff",
            Self::Fallback => "fallback",
        }
    }

    /// Normalizes a raw classifier answer and matches it against the valid
    /// destination names. Models routinely wrap the single-token answer in
    /// quotes, backticks, or a trailing period; anything beyond that is
    /// treated as unclassifiable.
    pub fn parse(raw: &str) -> Option<Route> {
        let cleaned: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '\'' | '"' | '`' | '.'))
            .collect();

        Route::ALL.into_iter().find(|route| route.as_str() == cleaned)
    }
}

/// Per-session conversation state. Owned by the session store; the turn
/// engine mutates a loaded copy and commits it back once per turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub log: MessageLog,
    pub pending_route: Option<Route>,
    pub draft_response: String,
    pub retry_count: u32,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            log: MessageLog::new(),
            pending_route: None,
            draft_response: String::new(),
            retry_count: 0,
        }
    }
}

/// Durable session persistence contract.
///
/// `load` creates an empty state for an unseen session id. A `commit` must be
/// visible to the next `load` of the same session, and must apply the whole
/// turn delta or none of it. No cross-session ordering is guaranteed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<SessionState, StoreError>;
    async fn commit(&self, state: &SessionState) -> Result<(), StoreError>;
}
