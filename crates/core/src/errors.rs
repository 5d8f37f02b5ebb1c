use thiserror::Error;

/// Session persistence failure. The only failure category that is fatal to a
/// turn; everything else in the pipeline degrades into a textual reply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("session load failed: {0}")]
    Load(String),
    #[error("session commit failed: {0}")]
    Commit(String),
    #[error("stored session state is corrupt: {0}")]
    Decode(String),
}

/// Error surface of a single orchestrated turn.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl TurnError {
    /// Caller-safe summary; internals stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Persistence(_) => "The service is temporarily unavailable. Please retry shortly.",
        }
    }
}
