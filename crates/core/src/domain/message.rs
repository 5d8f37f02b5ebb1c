use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// A single chat turn entry. Immutable once created; identity is the id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { id: MessageId::generate(), role, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: Message,
    pub redacted: bool,
}

/// Append-only conversation history. Entries are never physically removed;
/// a redacted entry stays in storage for audit but is excluded from reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    entries: Vec<LogEntry>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, message: Message) {
        debug_assert!(
            !self.entries.iter().any(|entry| entry.message.id == message.id),
            "message ids must be unique within a log"
        );
        self.entries.push(LogEntry { message, redacted: false });
    }

    /// Marks the entry with the given id as redacted. Returns false when no
    /// entry carries that id or it is already redacted.
    pub fn redact(&mut self, id: &MessageId) -> bool {
        match self.entries.iter_mut().find(|entry| &entry.message.id == id) {
            Some(entry) if !entry.redacted => {
                entry.redacted = true;
                true
            }
            _ => false,
        }
    }

    /// Non-redacted messages in insertion order.
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter(|entry| !entry.redacted).map(|entry| &entry.message)
    }

    pub fn last_visible(&self) -> Option<&Message> {
        self.visible().last()
    }

    pub fn visible_len(&self) -> usize {
        self.visible().count()
    }

    /// Every entry including redacted ones, for persistence and audit.
    pub fn iter_all(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.visible_len() == 0
    }
}
