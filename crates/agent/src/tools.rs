use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

/// The closed set of tools the specialist handlers may execute. Model-named
/// tools resolve through `from_name`; anything unrecognized maps to `Unknown`
/// and is skipped instead of dispatched dynamically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    KnowledgeSearch,
    WebSearch,
    UserProfile,
    TransferStatus,
    Unknown,
}

impl ToolKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "knowledge_search" => Self::KnowledgeSearch,
            "web_search" => Self::WebSearch,
            "get_user_profile" => Self::UserProfile,
            "check_transfer_status" => Self::TransferStatus,
            _ => Self::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::KnowledgeSearch => "knowledge_search",
            Self::WebSearch => "web_search",
            Self::UserProfile => "get_user_profile",
            Self::TransferStatus => "check_transfer_status",
            Self::Unknown => "unknown",
        }
    }
}

/// Declaration of a tool as advertised to the completion capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolSpec {
    pub fn for_kind(kind: ToolKind) -> Self {
        match kind {
            ToolKind::KnowledgeSearch => Self {
                name: kind.name(),
                description: "Searches the official product knowledge base. Best for questions \
                              about fees, products, card readers, and processes.",
                parameters: query_parameters(),
            },
            ToolKind::WebSearch => Self {
                name: kind.name(),
                description: "Runs a live web search. Use for recent facts, exchange rates, or \
                              information outside the product knowledge base.",
                parameters: query_parameters(),
            },
            ToolKind::UserProfile => Self {
                name: kind.name(),
                description: "Fetches registration data and the current balance for a customer.",
                parameters: user_id_parameters(),
            },
            ToolKind::TransferStatus => Self {
                name: kind.name(),
                description: "Checks account restrictions (blocks, inactivity) affecting money \
                              movement.",
                parameters: user_id_parameters(),
            },
            ToolKind::Unknown => {
                Self { name: "unknown", description: "", parameters: json!({"type": "object"}) }
            }
        }
    }
}

fn query_parameters() -> Value {
    json!({
        "type": "object",
        "properties": { "query": { "type": "string" } },
        "required": ["query"]
    })
}

fn user_id_parameters() -> Value {
    json!({
        "type": "object",
        "properties": { "user_id": { "type": "string" } },
        "required": ["user_id"]
    })
}

/// Tool invocation failure. Never propagated to the caller; handlers fold the
/// text back into model context as degraded information.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ToolError(pub String);

#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, ToolError>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, ToolError>;
}

/// Account lookups backing the support tools. `Ok(None)` means the user id is
/// unknown, which is reported as text rather than treated as a failure.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<String>, ToolError>;
    async fn transfer_status(&self, user_id: &str) -> Result<Option<String>, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::{ToolKind, ToolSpec};

    #[test]
    fn known_names_round_trip() {
        for kind in [
            ToolKind::KnowledgeSearch,
            ToolKind::WebSearch,
            ToolKind::UserProfile,
            ToolKind::TransferStatus,
        ] {
            assert_eq!(ToolKind::from_name(kind.name()), kind);
        }
    }

    #[test]
    fn unknown_names_map_to_noop_variant() {
        assert_eq!(ToolKind::from_name("delete_account"), ToolKind::Unknown);
        assert_eq!(ToolKind::from_name(""), ToolKind::Unknown);
    }

    #[test]
    fn specs_declare_their_required_argument() {
        let spec = ToolSpec::for_kind(ToolKind::KnowledgeSearch);
        assert_eq!(spec.name, "knowledge_search");
        assert_eq!(spec.parameters["required"][0], "query");

        let spec = ToolSpec::for_kind(ToolKind::TransferStatus);
        assert_eq!(spec.parameters["required"][0], "user_id");
    }
}
