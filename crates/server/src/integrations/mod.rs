//! Concrete implementations of the engine's injected capabilities.

pub mod accounts;
pub mod llm;
pub mod search;

pub use accounts::RepositoryDirectory;
pub use llm::OpenAiCompatClient;
pub use search::{HttpKnowledgeSearch, HttpWebSearch};
