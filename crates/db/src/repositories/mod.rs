use async_trait::async_trait;
use thiserror::Error;

use switchboard_core::Account;

pub mod account;
pub mod memory;
pub mod session;

pub use account::SqlAccountRepository;
pub use memory::{InMemoryAccountRepository, InMemorySessionStore};
pub use session::SqlSessionStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Account>, RepositoryError>;
    async fn save(&self, account: Account) -> Result<(), RepositoryError>;
}
