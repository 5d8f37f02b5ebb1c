use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use switchboard_core::{Account, SessionState, SessionStore, StoreError};

use super::{AccountRepository, RepositoryError};

/// In-memory session store with the same contract as the sqlite one.
/// Used by tests and by deployments that do not need durable sessions.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<SessionState, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned().unwrap_or_else(|| SessionState::new(session_id)))
    }

    async fn commit(&self, state: &SessionState) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(state.session_id.clone(), state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.accounts.write().await;
            for account in accounts {
                map.insert(account.user_id.clone(), account);
            }
        }
        repo
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(user_id).cloned())
    }

    async fn save(&self, account: Account) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.user_id.clone(), account);
        Ok(())
    }
}
