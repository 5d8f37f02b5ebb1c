use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use switchboard_agent::{AccountDirectory, ToolError};
use switchboard_db::repositories::AccountRepository;

/// Account lookups served straight from the account repository. Rendering is
/// delegated to the domain type so tool output and tests stay in one place.
pub struct RepositoryDirectory {
    repository: Arc<dyn AccountRepository>,
}

impl RepositoryDirectory {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl AccountDirectory for RepositoryDirectory {
    async fn profile(&self, user_id: &str) -> Result<Option<String>, ToolError> {
        let account = self.repository.find_by_user_id(user_id).await.map_err(|error| {
            warn!(
                event_name = "directory.profile.lookup_failed",
                user_id,
                error = %error,
                "account lookup failed"
            );
            ToolError(format!("account lookup failed: {error}"))
        })?;
        Ok(account.map(|account| account.profile_summary()))
    }

    async fn transfer_status(&self, user_id: &str) -> Result<Option<String>, ToolError> {
        let account = self.repository.find_by_user_id(user_id).await.map_err(|error| {
            warn!(
                event_name = "directory.transfer_status.lookup_failed",
                user_id,
                error = %error,
                "account lookup failed"
            );
            ToolError(format!("account lookup failed: {error}"))
        })?;
        Ok(account.map(|account| account.transfer_report()))
    }
}
