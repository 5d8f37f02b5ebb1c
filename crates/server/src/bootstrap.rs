use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use switchboard_agent::engine::TurnEngine;
use switchboard_agent::knowledge::KnowledgeHandler;
use switchboard_agent::personality::PersonalityPass;
use switchboard_agent::router::Router;
use switchboard_agent::support::SupportHandler;
use switchboard_core::config::{AppConfig, ConfigError, LoadOptions};
use switchboard_db::repositories::{RepositoryError, SqlAccountRepository, SqlSessionStore};
use switchboard_db::{connect, fixtures, migrations, DbPool};

use crate::integrations::{llm, search, RepositoryDirectory};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<TurnEngine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("demo account seeding failed: {0}")]
    Seed(#[source] RepositoryError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let accounts = Arc::new(SqlAccountRepository::new(db_pool.clone()));
    if config.database.seed_demo_accounts {
        let seeded = fixtures::seed_demo_accounts(accounts.as_ref())
            .await
            .map_err(BootstrapError::Seed)?;
        info!(
            event_name = "system.bootstrap.accounts_seeded",
            count = seeded,
            "demo accounts seeded"
        );
    }

    let completion = Arc::new(
        llm::OpenAiCompatClient::from_config(&config.llm).map_err(BootstrapError::HttpClient)?,
    );
    let (knowledge_search, web_search) =
        search::build_clients(&config.search).map_err(BootstrapError::HttpClient)?;
    let knowledge_search = Arc::new(knowledge_search);
    let web_search = Arc::new(web_search);
    let directory = Arc::new(RepositoryDirectory::new(accounts));

    let engine = Arc::new(TurnEngine::new(
        Arc::new(SqlSessionStore::new(db_pool.clone())),
        Router::new(completion.clone(), config.routing.clone()),
        KnowledgeHandler::new(completion.clone(), knowledge_search, web_search),
        SupportHandler::new(completion.clone(), directory),
        PersonalityPass::new(completion),
    ));

    info!(
        event_name = "system.bootstrap.engine_ready",
        provider = %config.llm.provider.as_str(),
        model = %config.llm.model,
        "turn engine assembled"
    );

    Ok(Application { config, db_pool, engine })
}
