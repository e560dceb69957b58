use crate::config::{AppConfig, UserStore};
use crate::storage::{LocalStorage, StorageClient};
use crate::users::{
    AccountService, InMemoryUserRepository, PgUserRepository, UserRepository, UserService,
};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserService>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    /// Opens the configured user store and the avatar directory.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let repo: Arc<dyn UserRepository> = match &config.store {
            UserStore::Postgres { database_url } => {
                let db = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(database_url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgUserRepository::new(db))
            }
            UserStore::Memory => {
                tracing::warn!("using in-memory user store; accounts are lost on exit");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        let storage = Arc::new(LocalStorage::new(&config.avatar.dir)) as Arc<dyn StorageClient>;
        Ok(Self::from_parts(
            Arc::new(config),
            Arc::new(AccountService::new(repo)),
            storage,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserService>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            config,
            users,
            storage,
        }
    }
}
