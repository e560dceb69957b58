mod app;
mod config;
mod response;
mod state;
mod storage;
mod users;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "accountd=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    tracing::info!(
        avatar_dir = %config.avatar.dir.display(),
        avatar_user_id = config.avatar.placeholder_user_id,
        "avatar uploads are attributed to a fixed user"
    );

    let state = AppState::init(config).await?;
    let config = state.config.clone();
    app::serve(&config, app::build_app(state)).await
}
