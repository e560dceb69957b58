use crate::state::AppState;
use axum::Router;

pub mod dto;
mod error;
pub mod handlers;
mod repo;
mod repo_types;
mod services;

pub use repo::{InMemoryUserRepository, PgUserRepository, UserRepository};
pub use services::{AccountService, UserService};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::account_routes())
        .merge(handlers::avatar_routes())
}
