use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user {0} not found")]
    NotFound(i64),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("password hashing error: {0}")]
    PasswordHash(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type UserResult<T> = Result<T, UserError>;
