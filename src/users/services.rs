use std::sync::Arc;

use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use rand::rngs::OsRng;
use tracing::{error, info, warn};

use super::dto::{CheckEmailInput, LoginInput, RegisterUserInput};
use super::error::{UserError, UserResult};
use super::repo::UserRepository;
use super::repo_types::{NewUser, User};

pub fn hash_password(plain: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            UserError::PasswordHash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> UserResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        UserError::PasswordHash(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Account operations exposed to the HTTP layer.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn register_user(&self, input: RegisterUserInput) -> UserResult<User>;

    /// Fails with [`UserError::InvalidCredentials`] for an unknown email or a wrong password.
    async fn login(&self, input: LoginInput) -> UserResult<User>;

    async fn is_email_available(&self, input: CheckEmailInput) -> UserResult<bool>;

    /// Records `path` as the avatar of `user_id`; no other field changes.
    async fn save_avatar(&self, user_id: i64, path: &str) -> UserResult<User>;
}

#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn UserRepository>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserService for AccountService {
    async fn register_user(&self, input: RegisterUserInput) -> UserResult<User> {
        let password_hash = hash_password(&input.password)?;
        let user = self
            .repo
            .save(NewUser {
                name: input.name,
                occupation: input.occupation,
                email: input.email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    async fn login(&self, input: LoginInput) -> UserResult<User> {
        let Some(user) = self.repo.find_by_email(&input.email).await? else {
            warn!(email = %input.email, "login unknown email");
            return Err(UserError::InvalidCredentials);
        };

        if !verify_password(&input.password, &user.password_hash)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(UserError::InvalidCredentials);
        }

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    async fn is_email_available(&self, input: CheckEmailInput) -> UserResult<bool> {
        Ok(self.repo.find_by_email(&input.email).await?.is_none())
    }

    async fn save_avatar(&self, user_id: i64, path: &str) -> UserResult<User> {
        let mut user = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::NotFound(user_id))?;
        user.avatar_file_name = Some(path.to_string());

        let updated = self.repo.update(user).await?;
        info!(user_id, path, "avatar saved");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::InMemoryUserRepository;

    fn service() -> (AccountService, InMemoryUserRepository) {
        let repo = InMemoryUserRepository::new();
        (AccountService::new(Arc::new(repo.clone())), repo)
    }

    fn register_input(email: &str, password: &str) -> RegisterUserInput {
        RegisterUserInput {
            name: "Ada".into(),
            occupation: "engineer".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_input(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("Secur3P@ssw0rd!").expect("hashing should succeed");
        assert!(verify_password("Secur3P@ssw0rd!", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, UserError::PasswordHash(_)));
    }

    #[tokio::test]
    async fn register_hashes_password_and_assigns_id() {
        let (svc, _) = service();
        let user = svc
            .register_user(register_input("a@b.com", "secret"))
            .await
            .unwrap();
        assert!(user.id > 0);
        assert_ne!(user.password_hash, "secret");
        assert!(verify_password("secret", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn register_twice_with_same_email_succeeds() {
        let (svc, _) = service();
        let first = svc.register_user(register_input("a@b.com", "x")).await.unwrap();
        let second = svc.register_user(register_input("a@b.com", "y")).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn login_outcomes() {
        let (svc, _) = service();
        let registered = svc
            .register_user(register_input("a@b.com", "secret"))
            .await
            .unwrap();

        let user = svc.login(login_input("a@b.com", "secret")).await.unwrap();
        assert_eq!(user.id, registered.id);

        let err = svc.login(login_input("a@b.com", "nope")).await.unwrap_err();
        assert!(matches!(err, UserError::InvalidCredentials));

        let err = svc.login(login_input("x@y.com", "secret")).await.unwrap_err();
        assert!(matches!(err, UserError::InvalidCredentials));
    }

    #[tokio::test]
    async fn email_availability() {
        let (svc, _) = service();
        let check = |email: &str| CheckEmailInput { email: email.into() };

        assert!(svc.is_email_available(check("a@b.com")).await.unwrap());
        svc.register_user(register_input("a@b.com", "secret"))
            .await
            .unwrap();
        assert!(!svc.is_email_available(check("a@b.com")).await.unwrap());
        assert!(svc.is_email_available(check("c@d.com")).await.unwrap());
    }

    #[tokio::test]
    async fn save_avatar_only_touches_avatar_path() {
        let (svc, repo) = service();
        let before = svc
            .register_user(register_input("a@b.com", "secret"))
            .await
            .unwrap();

        svc.save_avatar(before.id, "images/1-me.png").await.unwrap();

        let after = repo.find_by_id(before.id).await.unwrap().unwrap();
        assert_eq!(after.avatar_file_name.as_deref(), Some("images/1-me.png"));
        assert_eq!(after.name, before.name);
        assert_eq!(after.occupation, before.occupation);
        assert_eq!(after.email, before.email);
        assert_eq!(after.password_hash, before.password_hash);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn save_avatar_for_unknown_user_fails() {
        let (svc, _) = service();
        let err = svc.save_avatar(4, "images/4-me.png").await.unwrap_err();
        assert!(matches!(err, UserError::NotFound(4)));
    }
}
