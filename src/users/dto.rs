use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::repo_types::User;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Collects one message per failing field.
#[derive(Debug, Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn required(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.0.push(format!("{field} is required"));
            return false;
        }
        true
    }

    fn email(&mut self, field: &str, value: &str) {
        if self.required(field, value) && !is_valid_email(value) {
            self.0.push(format!("{field} must be a valid email address"));
        }
    }

    fn finish(self) -> Result<(), Vec<String>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

/// Request body for `POST /register`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterUserInput {
    pub name: String,
    pub occupation: String,
    pub email: String,
    pub password: String,
}

impl RegisterUserInput {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
        self.name = self.name.trim().to_string();
        self.occupation = self.occupation.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = FieldErrors::default();
        errors.required("name", &self.name);
        errors.email("email", &self.email);
        errors.required("password", &self.password);
        errors.finish()
    }
}

/// Request body for `POST /login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = FieldErrors::default();
        errors.email("email", &self.email);
        errors.required("password", &self.password);
        errors.finish()
    }
}

/// Request body for `POST /email-check`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckEmailInput {
    pub email: String,
}

impl CheckEmailInput {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = FieldErrors::default();
        errors.email("email", &self.email);
        errors.finish()
    }
}

/// Public view of a user returned by register and login.
#[derive(Debug, Serialize)]
pub struct UserFormatter {
    pub id: i64,
    pub name: String,
    pub occupation: String,
    pub email: String,
    pub token: String,
    pub image_url: Option<String>,
}

impl UserFormatter {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            occupation: user.occupation,
            email: user.email,
            token: token.into(),
            image_url: user.avatar_file_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmailAvailability {
    pub is_available: bool,
}

#[derive(Debug, Serialize)]
pub struct AvatarUploaded {
    pub is_uploaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn email_regex() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no at sign.com"));
        assert!(!is_valid_email("two@@x.com"));
    }

    #[test]
    fn register_reports_every_failing_field() {
        let input = RegisterUserInput {
            email: "nope".into(),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "name is required",
                "email must be a valid email address",
                "password is required",
            ]
        );
    }

    #[test]
    fn register_occupation_is_optional() {
        let mut input: RegisterUserInput = serde_json::from_str(
            r#"{"email":" A@B.com ","password":"secret","name":"A"}"#,
        )
        .unwrap();
        input.normalize();
        assert_eq!(input.email, "a@b.com");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn login_and_check_email_require_email() {
        let login = LoginInput::default();
        assert_eq!(
            login.validate().unwrap_err(),
            vec!["email is required", "password is required"]
        );
        let check = CheckEmailInput::default();
        assert_eq!(check.validate().unwrap_err(), vec!["email is required"]);
    }

    #[test]
    fn formatter_omits_password_hash() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: 7,
            name: "A".into(),
            occupation: "".into(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$secret".into(),
            avatar_file_name: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&UserFormatter::new(user, "token")).unwrap();
        assert!(json.contains(r#""id":7"#));
        assert!(json.contains(r#""token":"token""#));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
