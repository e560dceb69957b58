use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use std::path::Path;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::{
    response::ApiResponse,
    state::AppState,
    users::dto::{
        AvatarUploaded, CheckEmailInput, EmailAvailability, LoginInput, RegisterUserInput,
        UserFormatter,
    },
};

/// Issued in place of a real session token.
const PLACEHOLDER_TOKEN: &str = "token";

const AVATAR_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/email-check", post(check_email_availability))
}

pub fn avatar_routes() -> Router<AppState> {
    Router::new()
        .route("/avatar", post(upload_avatar))
        .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT))
}

/// Turns a body that failed to decode or validate into the 422 envelope.
fn unprocessable(message: &str, errors: Vec<String>) -> ApiResponse {
    ApiResponse::error(
        message,
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "errors": errors }),
    )
}

fn decode<T>(
    payload: Result<Json<T>, JsonRejection>,
    message: &str,
) -> Result<T, ApiResponse> {
    match payload {
        Ok(Json(input)) => Ok(input),
        Err(rejection) => {
            warn!(error = %rejection, "request body rejected");
            Err(unprocessable(message, vec![rejection.body_text()]))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserInput>, JsonRejection>,
) -> ApiResponse {
    const FAILED: &str = "Register account failed";

    let mut input = match decode(payload, FAILED) {
        Ok(input) => input,
        Err(res) => return res,
    };
    input.normalize();
    if let Err(errors) = input.validate() {
        warn!(?errors, "register validation failed");
        return unprocessable(FAILED, errors);
    }

    match state.users.register_user(input).await {
        Ok(user) => ApiResponse::success(
            "Account has been registered",
            json!(UserFormatter::new(user, PLACEHOLDER_TOKEN)),
        ),
        Err(e) => {
            error!(error = %e, "register_user failed");
            ApiResponse::error(FAILED, StatusCode::BAD_REQUEST, Value::Null)
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> ApiResponse {
    const FAILED: &str = "Login failed";

    let mut input = match decode(payload, FAILED) {
        Ok(input) => input,
        Err(res) => return res,
    };
    input.normalize();
    if let Err(errors) = input.validate() {
        warn!(?errors, "login validation failed");
        return unprocessable(FAILED, errors);
    }

    match state.users.login(input).await {
        Ok(user) => ApiResponse::success(
            "Success login",
            json!(UserFormatter::new(user, PLACEHOLDER_TOKEN)),
        ),
        Err(e) => ApiResponse::error(
            FAILED,
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "errors": e.to_string() }),
        ),
    }
}

#[instrument(skip(state, payload))]
pub async fn check_email_availability(
    State(state): State<AppState>,
    payload: Result<Json<CheckEmailInput>, JsonRejection>,
) -> ApiResponse {
    const FAILED: &str = "Email Check Failed";

    let mut input = match decode(payload, FAILED) {
        Ok(input) => input,
        Err(res) => return res,
    };
    input.normalize();
    if let Err(errors) = input.validate() {
        warn!(?errors, "email check validation failed");
        return unprocessable(FAILED, errors);
    }

    match state.users.is_email_available(input).await {
        Ok(is_available) => {
            let message = if is_available {
                "Email is available"
            } else {
                "Email has been registered"
            };
            ApiResponse::success(message, json!(EmailAvailability { is_available }))
        }
        Err(e) => {
            error!(error = %e, "is_email_available failed");
            ApiResponse::error(
                FAILED,
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "errors": "Server error" }),
            )
        }
    }
}

struct AvatarFile {
    file_name: String,
    content_type: String,
    body: Bytes,
}

async fn read_avatar_field(mut mp: Multipart) -> anyhow::Result<AvatarFile> {
    while let Some(field) = mp.next_field().await? {
        if field.name() != Some("avatar") {
            continue;
        }
        // Only the final component is kept so the key always starts with the user id.
        let file_name = field
            .file_name()
            .and_then(|n| Path::new(n).file_name())
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| anyhow::anyhow!("avatar field has no usable file name"))?
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await?;
        return Ok(AvatarFile {
            file_name,
            content_type,
            body,
        });
    }
    anyhow::bail!("avatar field is required")
}

/// POST /avatar (multipart, field `avatar`)
///
/// The owner is the configured placeholder user until requests carry an
/// authenticated identity.
#[instrument(skip(state, mp))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> ApiResponse {
    let failed = || {
        ApiResponse::error(
            "Failed to upload avatar image",
            StatusCode::BAD_REQUEST,
            json!(AvatarUploaded { is_uploaded: false }),
        )
    };

    let file = match mp {
        Ok(mp) => read_avatar_field(mp).await,
        Err(rejection) => Err(anyhow::anyhow!(rejection.body_text())),
    };
    let file = match file {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "avatar upload rejected");
            return failed();
        }
    };

    let user_id = state.config.avatar.placeholder_user_id;
    let key = format!("{}-{}", user_id, file.file_name);

    let path = match state
        .storage
        .put_object(&key, file.body, &file.content_type)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, %key, "avatar write failed");
            return failed();
        }
    };

    if let Err(e) = state.users.save_avatar(user_id, &path).await {
        error!(error = %e, user_id, "save_avatar failed");
        return failed();
    }

    info!(user_id, %path, "avatar uploaded");
    ApiResponse::success(
        "Avatar successfully uploaded",
        json!(AvatarUploaded { is_uploaded: true }),
    )
}
