use crate::auth::AuthInfo;
use crate::error::AppError;
use crate::handlers::AppState;
use crate::storage::users::UserAccount;
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account: UserAccount,
    /// Plaintext API token, shown exactly once
    pub token: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if let Some(email) = &req.email {
        if !email.contains('@') {
            return Err(AppError::InvalidRequest(
                "Invalid email address".to_string(),
            ));
        }
    }

    let (account, token) = state.users.create_account(req.email).await?;
    tracing::info!(user_id = %account.id, "Registered new account");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { account, token }),
    ))
}

/// GET /api/auth/user
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<UserAccount>, AppError> {
    let account = state
        .users
        .get_account(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(account))
}
