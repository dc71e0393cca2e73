use crate::error::AppError;
use crate::storage::users::UserStore;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Verified caller identity attached to each authenticated request.
/// Everything past the middleware trusts this and never re-authenticates.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub user_id: String,
}

/// State for the authentication middleware
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub users: Arc<UserStore>,
    /// Pool for the non-blocking last_used_at update
    pub db_pool: SqlitePool,
}

/// Authentication middleware
/// Extracts the Bearer token from the Authorization header and resolves
/// its SHA-256 hash to a user id via the api_tokens table.
pub async fn auth_middleware(
    State(state): State<Arc<AuthMiddlewareState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = extract_bearer_token(auth_header)?;
    let token_hash = format!("{:x}", Sha256::digest(token.as_bytes()));

    let user_id = state
        .users
        .user_id_for_token_hash(&token_hash)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or revoked API token".to_string()))?;

    // Async update of last_used_at (non-blocking)
    update_last_used_async(state.db_pool.clone(), token_hash);

    req.extensions_mut().insert(AuthInfo { user_id });
    Ok(next.run(req).await)
}

/// Update last_used_at asynchronously without blocking the request
fn update_last_used_async(pool: SqlitePool, token_hash: String) {
    tokio::spawn(async move {
        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            UPDATE api_tokens
            SET last_used_at = ?
            WHERE token_hash = ? AND revoked_at IS NULL
            "#,
        )
        .bind(now)
        .bind(&token_hash)
        .execute(&pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                error = %e,
                token_hash_prefix = &token_hash[..8],
                "Failed to update last_used_at timestamp"
            );
        }
    });
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Result<&str, AppError> {
    const BEARER_PREFIX: &str = "Bearer ";

    if !auth_header.starts_with(BEARER_PREFIX) {
        return Err(AppError::Unauthorized(
            "Authorization header must use Bearer scheme".to_string(),
        ));
    }

    let token = &auth_header[BEARER_PREFIX.len()..];

    if token.is_empty() {
        return Err(AppError::Unauthorized("Bearer token is empty".to_string()));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token_success() {
        let header = "Bearer cp_test-token-123";
        let token = extract_bearer_token(header).unwrap();
        assert_eq!(token, "cp_test-token-123");
    }

    #[test]
    fn test_extract_bearer_token_missing_prefix() {
        let header = "cp_test-token-123";
        assert!(extract_bearer_token(header).is_err());
    }

    #[test]
    fn test_extract_bearer_token_empty() {
        let header = "Bearer ";
        assert!(extract_bearer_token(header).is_err());
    }
}
