use crate::auth::AuthInfo;
use crate::error::AppError;
use crate::handlers::AppState;
use crate::storage::projects::ProjectStats;
use axum::{extract::State, Extension, Json};

/// GET /api/analytics/stats
///
/// Per-user project aggregates for the analytics dashboard
pub async fn user_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<ProjectStats>, AppError> {
    Ok(Json(state.projects.stats(&auth.user_id).await?))
}
