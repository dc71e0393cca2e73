use crate::auth::AuthInfo;
use crate::error::AppError;
use crate::handlers::AppState;
use crate::storage::catalog::{Category, NewCategory, NewTemplate, Template};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(new): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = state.catalog.create_category(new).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/templates
///
/// Public templates plus the caller's own private ones
pub async fn list_templates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<Vec<Template>>, AppError> {
    Ok(Json(state.catalog.list_templates(Some(&auth.user_id)).await?))
}

/// GET /api/templates/:id
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Template>, AppError> {
    let template = state
        .catalog
        .get_template(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

    Ok(Json(template))
}

/// POST /api/templates
pub async fn create_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Json(mut new): Json<NewTemplate>,
) -> Result<(StatusCode, Json<Template>), AppError> {
    new.created_by = Some(auth.user_id.clone());
    let template = state.catalog.create_template(new).await?;
    Ok((StatusCode::CREATED, Json(template)))
}
