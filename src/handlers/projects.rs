use crate::auth::AuthInfo;
use crate::entitlement::{Action, Decision};
use crate::error::AppError;
use crate::handlers::AppState;
use crate::pricing::assembler::{self, ProjectMeta};
use crate::pricing::engine;
use crate::pricing::models::PricingInput;
use crate::storage::projects::{Project, ProjectStatus};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

/// Body for creating or replacing a project: descriptive metadata plus the
/// pricing input fields inline. Breakdown fields are never accepted from
/// the client; they are recomputed on every save so the stored breakdown
/// cannot drift from its input.
#[derive(Debug, Deserialize)]
pub struct ProjectPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub template_id: Option<i64>,
    #[serde(default = "default_status")]
    pub status: ProjectStatus,
    #[serde(flatten)]
    pub input: PricingInput,
}

fn default_status() -> ProjectStatus {
    ProjectStatus::Draft
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(state.projects.list(&auth.user_id).await?))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Path(id): Path<i64>,
) -> Result<Json<Project>, AppError> {
    let project = state
        .projects
        .get(id, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// GET /api/projects/:id/input
///
/// The stored calculation reconstructed for re-editing
pub async fn get_project_input(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Path(id): Path<i64>,
) -> Result<Json<PricingInput>, AppError> {
    let project = state
        .projects
        .get(id, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(assembler::to_input(&project)))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Json(payload): Json<ProjectPayload>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let new = assemble(&state, &auth, payload).await?;
    let project = state.projects.create(new).await?;
    tracing::info!(project_id = project.id, owner_id = %project.owner_id, "Created project");

    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /api/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Path(id): Path<i64>,
    Json(payload): Json<ProjectPayload>,
) -> Result<Json<Project>, AppError> {
    let new = assemble(&state, &auth, payload).await?;
    let project = state
        .projects
        .update(id, &auth.user_id, new)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.projects.delete(id, &auth.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Project not found".to_string()))
    }
}

/// Shared save pipeline: authorize as a save (no credit consumed),
/// normalize, recompute the breakdown, merge into a persistable record.
async fn assemble(
    state: &AppState,
    auth: &AuthInfo,
    payload: ProjectPayload,
) -> Result<crate::storage::projects::NewProject, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Project name must not be empty".to_string(),
        ));
    }

    let account = state
        .users
        .get_account(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Decision::Denied(_) = state.policy().authorize(&account, Action::Save) {
        return Err(AppError::LimitReached(
            "Free calculation limit reached. Please upgrade to continue.".to_string(),
        ));
    }

    let input = payload.input.normalized();
    let breakdown = engine::compute(&input);

    Ok(assembler::to_project(
        &input,
        &breakdown,
        ProjectMeta {
            owner_id: auth.user_id.clone(),
            name: payload.name,
            description: payload.description,
            category_id: payload.category_id,
            template_id: payload.template_id,
            status: payload.status,
        },
    ))
}
