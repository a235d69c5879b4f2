use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gantt_shared::api::{ProjectCreateReq, ProjectDto, ProjectUpdateReq};

use super::{optional_name, require_name};
use crate::server::auth::AuthCtx;
use crate::server::{AppError, AppState};
use crate::storage::models::Project;

fn project_dto(p: Project) -> ProjectDto {
    ProjectDto {
        id: p.id,
        name: p.name,
        team_id: p.team_id,
    }
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(team_id): Path<i32>,
) -> Result<Json<Vec<ProjectDto>>, AppError> {
    let rows = state.store.list_projects(auth.user_id, team_id).await?;
    Ok(Json(rows.into_iter().map(project_dto).collect()))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(team_id): Path<i32>,
    Json(body): Json<ProjectCreateReq>,
) -> Result<(StatusCode, Json<ProjectDto>), AppError> {
    let name = require_name(&body.name)?;
    let project = state
        .store
        .create_project(auth.user_id, team_id, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(project_dto(project))))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
    Json(body): Json<ProjectUpdateReq>,
) -> Result<Json<ProjectDto>, AppError> {
    let name = optional_name(body.name)?;
    let project = state.store.update_project(auth.user_id, id, name).await?;
    Ok(Json(project_dto(project)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.store.delete_project(auth.user_id, id).await?;
    tracing::info!(project_id = id, "project deleted");
    Ok(StatusCode::NO_CONTENT)
}
