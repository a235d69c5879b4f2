use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gantt_shared::api::{StreamCreateReq, StreamDto, StreamUpdateReq};

use super::{optional_name, require_name};
use crate::server::auth::AuthCtx;
use crate::server::{AppError, AppState};
use crate::storage::models::Stream;

fn stream_dto(s: Stream) -> StreamDto {
    StreamDto {
        id: s.id,
        name: s.name,
        project_id: s.project_id,
    }
}

pub async fn list_streams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(project_id): Path<i32>,
) -> Result<Json<Vec<StreamDto>>, AppError> {
    let rows = state.store.list_streams(auth.user_id, project_id).await?;
    Ok(Json(rows.into_iter().map(stream_dto).collect()))
}

pub async fn get_stream(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<Json<StreamDto>, AppError> {
    let stream = state.store.get_stream(auth.user_id, id).await?;
    Ok(Json(stream_dto(stream)))
}

pub async fn create_stream(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(project_id): Path<i32>,
    Json(body): Json<StreamCreateReq>,
) -> Result<(StatusCode, Json<StreamDto>), AppError> {
    let name = require_name(&body.name)?;
    let stream = state
        .store
        .create_stream(auth.user_id, project_id, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(stream_dto(stream))))
}

pub async fn update_stream(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
    Json(body): Json<StreamUpdateReq>,
) -> Result<Json<StreamDto>, AppError> {
    let name = optional_name(body.name)?;
    let stream = state.store.update_stream(auth.user_id, id, name).await?;
    Ok(Json(stream_dto(stream)))
}

pub async fn delete_stream(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.store.delete_stream(auth.user_id, id).await?;
    tracing::info!(stream_id = id, "stream deleted");
    Ok(StatusCode::NO_CONTENT)
}
