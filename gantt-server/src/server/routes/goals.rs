use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gantt_shared::api::{GoalCreateReq, GoalDto, GoalUpdateReq};

use super::{format_ts, optional_name, parse_ts, parse_ts_patch, require_name};
use crate::server::auth::AuthCtx;
use crate::server::{AppError, AppState};
use crate::storage::models::Goal;
use crate::storage::{GoalInput, GoalPatch};

fn goal_dto(g: Goal) -> GoalDto {
    GoalDto {
        id: g.id,
        name: g.name,
        description: g.description,
        start_date: format_ts(g.start_date),
        deadline: format_ts(g.deadline),
        stream_id: g.stream_id,
        position: g.position,
    }
}

pub async fn list_goals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(stream_id): Path<i32>,
) -> Result<Json<Vec<GoalDto>>, AppError> {
    let rows = state.store.list_goals(auth.user_id, stream_id).await?;
    Ok(Json(rows.into_iter().map(goal_dto).collect()))
}

pub async fn create_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(stream_id): Path<i32>,
    Json(body): Json<GoalCreateReq>,
) -> Result<(StatusCode, Json<GoalDto>), AppError> {
    let input = GoalInput {
        name: require_name(&body.name)?,
        description: body.description,
        start_date: parse_ts(body.start_date.as_deref())?,
        deadline: parse_ts(body.deadline.as_deref())?,
        position: body.position,
    };
    let goal = state
        .store
        .create_goal(auth.user_id, stream_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(goal_dto(goal))))
}

pub async fn update_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
    Json(body): Json<GoalUpdateReq>,
) -> Result<Json<GoalDto>, AppError> {
    let patch = GoalPatch {
        name: optional_name(body.name)?,
        description: body.description,
        start_date: parse_ts_patch(body.start_date)?,
        deadline: parse_ts_patch(body.deadline)?,
        position: body.position,
    };
    let goal = state.store.update_goal(auth.user_id, id, patch).await?;
    Ok(Json(goal_dto(goal)))
}

pub async fn delete_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.store.delete_goal(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
