use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gantt_shared::api::{
    TaskCreateReq, TaskDto, TaskFullDto, TaskRelationCreateReq, TaskRelationDto, TaskUpdateReq,
};

use super::{format_ts, optional_name, parse_ts, parse_ts_patch, require_name};
use crate::server::auth::AuthCtx;
use crate::server::{AppError, AppState};
use crate::storage::{RelationView, TaskInput, TaskPatch, TaskView};

fn relation_dto(r: RelationView) -> TaskRelationDto {
    TaskRelationDto {
        id: r.relation.id,
        task_id_1: r.relation.task_id_1,
        task_id_2: r.relation.task_id_2,
        connection_id: r.relation.connection_id,
        connection_name: r.connection_name,
    }
}

fn task_dto(v: TaskView) -> TaskDto {
    let t = v.task;
    TaskDto {
        id: t.id,
        name: t.name,
        description: t.description,
        status_id: t.status_id,
        priority_id: t.priority_id,
        stream_id: t.stream_id,
        start_date: format_ts(t.start_date),
        deadline: format_ts(t.deadline),
        assignee_email: v.assignee_email,
        position: t.position,
        relations: v.relations.into_iter().map(relation_dto).collect(),
    }
}

pub async fn list_stream_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(stream_id): Path<i32>,
) -> Result<Json<Vec<TaskDto>>, AppError> {
    let rows = state
        .store
        .list_stream_tasks(auth.user_id, stream_id)
        .await?;
    Ok(Json(rows.into_iter().map(task_dto).collect()))
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(project_id): Path<i32>,
) -> Result<Json<Vec<TaskDto>>, AppError> {
    let rows = state
        .store
        .list_project_tasks(auth.user_id, project_id)
        .await?;
    Ok(Json(rows.into_iter().map(task_dto).collect()))
}

pub async fn list_all_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<TaskFullDto>>, AppError> {
    let rows = state.store.list_all_tasks(auth.user_id).await?;
    let items = rows
        .into_iter()
        .map(|r| TaskFullDto {
            task: task_dto(r.view),
            team_id: r.team_id,
            team_name: r.team_name,
            project_name: r.project_name,
            stream_name: r.stream_name,
        })
        .collect();
    Ok(Json(items))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(stream_id): Path<i32>,
    Json(body): Json<TaskCreateReq>,
) -> Result<(StatusCode, Json<TaskDto>), AppError> {
    let input = TaskInput {
        name: require_name(&body.name)?,
        description: body.description,
        status_id: body.status_id,
        priority_id: body.priority_id,
        assignee_email: body.assignee_email,
        start_date: parse_ts(body.start_date.as_deref())?,
        deadline: parse_ts(body.deadline.as_deref())?,
        position: body.position,
    };
    let view = state
        .store
        .create_task(auth.user_id, stream_id, input)
        .await?;
    tracing::info!(task_id = view.task.id, stream_id, "task created");
    Ok((StatusCode::CREATED, Json(task_dto(view))))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
    Json(body): Json<TaskUpdateReq>,
) -> Result<Json<TaskDto>, AppError> {
    let patch = TaskPatch {
        name: optional_name(body.name)?,
        description: body.description,
        status_id: body.status_id,
        priority_id: body.priority_id,
        assignee_email: body.assignee_email,
        start_date: parse_ts_patch(body.start_date)?,
        deadline: parse_ts_patch(body.deadline)?,
        position: body.position,
    };
    let view = state.store.update_task(auth.user_id, id, patch).await?;
    Ok(Json(task_dto(view)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.store.delete_task(auth.user_id, id).await?;
    tracing::info!(task_id = id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Relates the path task (`task_id_1`) to `body.task_id` (`task_id_2`).
pub async fn create_relation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
    Json(body): Json<TaskRelationCreateReq>,
) -> Result<(StatusCode, Json<TaskRelationDto>), AppError> {
    let relation = state
        .store
        .create_relation(auth.user_id, id, body.task_id, body.connection_id)
        .await?;
    Ok((StatusCode::CREATED, Json(relation_dto(relation))))
}

pub async fn delete_relation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.store.delete_relation(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
