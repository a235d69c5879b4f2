use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gantt_shared::api::{ReminderCreateReq, ReminderDto, ReminderUpdateReq};

use crate::server::auth::AuthCtx;
use crate::server::timestamp;
use crate::server::{AppError, AppState};
use crate::storage::models::TaskReminder;

fn reminder_dto(r: TaskReminder) -> ReminderDto {
    ReminderDto {
        id: r.id,
        task_id: r.task_id,
        user_id: r.user_id,
        remind_at: timestamp::format(r.remind_at),
        sent: r.sent,
    }
}

pub async fn list_task_reminders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(task_id): Path<i32>,
) -> Result<Json<Vec<ReminderDto>>, AppError> {
    let rows = state
        .store
        .list_task_reminders(auth.user_id, task_id)
        .await?;
    Ok(Json(rows.into_iter().map(reminder_dto).collect()))
}

pub async fn list_my_reminders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<ReminderDto>>, AppError> {
    let rows = state.store.list_user_reminders(auth.user_id).await?;
    Ok(Json(rows.into_iter().map(reminder_dto).collect()))
}

/// Persists the reminder, then arms its job. A row whose job cannot be armed
/// is removed again.
pub async fn create_reminder(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(task_id): Path<i32>,
    Json(body): Json<ReminderCreateReq>,
) -> Result<(StatusCode, Json<ReminderDto>), AppError> {
    let remind_at = timestamp::parse(&body.remind_at).map_err(AppError::bad_request)?;
    let reminder = state
        .store
        .create_reminder(auth.user_id, task_id, remind_at)
        .await?;
    if let Err(e) = state.scheduler.schedule(reminder.id, reminder.remind_at) {
        tracing::error!(reminder_id = reminder.id, error = %e, "reminder: scheduling failed; discarding row");
        if let Err(de) = state.store.discard_reminder(reminder.id).await {
            tracing::error!(reminder_id = reminder.id, error = %de, "reminder: discard failed");
        }
        return Err(e.into());
    }
    tracing::info!(reminder_id = reminder.id, task_id, remind_at = %reminder.remind_at, "reminder created");
    Ok((StatusCode::CREATED, Json(reminder_dto(reminder))))
}

pub async fn update_reminder(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
    Json(body): Json<ReminderUpdateReq>,
) -> Result<Json<ReminderDto>, AppError> {
    let remind_at = match body.remind_at.as_deref() {
        Some(s) => Some(timestamp::parse(s).map_err(AppError::bad_request)?),
        None => None,
    };
    let reminder = state
        .store
        .update_reminder(auth.user_id, id, remind_at)
        .await?;
    if remind_at.is_some() {
        state.scheduler.schedule(reminder.id, reminder.remind_at)?;
        tracing::info!(reminder_id = id, remind_at = %reminder.remind_at, "reminder rescheduled");
    }
    Ok(Json(reminder_dto(reminder)))
}

pub async fn delete_reminder(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    // The row stays when its job can no longer be cancelled.
    state.scheduler.ensure_running()?;
    state.store.delete_reminder(auth.user_id, id).await?;
    state.scheduler.cancel(id)?;
    tracing::info!(reminder_id = id, "reminder deleted");
    Ok(StatusCode::NO_CONTENT)
}
