use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gantt_shared::api::{MemberDto, TeamCreateReq, TeamDto, TeamUpdateReq};

use super::{optional_name, require_name};
use crate::server::auth::AuthCtx;
use crate::server::{AppError, AppState};
use crate::storage::TeamPatch;

pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<TeamCreateReq>,
) -> Result<(StatusCode, Json<TeamDto>), AppError> {
    let name = require_name(&body.name)?;
    let team = state.store.create_team(auth.user_id, &name).await?;
    tracing::info!(team_id = team.id, "team created");
    Ok((
        StatusCode::CREATED,
        Json(TeamDto {
            id: team.id,
            name: team.name,
        }),
    ))
}

pub async fn team_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<MemberDto>>, AppError> {
    let rows = state.store.team_members(auth.user_id, id).await?;
    let items = rows
        .into_iter()
        .map(|(u, role)| MemberDto {
            id: u.id,
            email: u.email,
            nickname: u.nickname,
            role,
        })
        .collect();
    Ok(Json(items))
}

pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
    Json(body): Json<TeamUpdateReq>,
) -> Result<Json<TeamDto>, AppError> {
    let patch = TeamPatch {
        name: optional_name(body.name)?,
        new_users: body.new_users.unwrap_or_default(),
        new_users_role: body.new_users_role,
        delete_users: body.delete_users.unwrap_or_default(),
    };
    let team = state.store.update_team(auth.user_id, id, patch).await?;
    Ok(Json(TeamDto {
        id: team.id,
        name: team.name,
    }))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.store.delete_team(auth.user_id, id).await?;
    tracing::info!(team_id = id, "team deleted");
    Ok(StatusCode::NO_CONTENT)
}
