use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use bcrypt::{DEFAULT_COST, hash, verify};
use gantt_shared::api::{
    CheckEmailReq, CheckEmailResp, LoginReq, RegisterReq, TeamDto, TokenResp, UserDto,
};

use crate::server::auth::{self, AuthCtx};
use crate::server::{AppError, AppState};
use crate::storage::models::{Team, User};

fn bearer(access_token: String) -> TokenResp {
    TokenResp {
        access_token,
        token_type: "Bearer".to_string(),
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterReq>,
) -> Result<(StatusCode, Json<TokenResp>), AppError> {
    let email = body.email.trim().to_string();
    let nickname = body.nickname.trim().to_string();
    if email.is_empty() || nickname.is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request(
            "email, nickname and password are required",
        ));
    }
    let password = body.password;
    let password_hash = tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(AppError::internal)?
        .map_err(|e| {
            tracing::error!(error=%e, "register: bcrypt hash failed");
            AppError::internal(e)
        })?;
    let user = state
        .store
        .create_user(&email, &nickname, &password_hash)
        .await?;
    tracing::info!(user_id = user.id, "register: user created");
    let token = auth::issue_token(&state, user.id)?;
    Ok((StatusCode::CREATED, Json(bearer(token))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginReq>,
) -> Result<Json<TokenResp>, AppError> {
    let user = state
        .store
        .find_user_by_email(body.email.trim())
        .await?
        .ok_or_else(|| {
            tracing::warn!(email=%body.email, "login: unknown email");
            AppError::unauthorized()
        })?;
    let password = body.password;
    let stored = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify(password, &stored))
        .await
        .map_err(AppError::internal)?
        .map_err(|e| {
            tracing::error!(user_id = user.id, error=%e, "login: bcrypt verify failed");
            AppError::internal(e)
        })?;
    if !ok {
        tracing::warn!(user_id = user.id, "login: invalid password");
        return Err(AppError::unauthorized());
    }
    let token = auth::issue_token(&state, user.id)?;
    Ok(Json(bearer(token)))
}

pub async fn check_email(
    State(state): State<AppState>,
    Json(body): Json<CheckEmailReq>,
) -> Result<Json<CheckEmailResp>, AppError> {
    let exists = state.store.email_exists(body.email.trim()).await?;
    Ok(Json(CheckEmailResp { exists }))
}

fn user_dto(user: User, teams: Vec<Team>) -> UserDto {
    UserDto {
        id: user.id,
        email: user.email,
        nickname: user.nickname,
        teams: teams
            .into_iter()
            .map(|t| TeamDto {
                id: t.id,
                name: t.name,
            })
            .collect(),
    }
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<UserDto>, AppError> {
    let (user, teams) = state.store.user_with_teams(auth.user_id).await?;
    Ok(Json(user_dto(user, teams)))
}

/// Only the caller's own profile is visible.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<Json<UserDto>, AppError> {
    let user = state.store.get_user_for(auth.user_id, id).await?;
    let (_, teams) = state.store.user_with_teams(user.id).await?;
    Ok(Json(user_dto(user, teams)))
}
