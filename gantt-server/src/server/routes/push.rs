use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gantt_shared::api::{PushSubscribeReq, PushSubscriptionDto, VapidKeyDto};

use crate::server::auth::AuthCtx;
use crate::server::{AppError, AppState};
use crate::storage::models::PushSubscription;

fn subscription_dto(s: PushSubscription) -> PushSubscriptionDto {
    PushSubscriptionDto {
        id: s.id,
        user_id: s.user_id,
        endpoint: s.endpoint,
        p256dh: s.p256dh,
        auth: s.auth,
    }
}

pub async fn vapid_public_key(
    State(state): State<AppState>,
) -> Result<Json<VapidKeyDto>, AppError> {
    let key = state
        .config
        .vapid_public_key()
        .ok_or_else(|| AppError::not_found("push notifications are not configured"))?;
    Ok(Json(VapidKeyDto {
        public_key: key.to_string(),
    }))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<PushSubscribeReq>,
) -> Result<(StatusCode, Json<PushSubscriptionDto>), AppError> {
    if body.endpoint.trim().is_empty() || body.p256dh.is_empty() || body.auth.is_empty() {
        return Err(AppError::bad_request(
            "endpoint, p256dh and auth are required",
        ));
    }
    let sub = state
        .store
        .add_push_subscription(auth.user_id, body.endpoint.trim(), &body.p256dh, &body.auth)
        .await?;
    tracing::info!(subscription_id = sub.id, "push: subscription added");
    Ok((StatusCode::CREATED, Json(subscription_dto(sub))))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<PushSubscriptionDto>>, AppError> {
    let rows = state.store.list_push_subscriptions(auth.user_id).await?;
    Ok(Json(rows.into_iter().map(subscription_dto).collect()))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .remove_push_subscription(auth.user_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
