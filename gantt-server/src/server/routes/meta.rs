use axum::Json;
use axum::extract::State;
use gantt_shared::api::MetaItemDto;

use crate::server::{AppError, AppState};
use crate::storage::models::MetaItem;

fn to_dtos(items: Vec<MetaItem>) -> Json<Vec<MetaItemDto>> {
    Json(
        items
            .into_iter()
            .map(|m| MetaItemDto {
                id: m.id,
                name: m.name,
            })
            .collect(),
    )
}

pub async fn statuses(State(state): State<AppState>) -> Result<Json<Vec<MetaItemDto>>, AppError> {
    Ok(to_dtos(state.store.list_statuses().await?))
}

pub async fn priorities(
    State(state): State<AppState>,
) -> Result<Json<Vec<MetaItemDto>>, AppError> {
    Ok(to_dtos(state.store.list_priorities().await?))
}

pub async fn connection_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<MetaItemDto>>, AppError> {
    Ok(to_dtos(state.store.list_connection_types().await?))
}
