//! Client routes

use super::Payload;
use crate::error::AppResult;
use crate::records::{Client, ClientInput, Mode};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Client>>> {
    Ok(Json(state.clients().list().await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Client>> {
    Ok(Json(state.clients().get(&id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<ClientInput>,
) -> AppResult<(StatusCode, Json<Client>)> {
    let fields = input.validate(Mode::Create)?;
    let client = state.clients().create(fields).await?;
    info!(client_id = %client.id, "client created");
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(input): Payload<ClientInput>,
) -> AppResult<Json<Client>> {
    let fields = input.validate(Mode::Update)?;
    let client = state.clients().update(&id, fields).await?;
    info!(client_id = %client.id, "client updated");
    Ok(Json(client))
}

/// Soft delete: the record stays readable with status 削除済み
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Client>> {
    let repo = state.clients();
    repo.delete(&id).await?;
    info!(client_id = %id, "client marked deleted");
    Ok(Json(repo.get(&id).await?))
}
