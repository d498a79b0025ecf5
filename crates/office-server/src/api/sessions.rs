//! Session routes

use super::{ensure_client_exists, ClientFilter, Filter, Payload};
use crate::error::AppResult;
use crate::records::{Mode, Session, SessionInput};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

pub async fn list(
    State(state): State<AppState>,
    Filter(filter): Filter<ClientFilter>,
) -> AppResult<Json<Vec<Session>>> {
    let sessions = state.sessions().list().await?;
    Ok(Json(
        sessions
            .into_iter()
            .filter(|session| filter.matches(&session.client_id))
            .collect(),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Session>> {
    Ok(Json(state.sessions().get(&id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<SessionInput>,
) -> AppResult<(StatusCode, Json<Session>)> {
    let fields = input.validate(Mode::Create)?;
    ensure_client_exists(&state, &fields).await?;
    let session = state.sessions().create(fields).await?;
    info!(session_id = %session.id, client_id = %session.client_id, "session created");
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(input): Payload<SessionInput>,
) -> AppResult<Json<Session>> {
    let fields = input.validate(Mode::Update)?;
    ensure_client_exists(&state, &fields).await?;
    let session = state.sessions().update(&id, fields).await?;
    info!(session_id = %session.id, "session updated");
    Ok(Json(session))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.sessions().delete(&id).await?;
    info!(session_id = %id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}
