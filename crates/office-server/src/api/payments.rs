//! Payment routes

use super::{ensure_client_exists, ClientFilter, Filter, Payload};
use crate::error::AppResult;
use crate::records::{Mode, Payment, PaymentInput};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

pub async fn list(
    State(state): State<AppState>,
    Filter(filter): Filter<ClientFilter>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state.payments().list().await?;
    Ok(Json(
        payments
            .into_iter()
            .filter(|payment| filter.matches(&payment.client_id))
            .collect(),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Payment>> {
    Ok(Json(state.payments().get(&id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<PaymentInput>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let fields = input.validate(Mode::Create, None, &state.config.fees, state.today())?;
    ensure_client_exists(&state, &fields).await?;
    let payment = state.payments().create(fields).await?;
    info!(
        payment_id = %payment.id,
        amount = payment.amount,
        status = payment.status.label(),
        "payment created"
    );
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(input): Payload<PaymentInput>,
) -> AppResult<Json<Payment>> {
    let repo = state.payments();
    let existing = repo.get(&id).await?;
    let fields = input.validate(Mode::Update, Some(&existing), &state.config.fees, state.today())?;
    ensure_client_exists(&state, &fields).await?;
    let payment = repo.update(&id, fields).await?;
    info!(payment_id = %payment.id, status = payment.status.label(), "payment updated");
    Ok(Json(payment))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.payments().delete(&id).await?;
    info!(payment_id = %id, "payment deleted");
    Ok(StatusCode::NO_CONTENT)
}
