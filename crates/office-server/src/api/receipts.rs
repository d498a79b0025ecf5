//! Receipt routes, numbering and document output

use super::{ensure_client_exists, Payload};
use crate::error::{AppError, AppResult};
use crate::records::{
    format_receipt_number, issue_year, sequence_name, Mode, ReceiptInput, ReceiptRecord,
    NUMBER_FIELD, NUMBER_SCOPE,
};
use crate::state::AppState;
use crate::store::{Document, Repository, StoreResult};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Local;
use receipt::{content_disposition, document_filename, ReceiptData, ReceiptRenderer, DOCUMENT_TITLE};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<ReceiptRecord>>> {
    Ok(Json(state.receipts().list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReceiptRecord>> {
    Ok(Json(state.receipts().get(&id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<ReceiptInput>,
) -> AppResult<(StatusCode, Json<ReceiptRecord>)> {
    let defaults = state.receipt_defaults();
    let mut fields = input.validate(Mode::Create, &defaults)?;
    ensure_client_exists(&state, &fields).await?;

    let repo = state.receipts();
    let id = Repository::<ReceiptRecord>::new_id();
    let number = match requested_number(&fields) {
        Some(number) => {
            if !repo.claim(NUMBER_SCOPE, &number, &id).await? {
                return Err(number_taken(&number));
            }
            number
        }
        None => allocate_number(&repo, issue_year(&fields, defaults.today), &id).await?,
    };
    fields.insert(NUMBER_FIELD.to_string(), Value::String(number.clone()));

    let record = match repo.create_with_id(&id, fields).await {
        Ok(record) => record,
        Err(err) => {
            release_number(&repo, &number, &id).await;
            return Err(err.into());
        }
    };
    info!(
        receipt_id = %record.id,
        number = %record.number,
        amount = record.amount,
        "receipt issued"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(input): Payload<ReceiptInput>,
) -> AppResult<Json<ReceiptRecord>> {
    let fields = input.validate(Mode::Update, &state.receipt_defaults())?;
    ensure_client_exists(&state, &fields).await?;

    let repo = state.receipts();
    let current = repo.get(&id).await?;
    let renumbered = requested_number(&fields).filter(|number| *number != current.number);
    if let Some(number) = &renumbered {
        if !repo.claim(NUMBER_SCOPE, number, &id).await? {
            return Err(number_taken(number));
        }
    }

    let record = match repo.update(&id, fields).await {
        Ok(record) => record,
        Err(err) => {
            if let Some(number) = &renumbered {
                release_number(&repo, number, &id).await;
            }
            return Err(err.into());
        }
    };
    if renumbered.is_some() {
        release_number(&repo, &current.number, &id).await;
    }
    info!(receipt_id = %record.id, "receipt updated");
    Ok(Json(record))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let repo = state.receipts();
    let record = repo.get(&id).await?;
    repo.delete(&id).await?;
    release_number(&repo, &record.number, &id).await;
    info!(receipt_id = %id, "receipt deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state.receipts().get(&id).await?;
    let renderer = renderer(&state)?;
    let data = record.to_receipt_data();
    let generated_at = Local::now().naive_local();

    let pdf = tokio::task::spawn_blocking(move || renderer.render_pdf(&data, generated_at)).await??;
    info!(receipt_id = %record.id, bytes = pdf.len(), "receipt pdf rendered");

    let filename = document_filename(DOCUMENT_TITLE, &record.number, &record.recipient_name, "pdf");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        pdf,
    ))
}

pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let record = state.receipts().get(&id).await?;
    let preview_url = render_preview(&state, record.to_receipt_data()).await?;
    Ok(Json(json!({ "previewUrl": preview_url })))
}

/// Preview a form that has not been saved yet
pub async fn preview_unsaved(
    State(state): State<AppState>,
    Payload(input): Payload<ReceiptInput>,
) -> AppResult<Json<Value>> {
    let data = input.preview_data(&state.receipt_defaults())?;
    let preview_url = render_preview(&state, data).await?;
    Ok(Json(json!({ "previewUrl": preview_url })))
}

fn renderer(state: &AppState) -> AppResult<Arc<ReceiptRenderer>> {
    state
        .renderer
        .clone()
        .ok_or_else(|| AppError::Render("no font configured (set FONT_REGULAR)".to_string()))
}

async fn render_preview(state: &AppState, data: ReceiptData) -> AppResult<String> {
    let renderer = renderer(state)?;
    let generated_at = Local::now().naive_local();
    let url =
        tokio::task::spawn_blocking(move || renderer.render_preview(&data, generated_at)).await??;
    Ok(url)
}

fn requested_number(fields: &Document) -> Option<String> {
    fields
        .get(NUMBER_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|number| !number.is_empty())
        .map(str::to_string)
}

fn number_taken(number: &str) -> AppError {
    AppError::Conflict(format!("領収書番号 {number} は既に使用されています"))
}

/// Next `R<year>-<nnnn>` that `id` could claim
///
/// Counter values taken by hand-entered numbers are skipped.
async fn allocate_number(
    repo: &Repository<ReceiptRecord>,
    year: i32,
    id: &str,
) -> AppResult<String> {
    let counter = sequence_name(year);
    loop {
        let number = format_receipt_number(year, repo.next_sequence(&counter).await?);
        if repo.claim(NUMBER_SCOPE, &number, id).await? {
            return Ok(number);
        }
    }
}

/// Free a number after the record holding it went away or was renumbered
async fn release_number(repo: &Repository<ReceiptRecord>, number: &str, id: &str) {
    if let Err(err) = repo.release(NUMBER_SCOPE, number, id).await {
        warn!(receipt_id = %id, number, error = %err, "failed to release receipt number");
    }
}

/// Claim the numbers of receipts stored before claims were recorded
///
/// Returns how many numbers were newly held; duplicates already on disk are
/// logged and left alone.
pub async fn claim_existing_numbers(repo: &Repository<ReceiptRecord>) -> StoreResult<usize> {
    let mut claimed = 0;
    for record in repo.list().await? {
        if record.number.trim().is_empty() {
            continue;
        }
        if repo.claim(NUMBER_SCOPE, &record.number, &record.id).await? {
            claimed += 1;
        } else {
            warn!(receipt_id = %record.id, number = %record.number, "duplicate receipt number");
        }
    }
    Ok(claimed)
}
