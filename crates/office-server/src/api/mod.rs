//! HTTP routes
//!
//! `/health` is open; every `/api` route passes the access gate first. Bodies
//! and query strings that fail to parse are reported like any other
//! validation error.

pub mod clients;
pub mod health;
pub mod mail;
pub mod payments;
pub mod receipts;
pub mod sessions;
pub mod settings;

use crate::auth::require_access;
use crate::error::{redact_internal_errors, AppError, AppResult, ValidationError};
use crate::state::AppState;
use crate::store::Document;
use axum::extract::{FromRequest, FromRequestParts};
use axum::routing::{get, post};
use axum::{middleware, Router};
use serde::Deserialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;

/// JSON body whose rejection is an [`AppError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

/// Query string whose rejection is an [`AppError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Filter<T>(pub T);

/// `?client_id=` on list routes
#[derive(Debug, Default, Deserialize)]
pub struct ClientFilter {
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,
}

impl ClientFilter {
    pub fn matches(&self, client_id: &str) -> bool {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|wanted| !wanted.is_empty())
            .map_or(true, |wanted| wanted == client_id)
    }
}

/// Reject a `クライアントID` that names no stored client
pub(crate) async fn ensure_client_exists(state: &AppState, fields: &Document) -> AppResult<()> {
    let Some(client_id) = fields
        .get("クライアントID")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
    else {
        return Ok(());
    };

    match state.clients().get(client_id).await {
        Ok(_) => Ok(()),
        Err(crate::store::StoreError::NotFound { .. }) => Err(AppError::Validation(vec![
            ValidationError::new("クライアントID", "存在しないクライアントです"),
        ])),
        Err(e) => Err(e.into()),
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/settings", get(settings::get_settings))
        .route("/api/clients", get(clients::list).post(clients::create))
        .route(
            "/api/clients/{id}",
            get(clients::get).put(clients::update).delete(clients::delete),
        )
        .route("/api/sessions", get(sessions::list).post(sessions::create))
        .route(
            "/api/sessions/{id}",
            get(sessions::get).put(sessions::update).delete(sessions::delete),
        )
        .route("/api/payments", get(payments::list).post(payments::create))
        .route(
            "/api/payments/{id}",
            get(payments::get).put(payments::update).delete(payments::delete),
        )
        .route("/api/receipts", get(receipts::list).post(receipts::create))
        .route("/api/receipts/preview", post(receipts::preview_unsaved))
        .route(
            "/api/receipts/{id}",
            get(receipts::get).put(receipts::update).delete(receipts::delete),
        )
        .route("/api/receipts/{id}/pdf", get(receipts::download_pdf))
        .route("/api/receipts/{id}/preview", get(receipts::preview))
        .route("/api/mail/compose", post(mail::compose))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(api)
        .layer(middleware::from_fn_with_state(
            state.config.is_development(),
            redact_internal_errors,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
