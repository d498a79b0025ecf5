//! Handler errors and their JSON representation
//!
//! Every failure leaves a handler as `{ "error": <summary>, "details": … }` with
//! a status derived from the variant. Internal failures are marked so the
//! production redaction layer can drop their details.

use crate::store::StoreError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// A single field-level input failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "必須項目です")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<ValidationError>),

    #[error("authentication required")]
    Unauthorized,

    #[error("access denied")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for handlers
pub type AppResult<T> = Result<T, AppError>;

/// Marks a response whose details must not leave the process in production
#[derive(Debug, Clone, Copy)]
struct InternalDetails;

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![ValidationError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::BAD_GATEWAY,
            AppError::Render(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "入力内容に誤りがあります",
            AppError::Unauthorized => "認証が必要です",
            AppError::Forbidden => "アクセスが許可されていません",
            AppError::NotFound(_) => "見つかりません",
            AppError::Conflict(_) => "既に存在します",
            AppError::Store(_) => "データストアでエラーが発生しました",
            AppError::Render(_) => "書類の生成に失敗しました",
            AppError::Internal(_) => "内部エラーが発生しました",
        }
    }

    fn details(&self) -> Value {
        match self {
            AppError::Validation(errors) => {
                let fields: Map<String, Value> = errors
                    .iter()
                    .map(|e| (e.field.clone(), Value::String(e.message.clone())))
                    .collect();
                json!({ "fields": fields })
            }
            AppError::Unauthorized | AppError::Forbidden => Value::Null,
            AppError::NotFound(what) => Value::String(format!("{what} not found")),
            AppError::Conflict(message)
            | AppError::Store(message)
            | AppError::Render(message)
            | AppError::Internal(message) => Value::String(message.clone()),
        }
    }
}

impl From<Vec<ValidationError>> for AppError {
    fn from(errors: Vec<ValidationError>) -> Self {
        AppError::Validation(errors)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                AppError::NotFound(format!("{collection}/{id}"))
            }
            other => AppError::Store(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text())
    }
}

impl From<receipt::ReceiptError> for AppError {
    fn from(err: receipt::ReceiptError) -> Self {
        AppError::Render(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": self.summary(),
            "details": self.details(),
        });

        let mut response = (status, Json(body)).into_response();
        if matches!(self, AppError::Render(_) | AppError::Internal(_)) {
            response.extensions_mut().insert(InternalDetails);
        }
        response
    }
}

/// Strip details from internal errors unless running in development mode
pub async fn redact_internal_errors(
    State(development): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if development || response.extensions().get::<InternalDetails>().is_none() {
        return response;
    }

    let status = response.status();
    let summary = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "内部エラーが発生しました"
    } else {
        "エラーが発生しました"
    };
    (status, Json(json!({ "error": summary, "details": Value::Null }))).into_response()
}
