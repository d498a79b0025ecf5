//! Mail composition route

use super::Payload;
use crate::error::{AppError, AppResult};
use crate::mail::{compose as compose_mail, MailContext, MailTemplate, UnknownTemplate};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeRequest {
    pub template: String,
    #[serde(alias = "client_id")]
    pub client_id: String,
    #[serde(default, alias = "session_id")]
    pub session_id: Option<String>,
    #[serde(default, alias = "payment_id")]
    pub payment_id: Option<String>,
}

pub async fn compose(
    State(state): State<AppState>,
    Payload(request): Payload<ComposeRequest>,
) -> AppResult<Json<Value>> {
    let template: MailTemplate = request
        .template
        .parse()
        .map_err(|e: UnknownTemplate| AppError::validation("template", e.to_string()))?;

    let client = state.clients().get(&request.client_id).await?;
    let session = match request.session_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => Some(state.sessions().get(id).await?),
        None => None,
    };
    let payment = match request.payment_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => Some(state.payments().get(id).await?),
        None => None,
    };

    let context = MailContext::from_records(
        &client,
        session.as_ref(),
        payment.as_ref(),
        &state.config.issuer,
    );
    let mail = compose_mail(template, &context);
    debug!(template = %template, client_id = %client.id, "mail composed");

    Ok(Json(json!({
        "subject": mail.subject,
        "body": mail.body,
        "mailto": mail.mailto_url(&client.email),
    })))
}
