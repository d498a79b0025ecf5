//! Defaults the forms start from

use crate::records::ClientStatus;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use receipt::PaymentMethod;
use serde_json::{json, Value};

pub async fn get_settings(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    let payment_methods: Vec<Value> = PaymentMethod::ALL
        .into_iter()
        .map(|method| json!({ "code": method.code(), "label": method.label() }))
        .collect();
    let client_statuses: Vec<&str> =
        ClientStatus::ALL.into_iter().map(ClientStatus::label).collect();

    Json(json!({
        "fees": config.fees,
        "taxRate": config.tax_rate,
        "issuer": config.issuer,
        "paymentMethods": payment_methods,
        "clientStatuses": client_statuses,
    }))
}
