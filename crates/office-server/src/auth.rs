//! Access gate
//!
//! The fronting OAuth proxy authenticates the user and forwards the e-mail in a
//! header. The gate only decides whether that identity may use the API.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Identity recorded for requests allowed by development mode
pub const DEV_IDENTITY: &str = "dev@localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    allowed: HashSet<String>,
    development: bool,
}

impl AccessGate {
    pub fn new<I, S>(allowed: I, development: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed.into_iter().map(|email| normalize(email.as_ref())).collect(),
            development,
        }
    }

    /// Deny unless development mode or the identity is on the allow-list
    pub fn check(&self, email: Option<&str>) -> Decision {
        if self.development {
            return Decision::Allow;
        }
        match email.map(normalize) {
            Some(email) if !email.is_empty() && self.allowed.contains(&email) => Decision::Allow,
            _ => Decision::Deny,
        }
    }

    pub fn is_development(&self) -> bool {
        self.development
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The caller passed the access gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub email: String,
}

impl FromRequestParts<AppState> for Authorized {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(authorized) = parts.extensions.get::<Authorized>() {
            return Ok(authorized.clone());
        }

        let email = parts
            .headers
            .get(state.config.auth_email_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match state.gate.check(email) {
            Decision::Allow => {
                let authorized = Authorized {
                    email: email.map(normalize).unwrap_or_else(|| DEV_IDENTITY.to_string()),
                };
                debug!(email = %authorized.email, "access allowed");
                parts.extensions.insert(authorized.clone());
                Ok(authorized)
            }
            Decision::Deny => {
                warn!(email = email.unwrap_or("<none>"), uri = %parts.uri, "access denied");
                match email {
                    None => Err(AppError::Unauthorized),
                    Some(_) => Err(AppError::Forbidden),
                }
            }
        }
    }
}

/// Gate every route of the router it is layered on
pub async fn require_access(_authorized: Authorized, request: Request, next: Next) -> Response {
    next.run(request).await
}
