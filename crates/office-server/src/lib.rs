//! coachdesk - office backend for a one-person coaching practice
//!
//! Client, session and payment records, receipt issuance with PDF and PNG
//! output, an allow-list access gate in front of the API, and mail text
//! composed from templates.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod records;
pub mod state;
pub mod store;

pub use api::create_router;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
