//! Shared handler state

use crate::auth::AccessGate;
use crate::config::Config;
use crate::records::{Client, Payment, ReceiptDefaults, ReceiptRecord, Session};
use crate::store::{DocumentStore, Repository};
use chrono::{Local, NaiveDate};
use receipt::ReceiptRenderer;
use std::sync::Arc;

/// Read-only after startup; cloned into every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: Arc<AccessGate>,
    pub store: Arc<dyn DocumentStore>,
    /// `None` when no font is configured; documents then cannot be rendered
    pub renderer: Option<Arc<ReceiptRenderer>>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        renderer: Option<ReceiptRenderer>,
    ) -> Self {
        let gate = AccessGate::new(&config.allowed_emails, config.is_development());
        Self {
            config: Arc::new(config),
            gate: Arc::new(gate),
            store,
            renderer: renderer.map(Arc::new),
        }
    }

    pub fn clients(&self) -> Repository<Client> {
        Repository::new(self.store.clone())
    }

    pub fn sessions(&self) -> Repository<Session> {
        Repository::new(self.store.clone())
    }

    pub fn payments(&self) -> Repository<Payment> {
        Repository::new(self.store.clone())
    }

    pub fn receipts(&self) -> Repository<ReceiptRecord> {
        Repository::new(self.store.clone())
    }

    /// Local calendar date used for defaults and paid-date stamping
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn receipt_defaults(&self) -> ReceiptDefaults {
        ReceiptDefaults {
            tax_rate: self.config.tax_rate,
            issuer: self.config.issuer.clone(),
            today: self.today(),
        }
    }
}
