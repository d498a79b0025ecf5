//! Typed records of the practice and their form payloads
//!
//! Stored documents use Japanese key names; every entity is read through serde
//! with lenient coercions so rows written by older versions still load.

pub mod input;

mod client;
mod payment;
mod receipt;
mod session;

pub use client::{Client, ClientInput, ClientStatus};
pub use input::Mode;
pub use payment::{Payment, PaymentCategory, PaymentInput, PaymentStatus};
// `self::` keeps this apart from the receipt crate
pub use self::receipt::{
    format_receipt_number, issue_year, sequence_name, ReceiptDefaults, ReceiptInput, ReceiptRecord,
    ISSUE_DATE_FIELD, NUMBER_FIELD, NUMBER_SCOPE,
};
pub use session::{Session, SessionInput, SessionStatus};
