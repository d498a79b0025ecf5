//! Receipt data model

use crate::tax::TaxBreakdown;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How the client paid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    #[serde(alias = "銀行振込")]
    BankTransfer,
    #[serde(alias = "現金")]
    Cash,
    #[serde(alias = "クレジットカード")]
    CreditCard,
    #[serde(alias = "その他")]
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::BankTransfer,
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::Other,
    ];

    /// Display text printed on the receipt
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "銀行振込",
            PaymentMethod::Cash => "現金",
            PaymentMethod::CreditCard => "クレジットカード",
            PaymentMethod::Other => "その他",
        }
    }

    /// Stored code ("bank_transfer", ...)
    pub fn code(self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Other => "other",
        }
    }

    /// Accepts either the stored code or the display text
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|method| method.code() == value || method.label() == value)
    }
}

/// Issuer identity printed in the boxed block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    pub name: String,
    pub title: String,
    pub address: String,
}

/// Everything the layout engine needs to draw one receipt
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptData {
    pub number: String,
    pub issue_date: NaiveDate,
    pub recipient_name: String,
    pub recipient_address: Option<String>,
    pub description: String,
    /// Tax-inclusive amount in whole yen
    pub amount: i64,
    /// Percentage, e.g. 10.0
    pub tax_rate: f64,
    pub payment_method: PaymentMethod,
    pub issuer: Issuer,
    pub notes: Option<String>,
}

impl ReceiptData {
    pub fn tax(&self) -> TaxBreakdown {
        TaxBreakdown::from_inclusive(self.amount, self.tax_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_labels() {
        assert_eq!(PaymentMethod::BankTransfer.label(), "銀行振込");
        assert_eq!(PaymentMethod::Cash.label(), "現金");
        assert_eq!(PaymentMethod::CreditCard.label(), "クレジットカード");
        assert_eq!(PaymentMethod::Other.label(), "その他");
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::parse("cash"), Some(PaymentMethod::Cash));
        assert_eq!(
            PaymentMethod::parse(" クレジットカード "),
            Some(PaymentMethod::CreditCard)
        );
        assert_eq!(PaymentMethod::parse("paypal"), None);
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");

        let parsed: PaymentMethod = serde_json::from_str("\"現金\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Cash);
    }
}
