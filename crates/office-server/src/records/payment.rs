//! Payment records and the paid-date rule

use super::input::{self, given, lenient, Fields, Mode};
use crate::config::FeeSchedule;
use crate::error::ValidationError;
use crate::store::{DeletePolicy, Document, Entity, CREATED_AT};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "未払い")]
    Unpaid,
    #[serde(rename = "支払済み")]
    Paid,
    #[serde(rename = "キャンセル")]
    Cancelled,
}

impl PaymentStatus {
    pub fn label(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "未払い",
            PaymentStatus::Paid => "支払済み",
            PaymentStatus::Cancelled => "キャンセル",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [PaymentStatus::Unpaid, PaymentStatus::Paid, PaymentStatus::Cancelled]
            .into_iter()
            .find(|status| status.label() == value.trim())
    }
}

/// What a payment is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentCategory {
    #[serde(rename = "トライアル")]
    Trial,
    #[serde(rename = "単発セッション")]
    Single,
    #[serde(rename = "継続パッケージ")]
    Package,
    #[serde(rename = "その他")]
    Other,
}

impl PaymentCategory {
    pub fn label(self) -> &'static str {
        match self {
            PaymentCategory::Trial => "トライアル",
            PaymentCategory::Single => "単発セッション",
            PaymentCategory::Package => "継続パッケージ",
            PaymentCategory::Other => "その他",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            PaymentCategory::Trial,
            PaymentCategory::Single,
            PaymentCategory::Package,
            PaymentCategory::Other,
        ]
        .into_iter()
        .find(|category| category.label() == value.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(rename = "クライアントID", default, deserialize_with = "lenient::text")]
    pub client_id: String,
    #[serde(rename = "項目")]
    pub category: PaymentCategory,
    /// Tax-inclusive yen
    #[serde(rename = "金額", deserialize_with = "lenient::amount")]
    pub amount: i64,
    #[serde(rename = "ステータス", default)]
    pub status: PaymentStatus,
    #[serde(rename = "支払日", default)]
    pub paid_on: Option<NaiveDate>,
    #[serde(rename = "備考", default, deserialize_with = "lenient::text")]
    pub notes: String,
    #[serde(rename = "作成日時")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "更新日時")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Payment {
    const COLLECTION: &'static str = "payments";
    const ORDER_FIELD: &'static str = CREATED_AT;
    const DELETE: DeletePolicy = DeletePolicy::Hard;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    #[serde(default, alias = "クライアントID", alias = "client_id")]
    pub client_id: Option<Value>,
    #[serde(default, alias = "項目", alias = "item")]
    pub category: Option<Value>,
    #[serde(default, alias = "金額")]
    pub amount: Option<Value>,
    #[serde(default, alias = "ステータス")]
    pub status: Option<Value>,
    #[serde(default, alias = "支払日", alias = "paid_on", alias = "paidDate")]
    pub paid_on: Option<Value>,
    #[serde(default, alias = "備考")]
    pub notes: Option<Value>,
}

impl PaymentInput {
    /// Validate against the stored record (`None` on create)
    ///
    /// A missing amount on create takes the configured fee of the category.
    /// The paid-date rule is applied to the resulting record.
    pub fn validate(
        &self,
        mode: Mode,
        existing: Option<&Payment>,
        fees: &FeeSchedule,
        today: NaiveDate,
    ) -> Result<Document, Vec<ValidationError>> {
        let mut fields = Fields::new();
        fields.text("クライアントID", self.client_id.as_ref(), true, mode);
        fields.text("備考", self.notes.as_ref(), false, mode);

        let category = match given(&self.category) {
            Some(value) => match value.as_str().and_then(PaymentCategory::parse) {
                Some(category) => {
                    fields.put("項目", category.label());
                    Some(category)
                }
                None => {
                    fields.error(ValidationError::new("項目", "不明な項目です"));
                    None
                }
            },
            None if mode == Mode::Create => {
                fields.error(ValidationError::required("項目"));
                None
            }
            None => None,
        };

        match given(&self.amount) {
            Some(value) => {
                fields.parse("金額", Some(value), input::validate_amount);
            }
            None if mode == Mode::Create => {
                if let Some(category) = category {
                    match fees.default_for(category) {
                        Some(fee) => fields.put("金額", fee),
                        None => fields.error(ValidationError::required("金額")),
                    }
                }
            }
            None => {}
        }

        let status = match given(&self.status) {
            Some(value) => match value.as_str().and_then(PaymentStatus::parse) {
                Some(status) => {
                    fields.put("ステータス", status.label());
                    Some(status)
                }
                None => {
                    fields.error(ValidationError::new("ステータス", "不明なステータスです"));
                    None
                }
            },
            None if mode == Mode::Create => {
                fields.put("ステータス", PaymentStatus::default().label());
                Some(PaymentStatus::default())
            }
            None => None,
        };

        let paid_on = match self.paid_on.as_ref() {
            Some(Value::Null) => {
                fields.put("支払日", Value::Null);
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                fields.put("支払日", Value::Null);
                None
            }
            Some(value) => match input::date("支払日", value) {
                Ok(date) => {
                    fields.put("支払日", date.to_string());
                    Some(date)
                }
                Err(e) => {
                    fields.error(e);
                    None
                }
            },
            None => existing.and_then(|p| p.paid_on),
        };

        let resulting_status = status.or(existing.map(|p| p.status)).unwrap_or_default();
        // Also covers a date cleared while the payment stays paid
        if resulting_status == PaymentStatus::Paid && paid_on.is_none() {
            fields.put("支払日", today.to_string());
        }

        fields.finish()
    }
}
