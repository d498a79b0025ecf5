//! Receipt records

use super::input::{self, given, lenient, Fields, Mode};
use crate::error::ValidationError;
use crate::store::{DeletePolicy, Document, Entity, CREATED_AT, ID, UPDATED_AT};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use receipt::{Issuer, PaymentMethod, ReceiptData, TaxBreakdown};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NUMBER_FIELD: &str = "領収書番号";
pub const ISSUE_DATE_FIELD: &str = "発行日";
/// Claim scope keeping receipt numbers unique
pub const NUMBER_SCOPE: &str = "receipt-number";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: String,
    #[serde(rename = "領収書番号", default, deserialize_with = "lenient::text")]
    pub number: String,
    #[serde(rename = "発行日")]
    pub issue_date: NaiveDate,
    #[serde(rename = "宛名", default, deserialize_with = "lenient::text")]
    pub recipient_name: String,
    #[serde(rename = "宛名住所", default, deserialize_with = "lenient::text")]
    pub recipient_address: String,
    #[serde(rename = "メールアドレス", default, deserialize_with = "lenient::text")]
    pub recipient_email: String,
    #[serde(rename = "但し書き", default, deserialize_with = "lenient::text")]
    pub description: String,
    /// Tax-inclusive yen
    #[serde(rename = "金額", deserialize_with = "lenient::amount")]
    pub amount: i64,
    #[serde(rename = "税率", deserialize_with = "lenient::rate")]
    pub tax_rate: f64,
    #[serde(rename = "支払方法", default)]
    pub payment_method: PaymentMethod,
    #[serde(rename = "発行者名", default, deserialize_with = "lenient::text")]
    pub issuer_name: String,
    #[serde(rename = "発行者肩書", default, deserialize_with = "lenient::text")]
    pub issuer_title: String,
    #[serde(rename = "発行者住所", default, deserialize_with = "lenient::text")]
    pub issuer_address: String,
    #[serde(rename = "備考", default, deserialize_with = "lenient::text")]
    pub notes: String,
    #[serde(
        rename = "クライアントID",
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_id: Option<String>,
    #[serde(rename = "作成日時")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "更新日時")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for ReceiptRecord {
    const COLLECTION: &'static str = "receipts";
    const ORDER_FIELD: &'static str = ISSUE_DATE_FIELD;
    const DELETE: DeletePolicy = DeletePolicy::Hard;
}

impl ReceiptRecord {
    pub fn tax(&self) -> TaxBreakdown {
        TaxBreakdown::from_inclusive(self.amount, self.tax_rate)
    }

    /// Values the layout engine draws
    pub fn to_receipt_data(&self) -> ReceiptData {
        let optional = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        ReceiptData {
            number: self.number.clone(),
            issue_date: self.issue_date,
            recipient_name: self.recipient_name.clone(),
            recipient_address: optional(&self.recipient_address),
            description: self.description.clone(),
            amount: self.amount,
            tax_rate: self.tax_rate,
            payment_method: self.payment_method,
            issuer: Issuer {
                name: self.issuer_name.clone(),
                title: self.issuer_title.clone(),
                address: self.issuer_address.clone(),
            },
            notes: optional(&self.notes),
        }
    }
}

/// `R<year>-<0001>`
pub fn format_receipt_number(year: i32, sequence: u64) -> String {
    format!("R{year}-{sequence:04}")
}

/// Counter the numbers of one issue year are drawn from
pub fn sequence_name(year: i32) -> String {
    format!("receipt-{year}")
}

/// Values filled in when a receipt payload leaves them out
#[derive(Debug, Clone)]
pub struct ReceiptDefaults {
    pub tax_rate: f64,
    pub issuer: Issuer,
    pub today: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInput {
    #[serde(default, alias = "領収書番号", alias = "receiptNumber")]
    pub number: Option<Value>,
    #[serde(default, alias = "発行日")]
    pub issue_date: Option<Value>,
    #[serde(default, alias = "宛名")]
    pub recipient_name: Option<Value>,
    #[serde(default, alias = "宛名住所")]
    pub recipient_address: Option<Value>,
    #[serde(default, alias = "メールアドレス")]
    pub recipient_email: Option<Value>,
    #[serde(default, alias = "但し書き")]
    pub description: Option<Value>,
    #[serde(default, alias = "金額")]
    pub amount: Option<Value>,
    #[serde(default, alias = "税率")]
    pub tax_rate: Option<Value>,
    #[serde(default, alias = "支払方法")]
    pub payment_method: Option<Value>,
    #[serde(default, alias = "発行者名")]
    pub issuer_name: Option<Value>,
    #[serde(default, alias = "発行者肩書")]
    pub issuer_title: Option<Value>,
    #[serde(default, alias = "発行者住所")]
    pub issuer_address: Option<Value>,
    #[serde(default, alias = "備考")]
    pub notes: Option<Value>,
    #[serde(default, alias = "クライアントID")]
    pub client_id: Option<Value>,
}

impl ReceiptInput {
    /// Typed fields ready to persist
    ///
    /// On create, absent issue date, tax rate, payment method and issuer
    /// fields take their defaults. The number is left out when empty so the
    /// caller can allocate one.
    pub fn validate(
        &self,
        mode: Mode,
        defaults: &ReceiptDefaults,
    ) -> Result<Document, Vec<ValidationError>> {
        let mut fields = Fields::new();
        let creating = mode == Mode::Create;

        if let Some(value) = given(&self.number) {
            match input::text(NUMBER_FIELD, value) {
                Ok(number) if number.is_empty() && !creating => {
                    fields.error(ValidationError::required(NUMBER_FIELD))
                }
                Ok(number) if number.is_empty() => {}
                Ok(number) => fields.put(NUMBER_FIELD, number),
                Err(e) => fields.error(e),
            }
        }

        match given(&self.issue_date) {
            Some(value) => match input::date(ISSUE_DATE_FIELD, value) {
                Ok(date) => fields.put(ISSUE_DATE_FIELD, date.to_string()),
                Err(e) => fields.error(e),
            },
            None if creating => fields.put(ISSUE_DATE_FIELD, defaults.today.to_string()),
            None => {}
        }

        fields.text("宛名", self.recipient_name.as_ref(), true, mode);
        fields.text("宛名住所", self.recipient_address.as_ref(), false, mode);
        fields.text("メールアドレス", self.recipient_email.as_ref(), false, mode);
        fields.text("但し書き", self.description.as_ref(), true, mode);
        fields.text("備考", self.notes.as_ref(), false, mode);
        fields.text("クライアントID", self.client_id.as_ref(), false, mode);

        match given(&self.amount) {
            Some(value) => {
                fields.parse("金額", Some(value), input::validate_amount);
            }
            None if creating => fields.error(ValidationError::required("金額")),
            None => {}
        }

        match given(&self.tax_rate) {
            Some(value) => {
                fields.parse("税率", Some(value), input::validate_tax_rate);
            }
            None if creating => fields.put("税率", defaults.tax_rate),
            None => {}
        }

        match given(&self.payment_method) {
            Some(value) => match value.as_str().and_then(PaymentMethod::parse) {
                Some(method) => fields.put("支払方法", method.code()),
                None => fields.error(ValidationError::new("支払方法", "不明な支払方法です")),
            },
            None if creating => fields.put("支払方法", PaymentMethod::default().code()),
            None => {}
        }

        for (key, value, default) in [
            ("発行者名", &self.issuer_name, &defaults.issuer.name),
            ("発行者肩書", &self.issuer_title, &defaults.issuer.title),
            ("発行者住所", &self.issuer_address, &defaults.issuer.address),
        ] {
            fields.text(key, value.as_ref(), false, mode);
            let blank = fields.doc.get(key).and_then(Value::as_str).map_or(true, str::is_empty);
            if creating && blank {
                fields.put(key, default.clone());
            }
        }

        fields.finish()
    }

    /// Draw an unsaved payload; the number stays as given, possibly empty
    pub fn preview_data(
        &self,
        defaults: &ReceiptDefaults,
    ) -> Result<ReceiptData, Vec<ValidationError>> {
        let mut doc = self.validate(Mode::Create, defaults)?;
        let now = Utc::now().to_rfc3339();
        doc.insert(ID.to_string(), Value::String("preview".to_string()));
        doc.insert(CREATED_AT.to_string(), Value::String(now.clone()));
        doc.insert(UPDATED_AT.to_string(), Value::String(now));

        serde_json::from_value::<ReceiptRecord>(Value::Object(doc))
            .map(|record| record.to_receipt_data())
            .map_err(|e| vec![ValidationError::new("payload", e.to_string())])
    }
}

/// Issue year of a validated receipt document
pub fn issue_year(doc: &Document, fallback: NaiveDate) -> i32 {
    doc.get(ISSUE_DATE_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or(fallback)
        .year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn defaults() -> ReceiptDefaults {
        ReceiptDefaults {
            tax_rate: 10.0,
            issuer: Issuer {
                name: "佐藤 一郎".into(),
                title: "ライフコーチ".into(),
                address: "東京都港区4-5-6".into(),
            },
            today: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        }
    }

    fn input(value: Value) -> ReceiptInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_receipt_numbers() {
        assert_eq!(format_receipt_number(2025, 1), "R2025-0001");
        assert_eq!(format_receipt_number(2025, 123), "R2025-0123");
        assert_eq!(format_receipt_number(2026, 12345), "R2026-12345");
        assert_eq!(sequence_name(2025), "receipt-2025");
    }

    #[test]
    fn test_create_fills_defaults() {
        let doc = input(json!({
            "recipientName": "山田 花子",
            "description": "コーチング継続パッケージ",
            "amount": "220,000",
        }))
        .validate(Mode::Create, &defaults())
        .unwrap();

        assert_eq!(doc["発行日"], json!("2025-04-01"));
        assert_eq!(doc["金額"], json!(220000));
        assert_eq!(doc["税率"], json!(10.0));
        assert_eq!(doc["支払方法"], json!("bank_transfer"));
        assert_eq!(doc["発行者名"], json!("佐藤 一郎"));
        assert_eq!(doc["発行者肩書"], json!("ライフコーチ"));
        assert!(!doc.contains_key(NUMBER_FIELD));
    }

    #[test]
    fn test_create_keeps_caller_values() {
        let doc = input(json!({
            "領収書番号": "A-77",
            "発行日": "2025/06/30",
            "宛名": "鈴木 太郎",
            "但し書き": "トライアル",
            "金額": 6000,
            "税率": "8%",
            "支払方法": "現金",
            "発行者名": "別名義",
        }))
        .validate(Mode::Create, &defaults())
        .unwrap();

        assert_eq!(doc[NUMBER_FIELD], json!("A-77"));
        assert_eq!(doc["発行日"], json!("2025-06-30"));
        assert_eq!(doc["税率"], json!(8.0));
        assert_eq!(doc["支払方法"], json!("cash"));
        assert_eq!(doc["発行者名"], json!("別名義"));
        assert_eq!(issue_year(&doc, defaults().today), 2025);
    }

    #[test]
    fn test_non_numeric_amount_and_rate_fail() {
        let errors = input(json!({
            "宛名": "鈴木 太郎",
            "但し書き": "トライアル",
            "金額": "六千",
            "税率": "ten",
        }))
        .validate(Mode::Create, &defaults())
        .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["金額", "税率"]);
    }

    #[test]
    fn test_update_only_present_fields() {
        let doc = input(json!({ "notes": "再発行" }))
            .validate(Mode::Update, &defaults())
            .unwrap();
        assert_eq!(Value::Object(doc), json!({ "備考": "再発行" }));
    }

    #[test]
    fn test_preview_data() {
        let data = input(json!({
            "宛名": "山田 花子",
            "但し書き": "コーチング継続パッケージ",
            "金額": 220000,
        }))
        .preview_data(&defaults())
        .unwrap();

        assert_eq!(data.number, "");
        assert_eq!(data.tax().tax_amount, 20_000);
        assert_eq!(data.issuer.title, "ライフコーチ");
        assert_eq!(data.recipient_address, None);
    }

    #[test]
    fn test_record_to_receipt_data() {
        let record: ReceiptRecord = serde_json::from_value(json!({
            "id": "r1",
            "領収書番号": "R2025-0001",
            "発行日": "2025-04-01",
            "宛名": "山田 花子",
            "宛名住所": "",
            "但し書き": "コーチング",
            "金額": "6,000",
            "税率": 10,
            "支払方法": "銀行振込",
            "備考": " ",
            "作成日時": "2025-04-01T00:00:00Z",
            "更新日時": "2025-04-01T00:00:00Z",
        }))
        .unwrap();

        let data = record.to_receipt_data();
        assert_eq!(data.amount, 6000);
        assert_eq!(data.payment_method, PaymentMethod::BankTransfer);
        assert_eq!(data.recipient_address, None);
        assert_eq!(data.notes, None);
        assert_eq!(record.tax().exclusive_amount, 5455);
        assert_eq!(record.client_id, None);
    }
}
