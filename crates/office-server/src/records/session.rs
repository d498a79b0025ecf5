//! Coaching session records

use super::input::{self, given, lenient, Fields, Mode, DATETIME_STORAGE_FORMAT};
use crate::error::ValidationError;
use crate::store::{DeletePolicy, Document, Entity};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    #[serde(rename = "予定")]
    Scheduled,
    #[serde(rename = "完了")]
    Completed,
    #[serde(rename = "キャンセル")]
    Cancelled,
}

impl SessionStatus {
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "予定",
            SessionStatus::Completed => "完了",
            SessionStatus::Cancelled => "キャンセル",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [SessionStatus::Scheduled, SessionStatus::Completed, SessionStatus::Cancelled]
            .into_iter()
            .find(|status| status.label() == value.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(rename = "クライアントID", default, deserialize_with = "lenient::text")]
    pub client_id: String,
    #[serde(rename = "日時")]
    pub scheduled_at: NaiveDateTime,
    /// e.g. トライアル, 継続
    #[serde(rename = "種別", default, deserialize_with = "lenient::text")]
    pub kind: String,
    /// Position within a package
    #[serde(rename = "回数", default)]
    pub number: Option<u32>,
    #[serde(rename = "ステータス", default)]
    pub status: SessionStatus,
    #[serde(rename = "備考", default, deserialize_with = "lenient::text")]
    pub notes: String,
    #[serde(rename = "作成日時")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "更新日時")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Session {
    const COLLECTION: &'static str = "sessions";
    const ORDER_FIELD: &'static str = "日時";
    const DELETE: DeletePolicy = DeletePolicy::Hard;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    #[serde(default, alias = "クライアントID", alias = "client_id")]
    pub client_id: Option<Value>,
    #[serde(default, alias = "日時", alias = "date", alias = "scheduled_at")]
    pub scheduled_at: Option<Value>,
    #[serde(default, alias = "種別", alias = "type")]
    pub kind: Option<Value>,
    #[serde(default, alias = "回数")]
    pub number: Option<Value>,
    #[serde(default, alias = "ステータス")]
    pub status: Option<Value>,
    #[serde(default, alias = "備考")]
    pub notes: Option<Value>,
}

impl SessionInput {
    pub fn validate(&self, mode: Mode) -> Result<Document, Vec<ValidationError>> {
        let mut fields = Fields::new();
        fields.text("クライアントID", self.client_id.as_ref(), true, mode);
        fields.text("種別", self.kind.as_ref(), false, mode);
        fields.text("備考", self.notes.as_ref(), false, mode);

        match given(&self.scheduled_at) {
            Some(value) => match input::datetime("日時", value) {
                Ok(at) => fields.put("日時", at.format(DATETIME_STORAGE_FORMAT).to_string()),
                Err(e) => fields.error(e),
            },
            None if mode == Mode::Create => fields.error(ValidationError::required("日時")),
            None => {}
        }

        match self.number.as_ref() {
            Some(Value::Null) => fields.put("回数", Value::Null),
            Some(value) => {
                fields.parse("回数", Some(value), input::count);
            }
            None => {}
        }

        match given(&self.status) {
            Some(value) => match value.as_str().and_then(SessionStatus::parse) {
                Some(status) => fields.put("ステータス", status.label()),
                None => fields.error(ValidationError::new("ステータス", "不明なステータスです")),
            },
            None if mode == Mode::Create => {
                fields.put("ステータス", SessionStatus::default().label())
            }
            None => {}
        }

        fields.finish()
    }
}
