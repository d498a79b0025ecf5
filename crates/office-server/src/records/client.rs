//! Client records and the client status lifecycle

use super::input::{given, lenient, Fields, Mode};
use crate::error::ValidationError;
use crate::store::{DeletePolicy, Document, Entity, CREATED_AT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ClientStatus {
    #[default]
    Inquiry,
    TrialBooked,
    AfterTrial,
    Ongoing,
    Completed,
    Suspended,
    Deleted,
}

/// Free-text statuses written by earlier versions of the intake form
const LEGACY_STATUSES: &[(&str, ClientStatus)] = &[
    ("トライアル済", ClientStatus::AfterTrial),
    ("トライアル済み", ClientStatus::AfterTrial),
    ("問合せ", ClientStatus::Inquiry),
    ("問い合せ", ClientStatus::Inquiry),
    ("新規", ClientStatus::Inquiry),
    ("トライアル", ClientStatus::TrialBooked),
    ("契約中", ClientStatus::Ongoing),
    ("継続", ClientStatus::Ongoing),
    ("終了", ClientStatus::Completed),
    ("休会", ClientStatus::Suspended),
    ("停止", ClientStatus::Suspended),
    ("削除", ClientStatus::Deleted),
];

impl ClientStatus {
    pub const ALL: [ClientStatus; 7] = [
        ClientStatus::Inquiry,
        ClientStatus::TrialBooked,
        ClientStatus::AfterTrial,
        ClientStatus::Ongoing,
        ClientStatus::Completed,
        ClientStatus::Suspended,
        ClientStatus::Deleted,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ClientStatus::Inquiry => "問い合わせ",
            ClientStatus::TrialBooked => "トライアル予約",
            ClientStatus::AfterTrial => "トライアル後",
            ClientStatus::Ongoing => "継続中",
            ClientStatus::Completed => "完了",
            ClientStatus::Suspended => "休止",
            ClientStatus::Deleted => "削除済み",
        }
    }

    /// Canonical labels and the legacy table
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.label() == value)
            .or_else(|| {
                LEGACY_STATUSES
                    .iter()
                    .find(|(legacy, _)| *legacy == value)
                    .map(|(_, status)| *status)
            })
    }

    /// Read-time normalization; anything unrecognised becomes an inquiry
    pub fn normalize(value: &str) -> Self {
        if value.trim().is_empty() {
            return ClientStatus::Inquiry;
        }
        Self::parse(value).unwrap_or_else(|| {
            warn!(status = value, "unrecognised client status, reading as 問い合わせ");
            ClientStatus::Inquiry
        })
    }
}

impl Serialize for ClientStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ClientStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient::text(deserializer)?;
        Ok(ClientStatus::normalize(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    #[serde(rename = "名前", default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(rename = "ふりがな", default, deserialize_with = "lenient::text")]
    pub furigana: String,
    #[serde(rename = "メールアドレス", default, deserialize_with = "lenient::text")]
    pub email: String,
    #[serde(rename = "電話番号", default, deserialize_with = "lenient::text")]
    pub phone: String,
    #[serde(rename = "住所", default, deserialize_with = "lenient::text")]
    pub address: String,
    #[serde(rename = "希望形式", default, deserialize_with = "lenient::text")]
    pub preferred_format: String,
    #[serde(rename = "備考", default, deserialize_with = "lenient::text")]
    pub notes: String,
    #[serde(rename = "ステータス", default)]
    pub status: ClientStatus,
    #[serde(rename = "作成日時")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "更新日時")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Client {
    const COLLECTION: &'static str = "clients";
    const ORDER_FIELD: &'static str = CREATED_AT;
    const DELETE: DeletePolicy = DeletePolicy::Soft {
        field: "ステータス",
        value: "削除済み",
    };
}

/// Client form payload
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    #[serde(default, alias = "名前")]
    pub name: Option<Value>,
    #[serde(default, alias = "ふりがな")]
    pub furigana: Option<Value>,
    #[serde(default, alias = "メールアドレス")]
    pub email: Option<Value>,
    #[serde(default, alias = "電話番号")]
    pub phone: Option<Value>,
    #[serde(default, alias = "住所")]
    pub address: Option<Value>,
    #[serde(default, alias = "希望形式")]
    pub preferred_format: Option<Value>,
    #[serde(default, alias = "備考")]
    pub notes: Option<Value>,
    #[serde(default, alias = "ステータス")]
    pub status: Option<Value>,
}

impl ClientInput {
    pub fn validate(&self, mode: Mode) -> Result<Document, Vec<ValidationError>> {
        let mut fields = Fields::new();
        fields.text("名前", self.name.as_ref(), true, mode);
        fields.text("ふりがな", self.furigana.as_ref(), false, mode);
        fields.text("電話番号", self.phone.as_ref(), false, mode);
        fields.text("住所", self.address.as_ref(), false, mode);
        fields.text("希望形式", self.preferred_format.as_ref(), false, mode);
        fields.text("備考", self.notes.as_ref(), false, mode);

        fields.text("メールアドレス", self.email.as_ref(), false, mode);
        if let Some(Value::String(email)) = fields.doc.get("メールアドレス") {
            if !email.is_empty() && !looks_like_email(email) {
                fields.error(ValidationError::new(
                    "メールアドレス",
                    "メールアドレスの形式が正しくありません",
                ));
            }
        }

        match given(&self.status) {
            Some(value) => {
                let status = value.as_str().and_then(ClientStatus::parse);
                match status {
                    Some(status) => fields.put("ステータス", status.label()),
                    None => {
                        fields.error(ValidationError::new("ステータス", "不明なステータスです"))
                    }
                }
            }
            None if mode == Mode::Create => fields.put("ステータス", ClientStatus::Inquiry.label()),
            None => {}
        }

        fields.finish()
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !value.contains(' ')
        }
        None => false,
    }
}
