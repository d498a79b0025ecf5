//! Mail text composed from templates
//!
//! Composition is pure: a template and the records it mentions go in, a subject
//! and body come out. Sending is left to the user's own mail client through a
//! `mailto:` link.

use crate::records::{Client, Payment, Session};
use receipt::Issuer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name used when a client record has none
pub const NAME_FALLBACK: &str = "クライアント";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MailTemplate {
    InquiryReply,
    TrialConfirmation,
    SessionReminder,
    PaymentRequest,
    ReceiptNotice,
}

impl MailTemplate {
    pub const ALL: [MailTemplate; 5] = [
        MailTemplate::InquiryReply,
        MailTemplate::TrialConfirmation,
        MailTemplate::SessionReminder,
        MailTemplate::PaymentRequest,
        MailTemplate::ReceiptNotice,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MailTemplate::InquiryReply => "inquiry-reply",
            MailTemplate::TrialConfirmation => "trial-confirmation",
            MailTemplate::SessionReminder => "session-reminder",
            MailTemplate::PaymentRequest => "payment-request",
            MailTemplate::ReceiptNotice => "receipt-notice",
        }
    }

    fn subject(self) -> &'static str {
        match self {
            MailTemplate::InquiryReply => "お問い合わせありがとうございます",
            MailTemplate::TrialConfirmation => "トライアルセッションのご予約確認",
            MailTemplate::SessionReminder => "{{session_date}} セッションのご案内",
            MailTemplate::PaymentRequest => "お支払いのお願い",
            MailTemplate::ReceiptNotice => "領収書送付のお知らせ",
        }
    }

    fn body(self) -> &'static str {
        match self {
            MailTemplate::InquiryReply => {
                "{{name}} 様\n\n\
                 このたびはお問い合わせいただき、ありがとうございます。\n\
                 ご希望の形式（{{format}}）でのトライアルセッションをご案内いたします。\n\
                 ご都合のよい日時を2〜3候補お知らせください。\n\n\
                 {{issuer}}"
            }
            MailTemplate::TrialConfirmation => {
                "{{name}} 様\n\n\
                 トライアルセッションのご予約を承りました。\n\n\
                 日時：{{session_date}}\n\
                 形式：{{format}}\n\n\
                 当日お会いできることを楽しみにしております。\n\n\
                 {{issuer}}"
            }
            MailTemplate::SessionReminder => {
                "{{name}} 様\n\n\
                 第{{session_number}}回のセッションは {{session_date}} です。\n\
                 当日までに振り返りたいテーマがあれば、お気軽にお知らせください。\n\n\
                 {{issuer}}"
            }
            MailTemplate::PaymentRequest => {
                "{{name}} 様\n\n\
                 セッション費用のお支払いをお願いいたします。\n\n\
                 ご請求金額：{{amount}}（税込）\n\n\
                 お振込先は別途ご案内のとおりです。\n\n\
                 {{issuer}}"
            }
            MailTemplate::ReceiptNotice => {
                "{{name}} 様\n\n\
                 {{amount}}のお支払いを確認いたしました。ありがとうございます。\n\
                 領収書を添付いたしますのでご査収ください。\n\n\
                 送付先：{{address}}\n\n\
                 {{issuer}}"
            }
        }
    }
}

impl fmt::Display for MailTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTemplate(pub String);

impl fmt::Display for UnknownTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mail template {:?}", self.0)
    }
}

impl std::error::Error for UnknownTemplate {}

impl FromStr for MailTemplate {
    type Err = UnknownTemplate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|template| template.name() == s.trim())
            .ok_or_else(|| UnknownTemplate(s.to_string()))
    }
}

/// Values a template may mention; missing ones render as empty text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailContext {
    pub name: Option<String>,
    pub furigana: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub format: Option<String>,
    pub session_date: Option<String>,
    pub session_number: Option<String>,
    pub amount: Option<String>,
    pub issuer: Option<String>,
}

fn present(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl MailContext {
    pub fn from_records(
        client: &Client,
        session: Option<&Session>,
        payment: Option<&Payment>,
        issuer: &Issuer,
    ) -> Self {
        Self {
            name: present(&client.name),
            furigana: present(&client.furigana),
            email: present(&client.email),
            address: present(&client.address),
            format: present(&client.preferred_format),
            session_date: session.map(|s| {
                format!(
                    "{} {}",
                    ja_text::format_date_with_weekday(s.scheduled_at.date()),
                    s.scheduled_at.format("%H:%M")
                )
            }),
            session_number: session.and_then(|s| s.number).map(|n| n.to_string()),
            amount: payment.map(|p| ja_text::format_yen(p.amount)),
            issuer: present(&issuer.name),
        }
    }

    fn value(&self, placeholder: &str) -> Option<&str> {
        let value = match placeholder {
            "name" => return Some(self.name.as_deref().unwrap_or(NAME_FALLBACK)),
            "furigana" => &self.furigana,
            "email" => &self.email,
            "address" => &self.address,
            "format" => &self.format,
            "session_date" => &self.session_date,
            "session_number" => &self.session_number,
            "amount" => &self.amount,
            "issuer" => &self.issuer,
            _ => return None,
        };
        Some(value.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedMail {
    pub subject: String,
    pub body: String,
}

impl ComposedMail {
    /// `mailto:` link with percent-encoded address, subject and body
    ///
    /// The `@` separators stay literal; everything else in the address that
    /// could end the path or start a header (`?`, `&`, `%`, spaces) is encoded.
    pub fn mailto_url(&self, to: &str) -> String {
        let to = to
            .trim()
            .split('@')
            .map(|part| urlencoding::encode(part).into_owned())
            .collect::<Vec<_>>()
            .join("@");
        format!(
            "mailto:{}?subject={}&body={}",
            to,
            urlencoding::encode(&self.subject),
            urlencoding::encode(&self.body)
        )
    }
}

pub fn compose(template: MailTemplate, context: &MailContext) -> ComposedMail {
    ComposedMail {
        subject: substitute(template.subject(), context),
        body: substitute(template.body(), context),
    }
}

/// Replace `{{key}}` markers; unknown keys render as nothing
///
/// An unclosed `{{` is not a marker and is kept as written.
fn substitute(text: &str, context: &MailContext) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                out.push_str(context.value(key).unwrap_or(""));
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
