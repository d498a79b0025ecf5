//! Process configuration
//!
//! Read once at start from the environment (after an optional `.env` file) and
//! shared read-only through [`crate::state::AppState`].

use crate::records::PaymentCategory;
use receipt::Issuer;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_AUTH_EMAIL_HEADER: &str = "x-auth-request-email";
const DEFAULT_TAX_RATE: f64 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key}: invalid value {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Default fee per payment category, tax included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeSchedule {
    #[serde(rename = "トライアル")]
    pub trial: i64,
    #[serde(rename = "単発セッション")]
    pub single: i64,
    #[serde(rename = "継続パッケージ")]
    pub package: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            trial: 6_000,
            single: 22_000,
            package: 220_000,
        }
    }
}

impl FeeSchedule {
    /// Fee charged when a payment of `category` arrives without an amount
    pub fn default_for(&self, category: PaymentCategory) -> Option<i64> {
        match category {
            PaymentCategory::Trial => Some(self.trial),
            PaymentCategory::Single => Some(self.single),
            PaymentCategory::Package => Some(self.package),
            PaymentCategory::Other => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub http_addr: SocketAddr,
    /// `sqlite://…`; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Lowercased, trimmed
    pub allowed_emails: Vec<String>,
    /// Header set by the fronting OAuth proxy
    pub auth_email_header: String,
    pub font_regular: Option<PathBuf>,
    pub font_bold: Option<PathBuf>,
    pub tax_rate: f64,
    pub issuer: Issuer,
    pub fees: FeeSchedule,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            http_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: None,
            allowed_emails: Vec::new(),
            auth_email_header: DEFAULT_AUTH_EMAIL_HEADER.to_string(),
            font_regular: None,
            font_bold: None,
            tax_rate: DEFAULT_TAX_RATE,
            issuer: Issuer::default(),
            fees: FeeSchedule::default(),
            log_format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = match var("APP_ENV").as_deref() {
            None | Some("production") => Environment::Production,
            Some("development") => Environment::Development,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "APP_ENV",
                    other,
                    "expected development or production",
                ))
            }
        };

        let http_addr = var("HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = http_addr
            .parse()
            .map_err(|e| ConfigError::invalid("HTTP_ADDR", &http_addr, e))?;

        let allowed_emails = var("ALLOWED_EMAILS")
            .map(|list| {
                list.split(',')
                    .map(|email| email.trim().to_lowercase())
                    .filter(|email| !email.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let tax_rate = match var("TAX_RATE") {
            Some(raw) => {
                let rate = ja_text::parse_rate(&raw)
                    .map_err(|e| ConfigError::invalid("TAX_RATE", &raw, e))?;
                if rate < 0.0 {
                    return Err(ConfigError::invalid("TAX_RATE", &raw, "must not be negative"));
                }
                rate
            }
            None => DEFAULT_TAX_RATE,
        };

        let defaults = FeeSchedule::default();
        let fee = |key: &'static str, default: i64| -> Result<i64, ConfigError> {
            match var(key) {
                Some(raw) => ja_text::parse_amount(&raw)
                    .map_err(|e| ConfigError::invalid(key, &raw, e))
                    .and_then(|amount| {
                        if amount < 0 {
                            Err(ConfigError::invalid(key, &raw, "must not be negative"))
                        } else {
                            Ok(amount)
                        }
                    }),
                None => Ok(default),
            }
        };
        let fees = FeeSchedule {
            trial: fee("FEE_TRIAL", defaults.trial)?,
            single: fee("FEE_SINGLE", defaults.single)?,
            package: fee("FEE_PACKAGE", defaults.package)?,
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            http_addr,
            database_url: var("DATABASE_URL"),
            allowed_emails,
            auth_email_header: var("AUTH_EMAIL_HEADER")
                .map(|header| header.to_lowercase())
                .unwrap_or_else(|| DEFAULT_AUTH_EMAIL_HEADER.to_string()),
            font_regular: var("FONT_REGULAR").map(PathBuf::from),
            font_bold: var("FONT_BOLD").map(PathBuf::from),
            tax_rate,
            issuer: Issuer {
                name: var("ISSUER_NAME").unwrap_or_default(),
                title: var("ISSUER_TITLE").unwrap_or_default(),
                address: var("ISSUER_ADDRESS").unwrap_or_default(),
            },
            fees,
            log_format,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.http_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.database_url, None);
        assert!(config.allowed_emails.is_empty());
        assert_eq!(config.auth_email_header, "x-auth-request-email");
        assert_eq!(config.tax_rate, 10.0);
        assert_eq!(config.fees, FeeSchedule::default());
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_allow_list_is_normalized() {
        let emails = " Coach@Example.com, ,admin@example.com ";
        let config = load(&[("ALLOWED_EMAILS", emails)]).unwrap();
        assert_eq!(
            config.allowed_emails,
            vec!["coach@example.com".to_string(), "admin@example.com".to_string()]
        );
    }

    #[test]
    fn test_numeric_values() {
        let config = load(&[
            ("APP_ENV", "development"),
            ("TAX_RATE", "8"),
            ("FEE_TRIAL", "5,500"),
            ("FEE_PACKAGE", "198000"),
        ])
        .unwrap();
        assert!(config.is_development());
        assert_eq!(config.tax_rate, 8.0);
        assert_eq!(config.fees.trial, 5_500);
        assert_eq!(config.fees.single, 22_000);
        assert_eq!(config.fees.package, 198_000);
    }

    #[test]
    fn test_invalid_numbers_name_the_key() {
        let err = load(&[("FEE_SINGLE", "twenty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FEE_SINGLE", .. }));

        let err = load(&[("TAX_RATE", "-5")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TAX_RATE", .. }));

        let err = load(&[("HTTP_ADDR", "localhost")]).unwrap_err();
        assert!(err.to_string().starts_with("HTTP_ADDR"));
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        assert!(load(&[("APP_ENV", "staging")]).is_err());
    }

    #[test]
    fn test_fee_for_category() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.default_for(PaymentCategory::Trial), Some(6_000));
        assert_eq!(fees.default_for(PaymentCategory::Package), Some(220_000));
        assert_eq!(fees.default_for(PaymentCategory::Other), None);
    }
}
