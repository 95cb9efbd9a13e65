use std::collections::HashMap;
use std::env;
use std::fmt;

use crate::store::postgres::is_valid_identifier;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
    pub from: String,
    pub starttls: bool,
}

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub secret_token: String,
    pub store: StoreBackend,
    pub sheet_id: String,
    pub sheet_tab: String,
    pub notify_recipient: String,
    pub smtp: Option<SmtpConfig>,
    pub bind_addr: String,
    pub webhook_path: String,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, reason } => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(vars, key);
        let required = |key: &'static str| get(key).map(str::to_string).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| get(key).map(str::to_string).unwrap_or_else(|| default.to_string());

        let secret_token = required("WEBHOOK_SECRET_TOKEN")?;

        let store = match get("TABLE_STORE").unwrap_or("postgres") {
            "postgres" => StoreBackend::Postgres { database_url: required("DATABASE_URL")? },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "TABLE_STORE",
                    reason: format!("unknown backend '{}'", other),
                })
            }
        };

        let sheet_id = identifier("SHEET_ID", or_default("SHEET_ID", "uploads"))?;
        let sheet_tab = identifier("SHEET_TAB", or_default("SHEET_TAB", "file_uploads"))?;

        let notify_recipient = required("NOTIFY_RECIPIENT")?;
        if !notify_recipient.contains('@') {
            return Err(ConfigError::Invalid {
                key: "NOTIFY_RECIPIENT",
                reason: "not an email address".to_string(),
            });
        }

        let smtp = match get("SMTP_HOST") {
            None => None,
            Some(host) => {
                let port = or_default("SMTP_PORT", "587").parse::<u16>().map_err(|e| ConfigError::Invalid {
                    key: "SMTP_PORT",
                    reason: e.to_string(),
                })?;
                let credentials = match (get("SMTP_USER"), get("SMTP_PASSWORD")) {
                    (Some(user), Some(password)) => Some((user.to_string(), password.to_string())),
                    (None, None) => None,
                    _ => {
                        return Err(ConfigError::Invalid {
                            key: "SMTP_USER",
                            reason: "SMTP_USER and SMTP_PASSWORD must be set together".to_string(),
                        })
                    }
                };
                let starttls = match or_default("SMTP_STARTTLS", "true").to_lowercase().as_str() {
                    "true" | "1" | "yes" => true,
                    "false" | "0" | "no" => false,
                    other => {
                        return Err(ConfigError::Invalid {
                            key: "SMTP_STARTTLS",
                            reason: format!("expected a boolean, got '{}'", other),
                        })
                    }
                };
                Some(SmtpConfig {
                    host: host.to_string(),
                    port,
                    credentials,
                    from: or_default("SMTP_FROM", "uploads@localhost"),
                    starttls,
                })
            }
        };

        let webhook_path = or_default("WEBHOOK_PATH", "/webhook");
        if !webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "WEBHOOK_PATH",
                reason: "must start with '/'".to_string(),
            });
        }

        Ok(Config {
            secret_token,
            store,
            sheet_id,
            sheet_tab,
            notify_recipient,
            smtp,
            bind_addr: or_default("BIND_ADDR", "127.0.0.1:8080"),
            webhook_path,
        })
    }
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn identifier(key: &'static str, value: String) -> Result<String, ConfigError> {
    if is_valid_identifier(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            reason: format!("'{}' is not a plain identifier", value),
        })
    }
}
