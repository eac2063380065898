use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

use crate::error::{ReportError, Result};
use crate::search_console::auth::ServiceAccount;

pub const SERVICE_ACCOUNT_VAR: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";
pub const SITES_VAR: &str = "SITES_URLS";
pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";
pub const START_AT_VAR: &str = "START_AT_UTC";

/// Everything one digest run needs, resolved and validated up front.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_account: ServiceAccount,
    pub sites: Vec<String>,
    pub telegram: TelegramConfig,
    pub start_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl Config {
    /// Load from the process environment (plus `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve every variable through `lookup`. Fails on the first missing or
    /// malformed value; there are no defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let start_at = parse_start_at(&require_env(&lookup, START_AT_VAR)?)?;
        let sites = parse_sites(&require_env(&lookup, SITES_VAR)?)?;
        let service_account = parse_service_account(&require_env(&lookup, SERVICE_ACCOUNT_VAR)?)?;
        let telegram = TelegramConfig {
            bot_token: require_env(&lookup, BOT_TOKEN_VAR)?,
            chat_id: require_env(&lookup, CHAT_ID_VAR)?,
        };

        Ok(Self {
            service_account,
            sites,
            telegram,
            start_at,
        })
    }
}

/// A variable counts as missing when it is unset or empty.
pub fn require_env<F>(lookup: &F, name: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ReportError::MissingConfiguration { name }),
    }
}

fn parse_sites(raw: &str) -> Result<Vec<String>> {
    let sites: Vec<String> =
        serde_json::from_str(raw).map_err(|e| ReportError::malformed(SITES_VAR, e))?;
    if sites.is_empty() {
        return Err(ReportError::malformed(SITES_VAR, "site list is empty"));
    }
    if let Some(i) = sites.iter().position(|s| s.trim().is_empty()) {
        return Err(ReportError::malformed(
            SITES_VAR,
            format!("entry {} is blank", i),
        ));
    }
    Ok(sites)
}

fn parse_service_account(raw: &str) -> Result<ServiceAccount> {
    // serde_json echoes offending string values in its messages; report only
    // the error category and position so the key never ends up in output.
    serde_json::from_str(raw).map_err(|e| {
        ReportError::malformed(
            SERVICE_ACCOUNT_VAR,
            format!(
                "{:?} error at line {} column {}",
                e.classify(),
                e.line(),
                e.column()
            ),
        )
    })
}

/// RFC 3339 first; timestamps without an offset and bare dates are read as UTC.
pub fn parse_start_at(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ReportError::malformed(START_AT_VAR, format!("not an ISO-8601 timestamp: {}", raw)))
}
