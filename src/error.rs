use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

/// Every way a digest run can fail. Nothing is retried; callers either let the
/// error end the run or turn it into a diagnostic response.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Missing env var: {name}")]
    MissingConfiguration { name: &'static str },

    #[error("Malformed env var {name}: {reason}")]
    MalformedConfiguration { name: &'static str, reason: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Search Console query for {site} failed{}: {message}", status_suffix(.status))]
    Query {
        site: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Telegram send failed{}: {message}", status_suffix(.status))]
    Delivery { status: Option<u16>, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl ReportError {
    pub fn malformed(name: &'static str, reason: impl std::fmt::Display) -> Self {
        ReportError::MalformedConfiguration {
            name,
            reason: reason.to_string(),
        }
    }
}
