use reqwest::{Client, Url};
use tracing::debug;

use super::auth::{AccessToken, ServiceAccount, ServiceAccountAuth};
use super::types::*;
use crate::error::{ReportError, Result};

pub const DEFAULT_BASE_URL: &str = "https://searchconsole.googleapis.com";
pub const TOP_LIMIT: u32 = 10;

/// Build the shared HTTP client used for every outbound call in a run.
pub fn http_client() -> anyhow::Result<Client> {
    use anyhow::Context;
    Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .context("Failed to build HTTP client")
}

/// An authenticated handle on the search-analytics API.
#[derive(Clone)]
pub struct SearchConsoleClient {
    http: Client,
    token: AccessToken,
    base_url: String,
}

impl SearchConsoleClient {
    pub fn new(http: Client, token: AccessToken, base_url: impl Into<String>) -> Self {
        Self {
            http,
            token,
            base_url: base_url.into(),
        }
    }

    /// Sign in as the service account and return a client scoped to read-only access.
    pub async fn authenticate(http: Client, account: &ServiceAccount, base_url: &str) -> Result<Self> {
        let auth = ServiceAccountAuth::new(account)?;
        let token = auth.fetch_token(&http).await?;
        Ok(Self::new(http, token, base_url))
    }

    /// `{base}/webmasters/v3/sites/{site}/searchAnalytics/query`, with the
    /// site encoded as a single path segment.
    pub fn query_url(&self, site: &str) -> Result<Url> {
        let invalid = |reason: String| ReportError::Query {
            site: site.to_string(),
            status: None,
            message: reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(format!("bad base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["webmasters", "v3", "sites", site, "searchAnalytics", "query"]);
        Ok(url)
    }

    async fn query(&self, site: &str, request: &SearchAnalyticsRequest) -> Result<SearchAnalyticsResponse> {
        let failed = |status: Option<u16>, message: String| ReportError::Query {
            site: site.to_string(),
            status,
            message,
        };

        let resp = self
            .http
            .post(self.query_url(site)?)
            .bearer_auth(self.token.as_str())
            .json(request)
            .send()
            .await
            .map_err(|e| failed(None, format!("HTTP POST failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(failed(Some(status.as_u16()), body));
        }
        resp.json::<SearchAnalyticsResponse>()
            .await
            .map_err(|e| failed(Some(status.as_u16()), format!("Failed to parse response: {}", e)))
    }

    /// Whole-property totals for the window. No rows means an all-zero day.
    pub async fn query_totals(&self, site: &str, window: ReportWindow) -> Result<Totals> {
        let resp = self.query(site, &window.request(None, None)).await?;
        let totals = resp.rows.first().map(ApiRow::totals).unwrap_or_default();
        debug!(site, date = %window.date, clicks = totals.clicks, "Fetched totals");
        Ok(totals)
    }

    /// Top `limit` rows grouped by `dimension`, in the order the API ranks them.
    pub async fn query_top(
        &self,
        site: &str,
        window: ReportWindow,
        dimension: Dimension,
        limit: u32,
    ) -> Result<Vec<MetricRow>> {
        let resp = self
            .query(site, &window.request(Some(dimension), Some(limit)))
            .await?;
        let rows: Vec<MetricRow> = resp.rows.iter().map(ApiRow::metric_row).collect();
        debug!(site, date = %window.date, %dimension, rows = rows.len(), "Fetched top rows");
        Ok(rows)
    }
}
