use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const UNKNOWN_KEY: &str = "(unknown)";

// --- Query request ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsRequest {
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Query,
    Page,
    Country,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Query => write!(f, "query"),
            Dimension::Page => write!(f, "page"),
            Dimension::Country => write!(f, "country"),
        }
    }
}

// --- Query response ---

#[derive(Debug, Deserialize)]
pub struct SearchAnalyticsResponse {
    #[serde(default, deserialize_with = "null_as_empty_vec")]
    pub rows: Vec<ApiRow>,
}

/// Deserialize `null` as an empty Vec; the API omits `rows` entirely on empty days.
fn null_as_empty_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

/// One raw row. Every field is optional upstream.
#[derive(Debug, Deserialize)]
pub struct ApiRow {
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    pub clicks: Option<f64>,
    pub impressions: Option<f64>,
    pub ctr: Option<f64>,
    pub position: Option<f64>,
}

fn count(v: Option<f64>) -> u64 {
    // Counts arrive as JSON doubles.
    v.filter(|x| x.is_finite() && *x > 0.0)
        .map(|x| x.round() as u64)
        .unwrap_or(0)
}

impl ApiRow {
    pub fn totals(&self) -> Totals {
        Totals {
            clicks: count(self.clicks),
            impressions: count(self.impressions),
            ctr: self.ctr.unwrap_or(0.0),
            position: self.position.unwrap_or(0.0),
        }
    }

    pub fn metric_row(&self) -> MetricRow {
        let key = self
            .keys
            .as_ref()
            .and_then(|k| k.first())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_KEY.to_string());
        let Totals {
            clicks,
            impressions,
            ctr,
            position,
        } = self.totals();
        MetricRow {
            key,
            clicks,
            impressions,
            ctr,
            position,
        }
    }
}

// --- Report inputs (internal, not API) ---

/// Whole-property aggregate for the report window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

/// One ranked entry for a dimension: a query term, page URL, or country code.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub key: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

/// A single calendar day, used as both start and end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub date: NaiveDate,
}

impl ReportWindow {
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn request(&self, dimension: Option<Dimension>, row_limit: Option<u32>) -> SearchAnalyticsRequest {
        SearchAnalyticsRequest {
            start_date: self.iso_date(),
            end_date: self.iso_date(),
            dimensions: dimension.into_iter().collect(),
            row_limit,
        }
    }
}
