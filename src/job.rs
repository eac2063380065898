use chrono::{DateTime, Duration, NaiveTime, Utc};
use reqwest::Client;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::report::SiteReport;
use crate::search_console::client::{self, SearchConsoleClient, TOP_LIMIT};
use crate::search_console::types::{Dimension, ReportWindow};
use crate::telegram::{self, TelegramNotifier};

/// API roots for the two outbound services.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub search_console: String,
    pub telegram: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            search_console: client::DEFAULT_BASE_URL.to_string(),
            telegram: telegram::DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Invoked before the configured go-live instant; nothing was sent.
    NotYetDue { start_at: DateTime<Utc> },
    Done { date: String, sites: usize },
}

/// The previous UTC calendar day relative to `now`.
pub fn yesterday(now: DateTime<Utc>) -> ReportWindow {
    ReportWindow {
        date: (now - Duration::days(1)).date_naive(),
    }
}

/// Next instant strictly after `now` whose UTC wall-clock time is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// One daily run: guard, authenticate once, then report every site in order.
/// The first failing site ends the run; later sites are not attempted.
pub async fn run_daily(
    config: &Config,
    http: &Client,
    endpoints: &Endpoints,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    if now < config.start_at {
        info!(start_at = %config.start_at, "Before start time, skipping run");
        return Ok(RunOutcome::NotYetDue {
            start_at: config.start_at,
        });
    }

    let window = yesterday(now);
    info!(date = %window.date, sites = config.sites.len(), "Starting daily digest");

    let search_console =
        SearchConsoleClient::authenticate(http.clone(), &config.service_account, &endpoints.search_console)
            .await?;
    let notifier = TelegramNotifier::new(http.clone(), &config.telegram, &endpoints.telegram);

    for site in &config.sites {
        report_site(&search_console, &notifier, site, window).await?;
    }

    info!(date = %window.date, sites = config.sites.len(), "Daily digest complete");
    Ok(RunOutcome::Done {
        date: window.iso_date(),
        sites: config.sites.len(),
    })
}

async fn report_site(
    search_console: &SearchConsoleClient,
    notifier: &TelegramNotifier,
    site: &str,
    window: ReportWindow,
) -> Result<()> {
    // The four reads are independent; rendering order is fixed below.
    let (totals, queries, pages, countries) = tokio::try_join!(
        search_console.query_totals(site, window),
        search_console.query_top(site, window, Dimension::Query, TOP_LIMIT),
        search_console.query_top(site, window, Dimension::Page, TOP_LIMIT),
        search_console.query_top(site, window, Dimension::Country, TOP_LIMIT),
    )?;

    let date = window.iso_date();
    let text = SiteReport {
        site,
        date: &date,
        totals,
        queries,
        pages,
        countries,
    }
    .render();

    notifier.send(&text).await?;
    info!(site, date = %date, clicks = totals.clicks, impressions = totals.impressions, "Digest sent");
    Ok(())
}
