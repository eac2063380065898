//! Telegram HTML rendering for the daily digest. Pure string building, no I/O.

use crate::search_console::types::{MetricRow, Totals};

pub const NO_DATA: &str = "(no data)";

/// Two decimals with ties rounded away from zero; `{:.2}` alone rounds an
/// exact tie like `2.125` to even.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn fmt_pct(x: f64) -> String {
    format!("{:.2}%", round2(x * 100.0))
}

/// Thousands-grouped integer, `1234567` → `1,234,567`.
pub fn fmt_num(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn fmt_pos(x: f64) -> String {
    format!("{:.2}", round2(x))
}

/// Escape the three characters Telegram's HTML parse mode treats as markup.
/// Single pass, so `&` introduced by an entity is never escaped again.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Ranked block: one numbered line per row in the given order, or the
/// placeholder when the API returned nothing.
pub fn section(title: &str, rows: &[MetricRow]) -> String {
    if rows.is_empty() {
        return format!("<b>{}</b>\n{}\n", title, NO_DATA);
    }
    let lines: Vec<String> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            format!(
                "{}. {} — {} clicks, {} impr, {}, pos {}",
                i + 1,
                escape_html(&row.key),
                fmt_num(row.clicks),
                fmt_num(row.impressions),
                fmt_pct(row.ctr),
                fmt_pos(row.position),
            )
        })
        .collect();
    format!("<b>{}</b>\n{}\n", title, lines.join("\n"))
}

/// Everything one site's message is built from.
#[derive(Debug, Clone)]
pub struct SiteReport<'a> {
    pub site: &'a str,
    pub date: &'a str,
    pub totals: Totals,
    pub queries: Vec<MetricRow>,
    pub pages: Vec<MetricRow>,
    pub countries: Vec<MetricRow>,
}

impl SiteReport<'_> {
    pub fn render(&self) -> String {
        format!(
            "<b>GSC Daily Update</b>\n\
             <b>Property:</b> {}\n\
             <b>Date:</b> {}\n\
             \n\
             <b>Totals</b>\n\
             • Clicks: {}\n\
             • Impressions: {}\n\
             • Avg CTR: {}\n\
             • Avg Position: {}\n\
             \n\
             {}\n\
             {}\n\
             {}\n",
            escape_html(self.site),
            self.date,
            fmt_num(self.totals.clicks),
            fmt_num(self.totals.impressions),
            fmt_pct(self.totals.ctr),
            fmt_pos(self.totals.position),
            section("Top Queries", &self.queries),
            section("Top Pages", &self.pages),
            section("Top Countries", &self.countries),
        )
    }
}
