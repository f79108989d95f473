//! Upstream website client.
//!
//! Talks to a screener.in-style equity research site: Django form login
//! with a CSRF cookie, company pages whose sections are `table.data-table`
//! blocks, a JSON-fragment peers endpoint, and a raw query-language screen
//! endpoint. All responses are HTML; parsing is CSS-selector based.
//!
//! The session lives in the reqwest cookie jar, so one client instance is
//! one upstream session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{header, StatusCode, Url};
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::screen::CompiledScreen;

use super::{
    normalize_ticker, AuthError, Credentials, FetchError, FundamentalsProvider, ScreenError,
    StatementKind,
};

/// Client for the upstream equity website.
pub struct ScreenerWeb {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base_url: String,
}

impl ScreenerWeb {
    /// Create a client from upstream configuration.
    pub fn new(config: &sfin_common::UpstreamConfig) -> Self {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_provider(Arc::clone(&jar))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            jar,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Read the CSRF token the login page dropped in the cookie jar.
    fn csrf_token(&self) -> Option<String> {
        let url = Url::parse(&format!("{}/", self.base_url)).ok()?;
        let cookies = self.jar.cookies(&url)?;
        let raw = cookies.to_str().ok()?;
        raw.split(';')
            .map(str::trim)
            .find_map(|pair| pair.strip_prefix("csrftoken=").map(str::to_string))
    }

    async fn get_company_page(&self, ticker: &str) -> Result<String, FetchError> {
        let url = format!("{}/company/{}/consolidated/", self.base_url, ticker);
        let response = self.client.get(&url).send().await.map_err(fetch_err)?;

        // A redirect to the login page means the cookie session lapsed.
        if response.url().path().starts_with("/login") {
            return Err(FetchError::Auth(AuthError::Rejected(
                "upstream session expired".into(),
            )));
        }

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::UnknownTicker(ticker.to_string())),
            status if !status.is_success() => Err(FetchError::Upstream {
                status: status.as_u16(),
            }),
            _ => response.text().await.map_err(fetch_err),
        }
    }

    async fn fetch_peers(&self, company_id: u64) -> Result<Value, FetchError> {
        let url = format!("{}/api/company/{}/peers/", self.base_url, company_id);
        let response = self.client.get(&url).send().await.map_err(fetch_err)?;

        if !response.status().is_success() {
            return Err(FetchError::Upstream {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await.map_err(fetch_err)?;
        table_records(&body, None)
    }
}

#[async_trait]
impl FundamentalsProvider for ScreenerWeb {
    fn name(&self) -> &'static str {
        "screener-web"
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let login_url = format!("{}/login/", self.base_url);

        let response = self.client.get(&login_url).send().await.map_err(auth_err)?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(format!(
                "login page returned HTTP {}",
                response.status()
            )));
        }

        let token = self
            .csrf_token()
            .ok_or_else(|| AuthError::Rejected("login page set no CSRF cookie".into()))?;

        let form = [
            ("username", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
            ("csrfmiddlewaretoken", token.as_str()),
        ];

        let response = self
            .client
            .post(&login_url)
            .header(header::REFERER, login_url.as_str())
            .form(&form)
            .send()
            .await
            .map_err(auth_err)?;

        // The upstream re-renders the login form on bad credentials and
        // redirects away from it on success.
        if response.url().path().starts_with("/login") {
            return Err(AuthError::InvalidCredentials);
        }
        if !response.status().is_success() {
            return Err(AuthError::Rejected(format!(
                "login flow ended with HTTP {}",
                response.status()
            )));
        }

        info!(base_url = %self.base_url, "Upstream login succeeded");
        Ok(())
    }

    async fn fetch_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Value, FetchError> {
        let ticker = normalize_ticker(ticker);
        let body = self.get_company_page(&ticker).await?;

        match kind {
            StatementKind::Overview => parse_overview(&body),
            StatementKind::Income => table_records(&body, Some("section#profit-loss")),
            StatementKind::BalanceSheet => table_records(&body, Some("section#balance-sheet")),
            StatementKind::CashFlow => table_records(&body, Some("section#cash-flow")),
            StatementKind::Quarterly => table_records(&body, Some("section#quarters")),
            StatementKind::Shareholding => table_records(&body, Some("section#shareholding")),
            StatementKind::PeerComparison => {
                let company_id = extract_company_id(&body)?;
                self.fetch_peers(company_id).await
            }
        }
    }

    async fn run_screen(&self, query: &CompiledScreen) -> Result<Vec<String>, ScreenError> {
        let url = format!("{}/screen/raw/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", query.to_query_string())])
            .send()
            .await
            .map_err(screen_err)?;

        if response.url().path().starts_with("/login") {
            return Err(ScreenError::Auth(AuthError::Rejected(
                "upstream session expired".into(),
            )));
        }
        if !response.status().is_success() {
            return Err(ScreenError::Upstream(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(screen_err)?;
        let tickers = parse_screen_results(&body)?;
        debug!(matches = tickers.len(), "Screen results parsed");
        Ok(tickers)
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

fn auth_err(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::Network(err.to_string())
    }
}

fn fetch_err(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

fn screen_err(err: reqwest::Error) -> ScreenError {
    if err.is_timeout() {
        ScreenError::Timeout
    } else {
        ScreenError::Upstream(err.to_string())
    }
}

// ============================================================================
// Parsing Helpers
// ============================================================================
//
// All parsing is synchronous over an owned body string: `scraper::Html` is
// not `Send`, so it must never live across an await point.

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector)
        .map_err(|_| FetchError::MalformedResponse(format!("invalid selector: {selector}")))
}

/// Element text with whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-effort cell conversion: numbers where they parse, text otherwise.
fn cell_value(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '₹'))
        .collect();

    match cleaned.trim().parse::<f64>() {
        Ok(number) => serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
        Err(_) => Value::String(text.to_string()),
    }
}

/// Parse a `table.data-table` into array-of-records JSON.
///
/// `scope` narrows the search to one page section (e.g.
/// `section#profit-loss`); without it the first data table in the document
/// is used (the peers fragment has exactly one).
fn table_records(body: &str, scope: Option<&str>) -> Result<Value, FetchError> {
    let html = Html::parse_document(body);

    let table_selector = match scope {
        Some(section) => parse_selector(&format!("{section} table.data-table"))?,
        None => parse_selector("table.data-table")?,
    };
    let table = html.select(&table_selector).next().ok_or_else(|| {
        FetchError::MalformedResponse(format!(
            "no data table found{}",
            scope.map(|s| format!(" in {s}")).unwrap_or_default()
        ))
    })?;

    let header_selector = parse_selector("thead th")?;
    let headers: Vec<String> = table.select(&header_selector).map(element_text).collect();

    let row_selector = parse_selector("tbody tr")?;
    let cell_selector = parse_selector("td")?;

    let mut records = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<String> = row.select(&cell_selector).map(element_text).collect();
        if cells.is_empty() {
            continue;
        }

        let mut record = Map::new();
        for (index, cell) in cells.iter().enumerate() {
            let key = match headers.get(index).map(String::as_str) {
                Some(name) if !name.is_empty() => name.to_string(),
                // Statement tables leave the line-item column unnamed
                _ if index == 0 => "line_item".to_string(),
                _ => format!("col_{index}"),
            };
            record.insert(key, cell_value(cell));
        }
        records.push(Value::Object(record));
    }

    if records.is_empty() {
        return Err(FetchError::MalformedResponse(
            "data table has no rows".into(),
        ));
    }

    Ok(Value::Array(records))
}

/// Parse the `#top-ratios` list into a flat object of named values.
fn parse_overview(body: &str) -> Result<Value, FetchError> {
    let html = Html::parse_document(body);

    let item_selector = parse_selector("#top-ratios li")?;
    let name_selector = parse_selector("span.name")?;
    let number_selector = parse_selector("span.number")?;
    let value_selector = parse_selector("span.value")?;

    let mut overview = Map::new();
    for item in html.select(&item_selector) {
        let Some(name) = item.select(&name_selector).next().map(element_text) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let value = item
            .select(&number_selector)
            .next()
            .or_else(|| item.select(&value_selector).next())
            .map(element_text)
            .unwrap_or_default();

        overview.insert(name, cell_value(&value));
    }

    if overview.is_empty() {
        return Err(FetchError::MalformedResponse(
            "company page has no ratio list".into(),
        ));
    }

    Ok(Value::Object(overview))
}

/// Pull the numeric company id the peers endpoint is keyed by.
fn extract_company_id(body: &str) -> Result<u64, FetchError> {
    let html = Html::parse_document(body);
    let selector = parse_selector("[data-company-id]")?;

    html.select(&selector)
        .next()
        .and_then(|el| el.value().attr("data-company-id"))
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| FetchError::MalformedResponse("company page has no company id".into()))
}

/// Extract tickers from a screen result page, preserving upstream order.
fn parse_screen_results(body: &str) -> Result<Vec<String>, ScreenError> {
    let html = Html::parse_document(body);
    let link_selector = Selector::parse(r#"table.data-table a[href^="/company/"]"#)
        .map_err(|_| ScreenError::Upstream("invalid selector".into()))?;

    let mut tickers = Vec::new();
    for link in html.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        // hrefs look like /company/TCS/ or /company/TCS/consolidated/
        if let Some(raw) = href.split('/').nth(2) {
            let ticker = raw.trim().to_ascii_uppercase();
            if !ticker.is_empty() && !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }
    }

    // An empty page is a valid screen with zero matches
    Ok(tickers)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const COMPANY_PAGE: &str = r##"
        <html><body>
        <div id="company-info" data-company-id="1423">
          <ul id="top-ratios">
            <li><span class="name">Market Cap</span>
                <span class="value">₹ <span class="number">1,20,500</span> Cr.</span></li>
            <li><span class="name">Stock P/E</span>
                <span class="value"><span class="number">27.4</span></span></li>
            <li><span class="name">High / Low</span>
                <span class="value">₹ 4,100 / 3,000</span></li>
          </ul>
        </div>
        <section id="profit-loss">
          <table class="data-table">
            <thead><tr><th></th><th>Mar 2023</th><th>Mar 2024</th></tr></thead>
            <tbody>
              <tr><td>Sales</td><td>1,200</td><td>1,450</td></tr>
              <tr><td>Net Profit</td><td>210</td><td>260</td></tr>
            </tbody>
          </table>
        </section>
        </body></html>
    "##;

    #[test]
    fn test_parse_overview() {
        let overview = parse_overview(COMPANY_PAGE).unwrap();
        let obj = overview.as_object().unwrap();

        assert_eq!(obj["Market Cap"], serde_json::json!(120500.0));
        assert_eq!(obj["Stock P/E"], serde_json::json!(27.4));
        // Non-numeric values survive as text
        assert!(obj["High / Low"].is_string());
    }

    #[test]
    fn test_table_records_scoped() {
        let records = table_records(COMPANY_PAGE, Some("section#profit-loss")).unwrap();
        let rows = records.as_array().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["line_item"], serde_json::json!("Sales"));
        assert_eq!(rows[0]["Mar 2024"], serde_json::json!(1450.0));
        assert_eq!(rows[1]["line_item"], serde_json::json!("Net Profit"));
    }

    #[test]
    fn test_table_records_missing_section() {
        let err = table_records(COMPANY_PAGE, Some("section#balance-sheet")).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[test]
    fn test_extract_company_id() {
        assert_eq!(extract_company_id(COMPANY_PAGE).unwrap(), 1423);
        assert!(extract_company_id("<html></html>").is_err());
    }

    #[test]
    fn test_parse_screen_results_order_and_dedup() {
        let body = r#"
            <table class="data-table"><tbody>
              <tr><td><a href="/company/TCS/">TCS</a></td></tr>
              <tr><td><a href="/company/INFY/consolidated/">Infosys</a></td></tr>
              <tr><td><a href="/company/TCS/">TCS again</a></td></tr>
            </tbody></table>
        "#;

        let tickers = parse_screen_results(body).unwrap();
        assert_eq!(tickers, vec!["TCS".to_string(), "INFY".to_string()]);
    }

    #[test]
    fn test_parse_screen_results_empty_is_ok() {
        let tickers = parse_screen_results("<html><body>No results</body></html>").unwrap();
        assert!(tickers.is_empty());
    }

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(cell_value("1,450"), serde_json::json!(1450.0));
        assert_eq!(cell_value("27.4%"), serde_json::json!(27.4));
        assert_eq!(cell_value("-12.5"), serde_json::json!(-12.5));
        assert_eq!(cell_value(""), Value::Null);
        assert_eq!(cell_value("Mar 2024"), serde_json::json!("Mar 2024"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = sfin_common::UpstreamConfig {
            base_url: "https://example.com/".into(),
            ..Default::default()
        };
        let client = ScreenerWeb::new(&config);
        assert_eq!(client.base_url, "https://example.com");
    }
}
