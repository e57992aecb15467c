use analysis_core::{
    AnalysisError, Instrument, MarketDataSource, MarketStatus, NewsItem, PriceRecord,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

pub mod retry;
pub use retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://nepalstock.onrender.com";

/// Listed instruments carry this status when they trade.
const ACTIVE_STATUS: &str = "A";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode {url}: {message}")]
    Decode { url: String, message: String },

    #[error("{url} unavailable after {attempts} attempts: {last_error}")]
    Unavailable {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl From<ClientError> for AnalysisError {
    fn from(e: ClientError) -> Self {
        AnalysisError::DataUnavailable(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Rows requested per history call.
    pub page_size: usize,
    pub retry: RetryPolicy,
}

impl Default for ExchangeClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            page_size: 500,
            retry: RetryPolicy::default(),
        }
    }
}

/// REST client for the exchange data service.
#[derive(Clone)]
pub struct ExchangeClient {
    client: Client,
    base_url: String,
    page_size: usize,
    retry: RetryPolicy,
}

impl ExchangeClient {
    pub fn new(config: ExchangeClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.max(1),
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document, retrying transport failures, 429 and 5xx
    /// responses according to the retry policy.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let attempts = self.retry.attempts();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.retry.delay_for(attempt - 1);
                tracing::debug!(
                    "Retrying {} in {:.1}s (attempt {}/{}): {}",
                    url,
                    delay.as_secs_f64(),
                    attempt,
                    attempts,
                    last_error
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.get(&url).query(query).send().await {
                Ok(resp) => resp,
                Err(e) if e.is_builder() => return Err(ClientError::Request(e)),
                Err(e) => {
                    last_error = format!("request error: {}", e);
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        last_error = format!("body error: {}", e);
                        continue;
                    }
                };
                return serde_json::from_str(&body).map_err(|e| ClientError::Decode {
                    url: url.clone(),
                    message: e.to_string(),
                });
            }

            if RetryPolicy::is_retryable(status) {
                last_error = format!("HTTP {}", status);
                continue;
            }

            return Err(ClientError::Status {
                status: status.as_u16(),
                url,
            });
        }

        tracing::warn!("{} unavailable after {} attempts: {}", url, attempts, last_error);
        Err(ClientError::Unavailable {
            url,
            attempts,
            last_error,
        })
    }

    pub async fn is_market_open(&self) -> Result<bool, ClientError> {
        let response: MarketOpenResponse = self.get_json("/nepse-data/market-open", &[]).await?;
        Ok(response.is_open())
    }

    /// Index summary, passed through untouched.
    pub async fn market_index(&self) -> Result<serde_json::Value, ClientError> {
        self.get_json("/nepse-index", &[]).await
    }

    /// Every non-delisted security, active or not.
    pub async fn securities(&self) -> Result<Vec<Instrument>, ClientError> {
        let entries: Vec<SecurityEntry> = self
            .get_json("/security", &[("nonDelisted", "true".to_string())])
            .await?;
        Ok(entries.into_iter().filter_map(SecurityEntry::into_instrument).collect())
    }

    pub async fn history(
        &self,
        security_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceRecord>, ClientError> {
        let query = [
            ("startDate", from.format("%Y-%m-%d").to_string()),
            ("endDate", to.format("%Y-%m-%d").to_string()),
            ("size", self.page_size.to_string()),
        ];
        let page: HistoryPage = self
            .get_json(&format!("/market/history/security/{}", security_id), &query)
            .await?;
        Ok(page.content.into_iter().map(HistoryEntry::into_record).collect())
    }

    pub async fn company_news(&self) -> Result<Vec<NewsItem>, ClientError> {
        let response: DisclosureResponse = self.get_json("/news/companies/disclosure", &[]).await?;
        Ok(response
            .company_news
            .into_iter()
            .filter_map(DisclosureEntry::into_news_item)
            .collect())
    }
}

#[async_trait]
impl MarketDataSource for ExchangeClient {
    async fn market_status(&self) -> Result<MarketStatus, AnalysisError> {
        let is_open = self.is_market_open().await?;
        let index = match self.market_index().await {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!("Market index unavailable: {}", e);
                None
            }
        };
        Ok(MarketStatus { is_open, index })
    }

    async fn list_instruments(&self) -> Result<Vec<Instrument>, AnalysisError> {
        let all = self.securities().await?;
        let total = all.len();
        let active: Vec<Instrument> = all.into_iter().filter(|i| i.active).collect();
        tracing::info!("Roster: {} active of {} listed securities", active.len(), total);
        Ok(active)
    }

    async fn price_history(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceRecord>, AnalysisError> {
        self.history(instrument.id, from, to)
            .await
            .map_err(|e| AnalysisError::DataUnavailable(format!("{}: {}", instrument.symbol, e)))
    }

    async fn news(&self) -> Result<Vec<NewsItem>, AnalysisError> {
        Ok(self.company_news().await?)
    }
}

// Response structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketOpenResponse {
    #[serde(default)]
    is_open: serde_json::Value,
}

impl MarketOpenResponse {
    /// The service has reported this flag as a bool, a number and as text
    /// such as "OPEN" / "CLOSE".
    fn is_open(&self) -> bool {
        match &self.is_open {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            serde_json::Value::String(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("open") || s.eq_ignore_ascii_case("true")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecurityEntry {
    id: i64,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    security_name: Option<String>,
    #[serde(default)]
    active_status: Option<String>,
}

impl SecurityEntry {
    fn into_instrument(self) -> Option<Instrument> {
        let symbol = self.symbol?.trim().to_string();
        if symbol.is_empty() {
            return None;
        }
        Some(Instrument {
            id: self.id,
            symbol,
            name: self.security_name,
            active: self.active_status.as_deref() == Some(ACTIVE_STATUS),
        })
    }
}

#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    content: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry {
    #[serde(default)]
    business_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    close_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    total_traded_quantity: Option<f64>,
}

impl HistoryEntry {
    fn into_record(self) -> PriceRecord {
        PriceRecord {
            business_date: self.business_date.unwrap_or_default(),
            close_price: self.close_price,
            total_traded_quantity: self.total_traded_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisclosureResponse {
    #[serde(default)]
    company_news: Vec<DisclosureEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisclosureEntry {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    news_headline: Option<String>,
    #[serde(default)]
    remarks: Option<String>,
}

impl DisclosureEntry {
    fn into_news_item(self) -> Option<NewsItem> {
        let symbol = self.symbol.filter(|s| !s.trim().is_empty())?;
        Some(NewsItem {
            symbol,
            published_date: self.published_date.unwrap_or_default(),
            headline: self.news_headline.unwrap_or_default(),
            remarks: self.remarks.unwrap_or_default(),
        })
    }
}

/// Accept numbers and numeric strings; anything else reads as missing.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }))
}
