use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::quote::Quote;
use super::traits::MarketDataProvider;

const PROVIDER: &str = "Proxy";

/// Client for the dashboard's market-data proxy.
///
/// The proxy exposes two routes:
/// - `GET /api/stock?symbol=S`: daily series since the proxy's start date,
///   shaped like Alpha Vantage's `TIME_SERIES_DAILY` (close prices as strings).
/// - `GET /api/stock/summary?symbol=S`: the quote summary as flat JSON.
///
/// Failures come back as `{"error": "..."}` with a 4xx/5xx status.
pub struct ProxyProvider {
    client: Client,
    base_url: String,
}

impl ProxyProvider {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs.max(1)));
        #[cfg(target_arch = "wasm32")]
        let _ = timeout_secs;
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_body(&self, path: &str, symbol: &str) -> Result<String, CoreError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("{symbol}: {message}"),
            });
        }

        Ok(body)
    }
}

// ── Proxy response types ────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

/// Parse a `/api/stock` body into price points dated on or after `from`.
///
/// Rows with an unparseable date or close are skipped. A body without a
/// series, or with no usable rows at all, is an error.
pub fn parse_time_series(
    symbol: &str,
    body: &str,
    from: NaiveDate,
) -> Result<Vec<PricePoint>, CoreError> {
    let resp: TimeSeriesResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("Failed to parse time series for {symbol}: {e}"),
    })?;

    let series = resp.time_series.ok_or_else(|| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("No time series data for {symbol}"),
    })?;

    let mut usable = 0usize;
    let mut points: Vec<PricePoint> = series
        .iter()
        .filter_map(|(date_str, data)| {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
            let price: f64 = data.close.trim().parse().ok()?;
            if !price.is_finite() {
                return None;
            }
            usable += 1;
            (date >= from).then_some(PricePoint { date, price })
        })
        .collect();

    if usable == 0 {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Time series for {symbol} has no usable rows"),
        });
    }

    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// Parse a `/api/stock/summary` body into a `Quote` keyed by `symbol`.
pub fn parse_summary(symbol: &str, body: &str) -> Result<Quote, CoreError> {
    let mut quote: Quote = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("Failed to parse summary for {symbol}: {e}"),
    })?;

    quote.symbol = symbol.to_uppercase();
    if !quote.is_valid() {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid quote values for {symbol}"),
        });
    }
    Ok(quote)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for ProxyProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let body = self.get_body("/api/stock", symbol).await?;
        parse_time_series(symbol, &body, from)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let body = self.get_body("/api/stock/summary", symbol).await?;
        parse_summary(symbol, &body)
    }
}
