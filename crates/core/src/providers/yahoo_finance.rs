use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use time::OffsetDateTime;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::quote::Quote;
use super::traits::MarketDataProvider;

const PROVIDER: &str = "Yahoo Finance";

/// Days of history pulled to derive a quote; covers long weekends and holidays.
const QUOTE_WINDOW_DAYS: i64 = 10;

/// Yahoo Finance API provider, used directly when no proxy is configured.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices.
/// - **Quotes**: derived from the last two daily closes, so the optional
///   statistics (market cap, 52-week range, yield, P/E) are absent.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio).
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Convert a `chrono::NaiveDate` to `time::OffsetDateTime` (midnight UTC).
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let invalid = |e: String| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid date {date}: {e}"),
        };
        let month = time::Month::try_from(date.month() as u8).map_err(|e| invalid(e.to_string()))?;
        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| invalid(e.to_string()))?
            .with_hms(0, 0, 0)
            .map_err(|e| invalid(e.to_string()))?
            .assume_utc();
        Ok(odt)
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    async fn daily_closes(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?; // inclusive end

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {symbol}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp as i64)?;
                (date >= from && q.close.is_finite()).then_some(PricePoint {
                    date,
                    price: q.close,
                })
            })
            .collect();
        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

/// Build a quote from the two most recent closes of an ascending series.
pub fn quote_from_closes(symbol: &str, points: &[PricePoint]) -> Option<Quote> {
    let last = points.last()?;
    let change = match points.len() {
        0 | 1 => 0.0,
        n => last.price - points[n - 2].price,
    };
    let previous = last.price - change;
    let change_percent = if previous > 0.0 {
        change / previous * 100.0
    } else {
        0.0
    };
    Some(Quote::new(symbol, last.price, change, change_percent))
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let today = chrono::Utc::now().date_naive();
        self.daily_closes(symbol, from, today).await
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let from = today - chrono::Duration::days(QUOTE_WINDOW_DAYS);
        let points = self.daily_closes(symbol, from, today).await?;

        quote_from_closes(symbol, &points).ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No recent quote data for {symbol}"),
        })
    }
}
