use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::quote::Quote;

/// Abstraction over an upstream market-data source.
///
/// The proxy and Yahoo Finance both implement it; tests plug in fakes.
/// Symbols arrive already uppercased.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Daily closing prices from `from` up to the latest available day.
    /// Order is not guaranteed; the store normalizes it.
    async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;

    /// Current quote for a symbol.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError>;
}
