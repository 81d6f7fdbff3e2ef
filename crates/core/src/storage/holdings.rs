use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::price::normalize_symbol;
use crate::models::quote::Quote;
use crate::services::portfolio_ledger::PortfolioLedger;

use super::kv::KeyValueStore;

/// Fixed key the holdings blob lives under.
pub const PORTFOLIO_STORAGE_KEY: &str = "userPortfolio";

/// An unreadable holdings blob is moved here before `save_holdings` replaces it.
pub const CORRUPT_PORTFOLIO_KEY: &str = "userPortfolio.corrupt";

/// Label written for holdings with no stored type.
const DEFAULT_HOLDING_TYPE: &str = "Stock";

/// One entry of the persisted holdings blob.
///
/// The blob is a JSON array of these, shared with the web frontend, so the
/// field names are camelCase and `type` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedHolding {
    pub ticker: String,

    #[serde(default)]
    pub name: String,

    /// Last known price when the blob was written
    #[serde(default)]
    pub price: f64,

    pub shares: i64,

    #[serde(default)]
    pub change: f64,

    #[serde(default)]
    pub change_percent: f64,

    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Raw records currently stored. A missing key is an empty list.
pub fn load_records(store: &dyn KeyValueStore) -> Result<Vec<PersistedHolding>, CoreError> {
    match store.get(PORTFOLIO_STORAGE_KEY)? {
        Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::Deserialization(format!("Failed to parse stored holdings: {e}"))
        }),
        None => Ok(Vec::new()),
    }
}

/// Rebuild the ledger from local storage.
///
/// Records go through `PortfolioLedger` validation: a duplicate ticker or a
/// non-positive share count fails the whole load.
pub fn load_holdings(store: &dyn KeyValueStore) -> Result<PortfolioLedger, CoreError> {
    let records = load_records(store)?;
    let mut ledger = PortfolioLedger::new();
    for record in &records {
        ledger.add_holding(&record.ticker, record.shares)?;
    }
    debug!(holdings = ledger.len(), "holdings loaded from local storage");
    Ok(ledger)
}

/// Write the ledger to local storage as a single blob.
///
/// Price, change and name come from `quotes` when available; otherwise the
/// values already stored for that ticker are carried over. A stored blob that
/// cannot be parsed is copied to `CORRUPT_PORTFOLIO_KEY` and then replaced.
pub fn save_holdings(
    store: &dyn KeyValueStore,
    ledger: &PortfolioLedger,
    quotes: &HashMap<String, Quote>,
) -> Result<(), CoreError> {
    let previous_records = match load_records(store) {
        Ok(records) => records,
        Err(e) => {
            warn!("replacing unreadable holdings blob: {e}");
            if let Some(bytes) = store.get(PORTFOLIO_STORAGE_KEY)? {
                store.put(CORRUPT_PORTFOLIO_KEY, &bytes)?;
            }
            Vec::new()
        }
    };
    let previous: HashMap<String, PersistedHolding> = previous_records
        .into_iter()
        .map(|r| (normalize_symbol(&r.ticker), r))
        .collect();

    let records: Vec<PersistedHolding> = ledger
        .holdings()
        .iter()
        .map(|holding| {
            let prev = previous.get(&holding.symbol);
            let quote = quotes.get(&holding.symbol);

            let name = quote
                .map(|q| q.short_name.clone())
                .filter(|n| !n.is_empty())
                .or_else(|| prev.map(|p| p.name.clone()))
                .unwrap_or_else(|| holding.symbol.clone());
            let kind = prev
                .map(|p| p.kind.clone())
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| DEFAULT_HOLDING_TYPE.to_string());

            PersistedHolding {
                ticker: holding.symbol.clone(),
                name,
                price: quote.map(|q| q.price).or(prev.map(|p| p.price)).unwrap_or(0.0),
                shares: i64::try_from(holding.shares).unwrap_or(i64::MAX),
                change: quote.map(|q| q.change).or(prev.map(|p| p.change)).unwrap_or(0.0),
                change_percent: quote
                    .map(|q| q.change_percent)
                    .or(prev.map(|p| p.change_percent))
                    .unwrap_or(0.0),
                kind,
            }
        })
        .collect();

    let bytes = serde_json::to_vec(&records)
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize holdings: {e}")))?;
    store.put(PORTFOLIO_STORAGE_KEY, &bytes)?;
    debug!(holdings = records.len(), "holdings saved to local storage");
    Ok(())
}
