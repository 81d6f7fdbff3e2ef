use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::analytics::{Allocation, PortfolioSnapshot};
use crate::models::portfolio::Holding;
use crate::models::price::normalize_symbol;
use crate::models::quote::Quote;

/// Holds the user's positions and values them against current quotes.
///
/// Pure business logic with no I/O. Holdings keep insertion
/// order, which is also the order of the allocation list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioLedger {
    holdings: Vec<Holding>,
}

impl PortfolioLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from stored holdings, validating each one exactly
    /// like `add_holding`. All-or-nothing.
    pub fn from_holdings(holdings: Vec<Holding>) -> Result<Self, CoreError> {
        let mut ledger = Self::new();
        for holding in holdings {
            let shares = i64::try_from(holding.shares).map_err(|_| CoreError::InvalidShares {
                symbol: holding.symbol.clone(),
                shares: i64::MAX,
            })?;
            ledger.add_holding(&holding.symbol, shares)?;
        }
        Ok(ledger)
    }

    /// Add a new position.
    ///
    /// Rules:
    /// - Symbol must not be empty
    /// - Shares must be positive
    /// - A symbol already held is rejected, not merged
    ///
    /// On error the ledger is unchanged.
    pub fn add_holding(&mut self, symbol: &str, shares: i64) -> Result<(), CoreError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(CoreError::ValidationError(
                "Please enter a ticker symbol".into(),
            ));
        }
        if shares <= 0 {
            return Err(CoreError::InvalidShares { symbol, shares });
        }
        if self.contains(&symbol) {
            return Err(CoreError::DuplicateSymbol(symbol));
        }

        self.holdings.push(Holding {
            symbol,
            shares: shares as u64,
        });
        Ok(())
    }

    /// Remove a position. Returns whether it was held; not holding it is not an error.
    pub fn remove_holding(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let before = self.holdings.len();
        self.holdings.retain(|h| h.symbol != symbol);
        self.holdings.len() != before
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn get(&self, symbol: &str) -> Option<&Holding> {
        let symbol = normalize_symbol(symbol);
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Value the portfolio against `quotes` (keyed by uppercased symbol).
    pub fn snapshot(&self, quotes: &HashMap<String, Quote>) -> PortfolioSnapshot {
        Self::value(&self.holdings, quotes)
    }

    /// Value an arbitrary set of holdings.
    ///
    /// - `total_value` = Σ shares × price
    /// - `day_change_value` = Σ shares × change
    /// - `percent_of_total` = value / total_value, or 0 when the total is 0
    ///
    /// Symbols in the result are uppercased whatever the caller passed. A
    /// holding without a usable quote is listed in `stale_symbols` and left
    /// out of every total; it never blanks the rest of the snapshot.
    pub fn value(holdings: &[Holding], quotes: &HashMap<String, Quote>) -> PortfolioSnapshot {
        let mut snapshot = PortfolioSnapshot::empty();

        for holding in holdings {
            let symbol = normalize_symbol(&holding.symbol);
            let quote = quotes
                .get(&symbol)
                .or_else(|| quotes.get(&holding.symbol))
                .filter(|q| q.is_valid());

            let Some(quote) = quote else {
                snapshot.stale_symbols.push(symbol);
                continue;
            };

            let shares = holding.shares as f64;
            let value = shares * quote.price;
            snapshot.total_value += value;
            snapshot.day_change_value += shares * quote.change;
            snapshot.allocations.push(Allocation {
                symbol,
                shares: holding.shares,
                price: quote.price,
                value,
                percent_of_total: 0.0, // filled below
            });
        }

        let total = snapshot.total_value;
        for allocation in &mut snapshot.allocations {
            allocation.percent_of_total = if total > 0.0 {
                allocation.value / total
            } else {
                0.0
            };
        }

        snapshot
    }
}
