use serde::{Deserialize, Serialize};

/// Portfolio valuation derived from holdings × current quotes.
///
/// Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Σ shares × price over holdings that have a quote
    pub total_value: f64,

    /// Σ shares × change over holdings that have a quote
    pub day_change_value: f64,

    /// Per-holding breakdown, in holding order. Stale holdings are not listed.
    pub allocations: Vec<Allocation>,

    /// Held symbols with no quote available; excluded from all totals
    pub stale_symbols: Vec<String>,
}

impl PortfolioSnapshot {
    pub fn empty() -> Self {
        Self {
            total_value: 0.0,
            day_change_value: 0.0,
            allocations: Vec::new(),
            stale_symbols: Vec::new(),
        }
    }

    /// Allocation entry for `symbol`, if it was valued.
    pub fn allocation(&self, symbol: &str) -> Option<&Allocation> {
        let upper = symbol.to_uppercase();
        self.allocations.iter().find(|a| a.symbol == upper)
    }

    pub fn is_stale(&self, symbol: &str) -> bool {
        let upper = symbol.to_uppercase();
        self.stale_symbols.contains(&upper)
    }
}

/// One holding's share of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub symbol: String,

    pub shares: u64,

    /// Quote price used for the valuation
    pub price: f64,

    /// shares × price
    pub value: f64,

    /// value / total_value as a fraction in [0, 1]; 0 when the total is 0
    pub percent_of_total: f64,
}
