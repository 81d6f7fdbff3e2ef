use serde::{Deserialize, Serialize};

/// A position in the portfolio: how many shares of one symbol are held.
///
/// Unique per symbol inside a `PortfolioLedger`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol, uppercased
    pub symbol: String,

    /// Number of shares, always > 0
    pub shares: u64,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, shares: u64) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            shares,
        }
    }
}
