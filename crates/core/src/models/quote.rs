use serde::{Deserialize, Serialize};

/// Point-in-time market statistics for one symbol.
///
/// Field names follow the proxy's summary payload (camelCase on the wire).
/// Only `price`, `change` and `change_percent` are guaranteed; upstream may
/// omit everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker symbol, uppercased
    pub symbol: String,

    /// Display name (e.g., "Apple Inc."); empty when upstream has none
    #[serde(default)]
    pub short_name: String,

    /// Last traded price
    pub price: f64,

    /// Absolute change since the previous close
    pub change: f64,

    /// Percentage change since the previous close
    pub change_percent: f64,

    #[serde(default)]
    pub market_cap: Option<f64>,

    #[serde(default)]
    pub fifty_two_week_high: Option<f64>,

    #[serde(default)]
    pub fifty_two_week_low: Option<f64>,

    #[serde(default)]
    pub dividend_yield: Option<f64>,

    /// Trailing P/E
    #[serde(default)]
    pub pe_ratio: Option<f64>,
}

impl Quote {
    /// A quote carrying only the required fields.
    pub fn new(symbol: impl Into<String>, price: f64, change: f64, change_percent: f64) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            short_name: String::new(),
            price,
            change,
            change_percent,
            market_cap: None,
            fifty_two_week_high: None,
            fifty_two_week_low: None,
            dividend_yield: None,
            pe_ratio: None,
        }
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = short_name.into();
        self
    }

    /// Whether the required numeric fields are usable for valuation.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite()
            && self.price >= 0.0
            && self.change.is_finite()
            && self.change_percent.is_finite()
    }

    /// Whether the day's change is non-negative (drives up/down styling).
    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}
