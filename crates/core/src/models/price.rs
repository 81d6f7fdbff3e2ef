use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// A single price data point (date → closing price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Ordered daily price history of one symbol.
///
/// Dates are strictly increasing and unique. Histories held by the
/// `SymbolStore` are never mutated in place; a refresh replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolHistory {
    /// Ticker symbol, uppercased (e.g., "AAPL")
    pub symbol: String,

    /// Points sorted ascending by date, one per date
    points: Vec<PricePoint>,
}

impl SymbolHistory {
    /// An empty history for `symbol`.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: normalize_symbol(&symbol.into()),
            points: Vec::new(),
        }
    }

    /// Build a history from upstream points in any order.
    ///
    /// Points are sorted by date; when a date repeats, the last point for it wins.
    /// Prices must be finite and non-negative.
    pub fn from_points(
        symbol: impl Into<String>,
        points: Vec<PricePoint>,
    ) -> Result<Self, CoreError> {
        let symbol = normalize_symbol(&symbol.into());

        if let Some(bad) = points.iter().find(|p| !p.price.is_finite() || p.price < 0.0) {
            return Err(CoreError::ValidationError(format!(
                "Invalid price for {symbol} on {}: {} (must be finite and non-negative)",
                bad.date, bad.price
            )));
        }

        // Stable sort keeps upstream order among equal dates, so the last one wins below.
        let mut points = points;
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Ok(Self {
            symbol,
            points: deduped,
        })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Most recent price, if any.
    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Price on an exact date. Binary search (O(log n)).
    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].price)
    }

    /// The suffix of points dated on or after `cutoff`, as a new history.
    pub fn suffix_from(&self, cutoff: NaiveDate) -> SymbolHistory {
        let start = self
            .points
            .binary_search_by_key(&cutoff, |p| p.date)
            .unwrap_or_else(|pos| pos);
        SymbolHistory {
            symbol: self.symbol.clone(),
            points: self.points[start..].to_vec(),
        }
    }
}

/// Symbol keys are case-insensitive; everything is stored uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
