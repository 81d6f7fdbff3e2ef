use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::CoreError;

/// One row of a multi-line chart: a date plus one value per symbol.
///
/// The core generates these and the frontend only renders them. A `None` value
/// means the symbol has no data on that date and must be drawn as a gap,
/// never as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    /// The date for this row
    pub date: NaiveDate,

    /// `(symbol, value)` pairs in the requested symbol order
    pub values: Vec<(String, Option<f64>)>,
}

impl AlignedRow {
    /// Value for `symbol` on this row. `None` for "no data" and for symbols
    /// that are not part of the row at all.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        let upper = symbol.to_uppercase();
        self.values
            .iter()
            .find(|(s, _)| *s == upper)
            .and_then(|(_, v)| *v)
    }

    /// Whether `symbol` is a column of this row and explicitly has no data.
    pub fn is_gap(&self, symbol: &str) -> bool {
        let upper = symbol.to_uppercase();
        self.values
            .iter()
            .any(|(s, v)| *s == upper && v.is_none())
    }

    /// Number of symbols with data on this row.
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|(_, v)| v.is_some()).count()
    }
}

/// Serializes as a flat object: `{ "date": "2025-01-02", "AAPL": 10.0, "MSFT": null }`.
impl Serialize for AlignedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("date", &self.date)?;
        for (symbol, value) in &self.values {
            map.serialize_entry(symbol, value)?;
        }
        map.end()
    }
}

/// Preset lookback windows offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        TimeRange::OneWeek,
        TimeRange::OneMonth,
        TimeRange::SixMonths,
        TimeRange::OneYear,
    ];

    /// Lookback window in calendar days.
    pub fn days(self) -> u32 {
        match self {
            TimeRange::OneWeek => 7,
            TimeRange::OneMonth => 30,
            TimeRange::SixMonths => 182,
            TimeRange::OneYear => 365,
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::OneMonth
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeRange::OneWeek => write!(f, "1W"),
            TimeRange::OneMonth => write!(f, "1M"),
            TimeRange::SixMonths => write!(f, "6M"),
            TimeRange::OneYear => write!(f, "1Y"),
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1W" => Ok(TimeRange::OneWeek),
            "1M" => Ok(TimeRange::OneMonth),
            "6M" => Ok(TimeRange::SixMonths),
            "1Y" => Ok(TimeRange::OneYear),
            other => Err(CoreError::ValidationError(format!(
                "Unknown time range '{other}' (expected 1W, 1M, 6M or 1Y)"
            ))),
        }
    }
}
