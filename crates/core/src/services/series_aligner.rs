use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::errors::CoreError;
use crate::models::chart::AlignedRow;
use crate::models::price::{normalize_symbol, SymbolHistory};

/// Merges per-symbol histories onto one shared date axis for a multi-line chart.
///
/// Missing data stays missing: a symbol with no point on a date gets `None`
/// for that row. No zero-fill, no forward-fill.
pub struct SeriesAligner;

impl SeriesAligner {
    pub fn new() -> Self {
        Self
    }

    /// Align `histories` for `symbols`.
    ///
    /// 1. Collect every date present in any requested symbol's history.
    /// 2. Sort ascending (histories may arrive in any fetch order).
    /// 3. For each date, look each symbol up in a date → price index built
    ///    once per symbol: O(dates × symbols).
    ///
    /// Symbols are case-normalized and deduplicated (first occurrence wins the
    /// column position). A symbol with no history gets a column of `None`.
    pub fn align(
        &self,
        symbols: &[String],
        histories: &HashMap<String, SymbolHistory>,
    ) -> Result<Vec<AlignedRow>, CoreError> {
        let mut columns: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let key = normalize_symbol(symbol);
            if !key.is_empty() && !columns.contains(&key) {
                columns.push(key);
            }
        }

        let by_symbol: HashMap<String, &SymbolHistory> = histories
            .iter()
            .map(|(symbol, history)| (normalize_symbol(symbol), history))
            .collect();

        // Index each requested series by date
        let indexes: Vec<HashMap<NaiveDate, f64>> = columns
            .iter()
            .map(|symbol| {
                by_symbol
                    .get(symbol)
                    .map(|history| history.points().iter().map(|p| (p.date, p.price)).collect())
                    .unwrap_or_default()
            })
            .collect();

        let dates: BTreeSet<NaiveDate> = indexes
            .iter()
            .flat_map(|index| index.keys().copied())
            .collect();

        let mut rows = Vec::with_capacity(dates.len());
        for date in dates {
            let values: Vec<(String, Option<f64>)> = columns
                .iter()
                .zip(&indexes)
                .map(|(symbol, index)| (symbol.clone(), index.get(&date).copied()))
                .collect();

            let row = AlignedRow { date, values };
            // Every date came from some series, so at least one value must be present
            if row.present_count() == 0 {
                return Err(CoreError::AlignmentInconsistency {
                    date: date.to_string(),
                });
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

impl Default for SeriesAligner {
    fn default() -> Self {
        Self::new()
    }
}
