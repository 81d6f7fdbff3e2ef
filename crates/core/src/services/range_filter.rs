use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::SymbolHistory;

/// Cuts a history down to a rolling lookback window.
///
/// Pure: no I/O, no caching.
pub struct RangeFilter;

impl RangeFilter {
    pub fn new() -> Self {
        Self
    }

    /// Points dated on or after `today - days`, in order.
    pub fn filter(&self, history: &SymbolHistory, days: u32) -> Result<SymbolHistory, CoreError> {
        let today = chrono::Utc::now().date_naive();
        self.filter_as_of(history, days, today)
    }

    /// Same as `filter`, with an explicit reference date.
    ///
    /// A window wider than the history returns it whole; an empty history
    /// returns an empty one. Filtering twice with the same arguments is a no-op.
    pub fn filter_as_of(
        &self,
        history: &SymbolHistory,
        days: u32,
        as_of: NaiveDate,
    ) -> Result<SymbolHistory, CoreError> {
        let cutoff = Self::cutoff(days, as_of)?;
        Ok(history.suffix_from(cutoff))
    }

    /// First date included in a `days` window ending on `as_of`.
    ///
    /// Any positive window is accepted; one reaching past the calendar's
    /// first date starts at `NaiveDate::MIN`.
    pub fn cutoff(days: u32, as_of: NaiveDate) -> Result<NaiveDate, CoreError> {
        if days == 0 {
            return Err(CoreError::ValidationError(
                "Range must be at least 1 day".into(),
            ));
        }
        Ok(as_of
            .checked_sub_signed(chrono::Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN))
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self::new()
    }
}
