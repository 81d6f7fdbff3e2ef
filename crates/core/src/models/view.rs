use serde::Serialize;

use super::analytics::PortfolioSnapshot;
use super::chart::AlignedRow;
use super::quote::Quote;

/// Everything the presentation layer needs to render one dashboard view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// Chart rows, ascending by date
    pub rows: Vec<AlignedRow>,

    /// Summary cards for the charted symbols that resolved, in symbol order
    pub quotes: Vec<Quote>,

    /// Valuation of the holdings passed to the build
    pub portfolio: PortfolioSnapshot,

    /// Charted symbols whose history resolved, in symbol order
    pub resolved_symbols: Vec<String>,

    /// Symbols with at least one failed fetch, in request order
    pub failed_symbols: Vec<String>,

    /// Lookback window the rows were filtered to
    pub range_days: u32,
}

/// Lifecycle of a dashboard view.
///
/// `Idle → Loading → Ready | PartialError`; any input change moves back to `Loading`.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading,
    Ready(DashboardView),
    /// No requested symbol could be resolved. Calling `refresh()` again retries.
    PartialError {
        message: String,
        failed_symbols: Vec<String>,
    },
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn view(&self) -> Option<&DashboardView> {
        match self {
            ViewState::Ready(view) => Some(view),
            _ => None,
        }
    }
}

/// What happened to a `refresh()` request.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    /// The result was applied and the view is now in this state.
    Applied(ViewState),
    /// A newer request started while this one was in flight; its result was dropped.
    Superseded,
}
