use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::errors::CoreError;
use crate::models::chart::TimeRange;
use crate::models::portfolio::Holding;
use crate::models::price::{normalize_symbol, SymbolHistory};
use crate::models::quote::Quote;
use crate::models::settings::Settings;
use crate::models::view::{DashboardView, ViewOutcome, ViewState};
use crate::services::portfolio_ledger::PortfolioLedger;
use crate::services::range_filter::RangeFilter;
use crate::services::series_aligner::SeriesAligner;
use crate::services::symbol_store::SymbolStore;

/// What one symbol's fetches produced.
struct SymbolFetch {
    symbol: String,
    /// `None` when the symbol is only held, not charted
    history: Option<Result<Arc<SymbolHistory>, CoreError>>,
    quote: Result<Quote, CoreError>,
}

/// Inputs of the active view.
#[derive(Debug, Clone)]
struct ViewInputs {
    symbols: Vec<String>,
    range_days: u32,
    ledger: PortfolioLedger,
}

/// Builds dashboard view-models and drives the view lifecycle.
///
/// `build_view` is the stateless core: fetch (through the shared store),
/// filter, align, value. The rest of the API is the per-view controller:
/// input changes move the view to `Loading`, `refresh()` resolves it to
/// `Ready` or `PartialError`. Requests are last-request-wins; a build whose
/// inputs changed while it was in flight is discarded on arrival.
pub struct DashboardAggregator {
    store: Arc<SymbolStore>,
    settings: Settings,
    range_filter: RangeFilter,
    aligner: SeriesAligner,
    inputs: Mutex<ViewInputs>,
    state: Mutex<ViewState>,
    generation: AtomicU64,
}

impl DashboardAggregator {
    pub fn new(store: Arc<SymbolStore>, settings: Settings) -> Self {
        let inputs = ViewInputs {
            symbols: Vec::new(),
            range_days: settings.default_range.days(),
            ledger: PortfolioLedger::new(),
        };
        Self {
            store,
            settings,
            range_filter: RangeFilter::new(),
            aligner: SeriesAligner::new(),
            inputs: Mutex::new(inputs),
            state: Mutex::new(ViewState::Idle),
            generation: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<SymbolStore> {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Stateless build ─────────────────────────────────────────────

    /// Build the view-model for `symbols` over the last `days` days, valuing
    /// `holdings` against current quotes.
    ///
    /// Histories and quotes for every charted and held symbol are fetched
    /// concurrently. One symbol's failure is recorded in `failed_symbols` and
    /// never cancels the others.
    pub async fn build_view(
        &self,
        symbols: &[String],
        days: u32,
        holdings: &[Holding],
    ) -> Result<DashboardView, CoreError> {
        self.build(symbols, days, holdings, false).await
    }

    async fn build(
        &self,
        symbols: &[String],
        days: u32,
        holdings: &[Holding],
        force_refresh: bool,
    ) -> Result<DashboardView, CoreError> {
        let chart_symbols = self.checked_symbols(symbols)?;
        let today = chrono::Utc::now().date_naive();
        // Validate the range before any network traffic
        RangeFilter::cutoff(days, today)?;

        let mut all_symbols = chart_symbols.clone();
        for holding in holdings {
            let symbol = normalize_symbol(&holding.symbol);
            if !all_symbols.contains(&symbol) {
                all_symbols.push(symbol);
            }
        }

        let fetches = join_all(all_symbols.iter().map(|symbol| {
            let charted = chart_symbols.contains(symbol);
            self.resolve(symbol, charted, force_refresh)
        }))
        .await;

        let mut filtered: HashMap<String, SymbolHistory> = HashMap::new();
        let mut quotes: HashMap<String, Quote> = HashMap::new();
        let mut resolved_symbols = Vec::new();
        let mut failed_symbols = Vec::new();

        for fetch in fetches {
            let mut failed = false;

            if let Some(history) = fetch.history {
                match history {
                    Ok(history) => {
                        let window = self.range_filter.filter_as_of(&history, days, today)?;
                        filtered.insert(fetch.symbol.clone(), window);
                        resolved_symbols.push(fetch.symbol.clone());
                    }
                    Err(e) => {
                        Self::tolerate(&fetch.symbol, e)?;
                        failed = true;
                    }
                }
            }

            match fetch.quote {
                Ok(quote) => {
                    quotes.insert(fetch.symbol.clone(), quote);
                }
                Err(e) => {
                    Self::tolerate(&fetch.symbol, e)?;
                    failed = true;
                }
            }

            if failed {
                failed_symbols.push(fetch.symbol);
            }
        }

        let rows = self.aligner.align(&chart_symbols, &filtered)?;

        let summary_quotes: Vec<Quote> = chart_symbols
            .iter()
            .filter_map(|symbol| quotes.get(symbol).cloned())
            .collect();

        let portfolio = PortfolioLedger::value(holdings, &quotes);

        Ok(DashboardView {
            rows,
            quotes: summary_quotes,
            portfolio,
            resolved_symbols,
            failed_symbols,
            range_days: days,
        })
    }

    async fn resolve(&self, symbol: &str, charted: bool, force_refresh: bool) -> SymbolFetch {
        let quote_fut = self.store.get_quote(symbol, force_refresh);
        let (history, quote) = if charted {
            let history_fut = self.store.get_history(symbol, force_refresh);
            let (history, quote) = tokio::join!(history_fut, quote_fut);
            (Some(history), quote)
        } else {
            (None, quote_fut.await)
        };

        SymbolFetch {
            symbol: symbol.to_string(),
            history,
            quote,
        }
    }

    /// Per-symbol fetch failures are tolerated; anything else aborts the build.
    fn tolerate(symbol: &str, error: CoreError) -> Result<(), CoreError> {
        if error.is_fetch_failure() {
            warn!(symbol, "tolerating fetch failure: {error}");
            Ok(())
        } else {
            Err(error)
        }
    }

    /// Normalize, deduplicate and cap the charted symbol list.
    fn checked_symbols(&self, symbols: &[String]) -> Result<Vec<String>, CoreError> {
        let mut checked: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = normalize_symbol(symbol);
            if !symbol.is_empty() && !checked.contains(&symbol) {
                checked.push(symbol);
            }
        }
        if checked.len() > self.settings.max_symbols {
            return Err(CoreError::TooManySymbols {
                requested: checked.len(),
                max: self.settings.max_symbols,
            });
        }
        Ok(checked)
    }

    // ── View controller ─────────────────────────────────────────────

    /// Current lifecycle state of the view.
    pub fn state(&self) -> ViewState {
        lock(&self.state).clone()
    }

    pub fn symbols(&self) -> Vec<String> {
        lock(&self.inputs).symbols.clone()
    }

    pub fn range_days(&self) -> u32 {
        lock(&self.inputs).range_days
    }

    /// A copy of the view's holdings.
    pub fn ledger(&self) -> PortfolioLedger {
        lock(&self.inputs).ledger.clone()
    }

    /// Replace the charted symbols.
    pub fn set_symbols(&self, symbols: &[String]) -> Result<(), CoreError> {
        let checked = self.checked_symbols(symbols)?;
        lock(&self.inputs).symbols = checked;
        self.inputs_changed("symbols replaced");
        Ok(())
    }

    /// Add a symbol to the chart. Returns `false` if it was already charted.
    pub fn add_symbol(&self, symbol: &str) -> Result<bool, CoreError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(CoreError::ValidationError("Symbol must not be empty".into()));
        }
        {
            let mut inputs = lock(&self.inputs);
            if inputs.symbols.contains(&symbol) {
                return Ok(false);
            }
            if inputs.symbols.len() >= self.settings.max_symbols {
                return Err(CoreError::TooManySymbols {
                    requested: inputs.symbols.len() + 1,
                    max: self.settings.max_symbols,
                });
            }
            inputs.symbols.push(symbol);
        }
        self.inputs_changed("symbol added");
        Ok(true)
    }

    /// Remove a symbol from the chart. Its cache entries stay, so re-adding is free.
    pub fn remove_symbol(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let removed = {
            let mut inputs = lock(&self.inputs);
            let before = inputs.symbols.len();
            inputs.symbols.retain(|s| *s != symbol);
            inputs.symbols.len() != before
        };
        if removed {
            self.inputs_changed("symbol removed");
        }
        removed
    }

    pub fn set_range(&self, range: TimeRange) {
        lock(&self.inputs).range_days = range.days();
        self.inputs_changed("range changed");
    }

    /// Set an arbitrary lookback window in days.
    pub fn set_range_days(&self, days: u32) -> Result<(), CoreError> {
        RangeFilter::cutoff(days, chrono::Utc::now().date_naive())?;
        lock(&self.inputs).range_days = days;
        self.inputs_changed("range changed");
        Ok(())
    }

    pub fn add_holding(&self, symbol: &str, shares: i64) -> Result<(), CoreError> {
        lock(&self.inputs).ledger.add_holding(symbol, shares)?;
        self.inputs_changed("holding added");
        Ok(())
    }

    pub fn remove_holding(&self, symbol: &str) -> bool {
        let removed = lock(&self.inputs).ledger.remove_holding(symbol);
        if removed {
            self.inputs_changed("holding removed");
        }
        removed
    }

    /// Swap in a whole ledger (e.g., one loaded from local storage).
    pub fn replace_ledger(&self, ledger: PortfolioLedger) {
        lock(&self.inputs).ledger = ledger;
        self.inputs_changed("holdings replaced");
    }

    /// Resolve the view from cache/upstream.
    pub async fn refresh(&self) -> Result<ViewOutcome, CoreError> {
        self.run_request(false).await
    }

    /// Like `refresh`, but refetch every symbol from upstream.
    pub async fn reload(&self) -> Result<ViewOutcome, CoreError> {
        self.run_request(true).await
    }

    /// Back to an empty `Idle` view; any in-flight request is discarded.
    pub fn reset(&self) {
        {
            let mut inputs = lock(&self.inputs);
            inputs.symbols.clear();
            inputs.range_days = self.settings.default_range.days();
            inputs.ledger = PortfolioLedger::new();
        }
        let mut state = lock(&self.state);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = ViewState::Idle;
        info!("dashboard view reset");
    }

    async fn run_request(&self, force_refresh: bool) -> Result<ViewOutcome, CoreError> {
        let (ticket, inputs) = {
            let inputs = lock(&self.inputs).clone();
            let mut state = lock(&self.state);
            let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = ViewState::Loading;
            (ticket, inputs)
        };

        info!(
            ticket,
            symbols = inputs.symbols.len(),
            days = inputs.range_days,
            "building dashboard view"
        );

        let result = self
            .build(
                &inputs.symbols,
                inputs.range_days,
                inputs.ledger.holdings(),
                force_refresh,
            )
            .await;

        let mut state = lock(&self.state);
        if self.generation.load(Ordering::SeqCst) != ticket {
            warn!(ticket, "dashboard view superseded, discarding result");
            return Ok(ViewOutcome::Superseded);
        }

        let next = match result {
            Ok(view) if !inputs.symbols.is_empty() && view.resolved_symbols.is_empty() => {
                ViewState::PartialError {
                    message: format!(
                        "No data could be loaded for {}",
                        inputs.symbols.join(", ")
                    ),
                    failed_symbols: view.failed_symbols,
                }
            }
            Ok(view) => ViewState::Ready(view),
            Err(e) => {
                *state = ViewState::PartialError {
                    message: e.to_string(),
                    failed_symbols: Vec::new(),
                };
                return Err(e);
            }
        };

        match &next {
            ViewState::Ready(view) => info!(
                ticket,
                rows = view.rows.len(),
                failed = view.failed_symbols.len(),
                "dashboard view ready"
            ),
            _ => warn!(ticket, "dashboard view has no resolvable symbols"),
        }

        *state = next.clone();
        Ok(ViewOutcome::Applied(next))
    }

    /// Any input change invalidates the in-flight request and the shown view.
    fn inputs_changed(&self, reason: &str) {
        let mut state = lock(&self.state);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = ViewState::Loading;
        info!("dashboard inputs changed: {reason}");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}
