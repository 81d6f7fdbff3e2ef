pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use models::{
    chart::TimeRange,
    settings::Settings,
    view::{ViewOutcome, ViewState},
};
use providers::registry::ProviderRegistry;
use services::{
    dashboard_service::DashboardAggregator, portfolio_ledger::PortfolioLedger,
    symbol_store::SymbolStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use storage::{cache_snapshot, holdings, kv::KeyValueStore};
use tracing::info;

use errors::CoreError;

/// Main entry point for the stock dashboard core library.
/// One instance per application session: it owns the symbol cache and the
/// active view, and is torn down with `reset()` on logout.
#[must_use]
pub struct StockDashboard {
    store: Arc<SymbolStore>,
    aggregator: DashboardAggregator,
}

impl std::fmt::Debug for StockDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockDashboard")
            .field("providers", &self.store.provider_names())
            .field("symbols", &self.aggregator.symbols())
            .field("range_days", &self.aggregator.range_days())
            .field("holdings", &self.aggregator.ledger().len())
            .finish()
    }
}

impl StockDashboard {
    /// Create a session with the default providers for `settings`.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        let registry = ProviderRegistry::new_with_defaults(&settings);
        Ok(Self::build(settings, registry))
    }

    /// Create a session over an explicit set of providers (tests, offline use).
    pub fn with_registry(settings: Settings, registry: ProviderRegistry) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self::build(settings, registry))
    }

    #[must_use]
    pub fn aggregator(&self) -> &DashboardAggregator {
        &self.aggregator
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SymbolStore> {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.aggregator.settings()
    }

    // ── View ────────────────────────────────────────────────────────

    /// Chart another symbol. Returns `false` if it was already charted.
    pub fn add_symbol(&self, symbol: &str) -> Result<bool, CoreError> {
        self.aggregator.add_symbol(symbol)
    }

    pub fn remove_symbol(&self, symbol: &str) -> bool {
        self.aggregator.remove_symbol(symbol)
    }

    pub fn set_range(&self, range: TimeRange) {
        self.aggregator.set_range(range);
    }

    pub fn add_holding(&self, symbol: &str, shares: i64) -> Result<(), CoreError> {
        self.aggregator.add_holding(symbol, shares)
    }

    pub fn remove_holding(&self, symbol: &str) -> bool {
        self.aggregator.remove_holding(symbol)
    }

    #[must_use]
    pub fn holdings(&self) -> PortfolioLedger {
        self.aggregator.ledger()
    }

    #[must_use]
    pub fn state(&self) -> ViewState {
        self.aggregator.state()
    }

    /// Resolve the current view, using cached data where present.
    pub async fn refresh(&self) -> Result<ViewOutcome, CoreError> {
        self.aggregator.refresh().await
    }

    /// Resolve the current view with every symbol refetched from upstream.
    pub async fn reload(&self) -> Result<ViewOutcome, CoreError> {
        self.aggregator.reload().await
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Restore holdings and the symbol cache from local storage.
    /// Missing keys leave the session empty.
    pub async fn load_from(&self, kv: &dyn KeyValueStore) -> Result<(), CoreError> {
        let ledger = holdings::load_holdings(kv)?;
        let restored = cache_snapshot::load_cache(&self.store, kv).await?;
        info!(
            holdings = ledger.len(),
            histories = restored,
            "dashboard session restored"
        );
        self.aggregator.replace_ledger(ledger);
        Ok(())
    }

    /// Write holdings (with their latest cached quotes) and the symbol cache
    /// to local storage.
    pub async fn save_to(&self, kv: &dyn KeyValueStore) -> Result<(), CoreError> {
        let ledger = self.aggregator.ledger();
        let mut quotes = HashMap::new();
        for symbol in ledger.symbols() {
            if let Some(quote) = self.store.cached_quote(&symbol).await {
                quotes.insert(symbol, quote);
            }
        }
        holdings::save_holdings(kv, &ledger, &quotes)?;
        cache_snapshot::save_cache(&self.store, kv).await?;
        info!(holdings = ledger.len(), "dashboard session saved");
        Ok(())
    }

    /// Tear the session down: cache cleared, view `Idle`, holdings emptied.
    pub async fn reset(&self) {
        self.store.clear().await;
        self.aggregator.reset();
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(settings: Settings, registry: ProviderRegistry) -> Self {
        let store = Arc::new(SymbolStore::new(registry, &settings));
        let aggregator = DashboardAggregator::new(Arc::clone(&store), settings);
        Self { store, aggregator }
    }
}
