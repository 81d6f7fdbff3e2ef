use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::price::{normalize_symbol, SymbolHistory};
use crate::models::quote::Quote;
use crate::models::settings::Settings;
use crate::providers::registry::ProviderRegistry;
use crate::providers::traits::MarketDataProvider;

/// Snapshot format version written by `export_snapshot`.
const SNAPSHOT_VERSION: u16 = 1;

/// How upstream calls are made: per-attempt timeout, retries, lookback.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// History fetches reach this many days back from today.
    pub lookback_days: u32,
}

impl From<&Settings> for FetchPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.fetch_timeout_secs),
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            lookback_days: settings.history_lookback_days,
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

/// Published once by the caller that runs an upstream fetch.
type Outcome<T> = Option<Result<T, CoreError>>;

/// Upstream fetches currently running, one per symbol, for one cache kind.
///
/// The first caller for a symbol becomes the leader and runs the fetch; later
/// callers subscribe to its outcome, success or failure alike.
struct InFlight<T> {
    slots: Mutex<HashMap<String, watch::Receiver<Outcome<T>>>>,
}

enum Join<'a, T> {
    Leader(LeaderSlot<'a, T>),
    Follower(watch::Receiver<Outcome<T>>),
}

impl<T: Clone> InFlight<T> {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn join(&self, key: &str) -> Join<'_, T> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rx) = slots.get(key) {
            return Join::Follower(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        slots.insert(key.to_string(), rx);
        Join::Leader(LeaderSlot {
            in_flight: self,
            key: key.to_string(),
            tx,
        })
    }

    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held by the leader for the duration of a fetch. Dropping it (normally or
/// because the leader's future was cancelled) frees the slot.
struct LeaderSlot<'a, T> {
    in_flight: &'a InFlight<T>,
    key: String,
    tx: watch::Sender<Outcome<T>>,
}

impl<T: Clone> LeaderSlot<'_, T> {
    fn publish(self, outcome: &Result<T, CoreError>) {
        self.tx.send_replace(Some(outcome.clone()));
    }
}

impl<T> Drop for LeaderSlot<'_, T> {
    fn drop(&mut self) {
        self.in_flight
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// The leader's outcome, or `None` if it was dropped before publishing.
async fn wait_for_leader<T: Clone>(mut rx: watch::Receiver<Outcome<T>>) -> Outcome<T> {
    let outcome = rx.wait_for(Option::is_some).await.ok()?;
    Option::clone(&outcome)
}

#[derive(Serialize, Deserialize)]
struct CacheSnapshot {
    version: u16,
    histories: Vec<SymbolHistory>,
    quotes: Vec<Quote>,
}

/// Per-session cache of symbol histories and quotes with get-or-fetch semantics.
///
/// Cache strategy:
/// - A symbol's history and quote are cached independently, keyed by the
///   uppercased symbol.
/// - Upstream is only called on a cache miss or a forced refresh, so changing
///   the time range of a displayed symbol never refetches.
/// - A failed fetch leaves the previous entry untouched and surfaces `Fetch`.
/// - Concurrent misses for the same symbol and kind share one upstream call:
///   the first caller fetches and every caller that arrives meanwhile receives
///   its result, error included. Failures are never cached, so the next
///   request after a failed one goes upstream again.
///
/// The store is `Send + Sync`; share it between views with `Arc`.
pub struct SymbolStore {
    registry: ProviderRegistry,
    policy: FetchPolicy,
    histories: tokio::sync::RwLock<HashMap<String, Arc<SymbolHistory>>>,
    quotes: tokio::sync::RwLock<HashMap<String, Quote>>,
    history_fetches: InFlight<Arc<SymbolHistory>>,
    quote_fetches: InFlight<Quote>,
    upstream_calls: AtomicUsize,
}

impl SymbolStore {
    pub fn new(registry: ProviderRegistry, settings: &Settings) -> Self {
        Self::with_policy(registry, FetchPolicy::from(settings))
    }

    pub fn with_policy(registry: ProviderRegistry, policy: FetchPolicy) -> Self {
        Self {
            registry,
            policy,
            histories: tokio::sync::RwLock::new(HashMap::new()),
            quotes: tokio::sync::RwLock::new(HashMap::new()),
            history_fetches: InFlight::new(),
            quote_fetches: InFlight::new(),
            upstream_calls: AtomicUsize::new(0),
        }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Get a symbol's price history.
    ///
    /// 1. Unless `force_refresh`, return the cached history if present.
    /// 2. Otherwise fetch from upstream, replace the cache entry, and return it.
    pub async fn get_history(
        &self,
        symbol: &str,
        force_refresh: bool,
    ) -> Result<Arc<SymbolHistory>, CoreError> {
        let key = Self::checked_key(symbol)?;

        if !force_refresh {
            if let Some(history) = self.histories.read().await.get(&key) {
                debug!(symbol = %key, "history cache hit");
                return Ok(Arc::clone(history));
            }
        }

        loop {
            match self.history_fetches.join(&key) {
                Join::Follower(rx) => {
                    debug!(symbol = %key, "history fetch coalesced");
                    if let Some(outcome) = wait_for_leader(rx).await {
                        return outcome;
                    }
                }
                Join::Leader(slot) => {
                    // A fetch may have completed between the cache check and the join
                    let cached = if force_refresh {
                        None
                    } else {
                        self.histories.read().await.get(&key).cloned()
                    };
                    let outcome = match cached {
                        Some(history) => Ok(history),
                        None => self.fetch_history(&key).await,
                    };
                    slot.publish(&outcome);
                    return outcome;
                }
            }
        }
    }

    /// Get a symbol's quote. Same contract as `get_history`, separate cache.
    pub async fn get_quote(&self, symbol: &str, force_refresh: bool) -> Result<Quote, CoreError> {
        let key = Self::checked_key(symbol)?;

        if !force_refresh {
            if let Some(quote) = self.quotes.read().await.get(&key) {
                debug!(symbol = %key, "quote cache hit");
                return Ok(quote.clone());
            }
        }

        loop {
            match self.quote_fetches.join(&key) {
                Join::Follower(rx) => {
                    debug!(symbol = %key, "quote fetch coalesced");
                    if let Some(outcome) = wait_for_leader(rx).await {
                        return outcome;
                    }
                }
                Join::Leader(slot) => {
                    let cached = if force_refresh {
                        None
                    } else {
                        self.quotes.read().await.get(&key).cloned()
                    };
                    let outcome = match cached {
                        Some(quote) => Ok(quote),
                        None => self.fetch_quote(&key).await,
                    };
                    slot.publish(&outcome);
                    return outcome;
                }
            }
        }
    }

    // ── Cache inspection & eviction ─────────────────────────────────

    /// Cached history without touching upstream.
    pub async fn cached_history(&self, symbol: &str) -> Option<Arc<SymbolHistory>> {
        self.histories
            .read()
            .await
            .get(&normalize_symbol(symbol))
            .cloned()
    }

    /// Cached quote without touching upstream.
    pub async fn cached_quote(&self, symbol: &str) -> Option<Quote> {
        self.quotes
            .read()
            .await
            .get(&normalize_symbol(symbol))
            .cloned()
    }

    /// Symbols with a cached history, sorted.
    pub async fn cached_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.histories.read().await.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Drop both cache entries for one symbol. Returns whether anything was removed.
    pub async fn invalidate(&self, symbol: &str) -> bool {
        let key = normalize_symbol(symbol);
        let had_history = self.histories.write().await.remove(&key).is_some();
        let had_quote = self.quotes.write().await.remove(&key).is_some();
        had_history || had_quote
    }

    /// Evict everything.
    pub async fn clear(&self) {
        self.histories.write().await.clear();
        self.quotes.write().await.clear();
        info!("symbol cache cleared");
    }

    /// Number of upstream attempts made so far (retries and fallbacks included).
    pub fn upstream_calls(&self) -> usize {
        self.upstream_calls.load(Ordering::Relaxed)
    }

    /// History and quote fetches currently running upstream.
    pub fn in_flight_fetches(&self) -> usize {
        self.history_fetches.len() + self.quote_fetches.len()
    }

    // ── Snapshot ────────────────────────────────────────────────────

    /// Serialize the whole cache (bincode) for local persistence.
    pub async fn export_snapshot(&self) -> Result<Vec<u8>, CoreError> {
        let mut histories: Vec<SymbolHistory> = self
            .histories
            .read()
            .await
            .values()
            .map(|h| h.as_ref().clone())
            .collect();
        histories.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let mut quotes: Vec<Quote> = self.quotes.read().await.values().cloned().collect();
        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let snapshot = CacheSnapshot {
            version: SNAPSHOT_VERSION,
            histories,
            quotes,
        };
        bincode::serialize(&snapshot)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize cache snapshot: {e}")))
    }

    /// Load a snapshot produced by `export_snapshot`, replacing the entries
    /// it contains. Returns the number of histories loaded.
    pub async fn import_snapshot(&self, bytes: &[u8]) -> Result<usize, CoreError> {
        let snapshot: CacheSnapshot = bincode::deserialize(bytes)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize cache snapshot: {e}")))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CoreError::Deserialization(format!(
                "Unsupported cache snapshot version: {}",
                snapshot.version
            )));
        }

        // Re-normalize: the snapshot bypassed `SymbolHistory::from_points`
        let mut histories = Vec::with_capacity(snapshot.histories.len());
        for history in snapshot.histories {
            histories.push(SymbolHistory::from_points(
                history.symbol.clone(),
                history.points().to_vec(),
            )?);
        }

        let count = histories.len();
        {
            let mut cache = self.histories.write().await;
            for history in histories {
                cache.insert(history.symbol.clone(), Arc::new(history));
            }
        }
        {
            let mut cache = self.quotes.write().await;
            for mut quote in snapshot.quotes {
                quote.symbol = normalize_symbol(&quote.symbol);
                cache.insert(quote.symbol.clone(), quote);
            }
        }

        info!(histories = count, "symbol cache snapshot imported");
        Ok(count)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn checked_key(symbol: &str) -> Result<String, CoreError> {
        let key = normalize_symbol(symbol);
        if key.is_empty() {
            return Err(CoreError::ValidationError("Symbol must not be empty".into()));
        }
        Ok(key)
    }

    async fn fetch_history(&self, key: &str) -> Result<Arc<SymbolHistory>, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let from: NaiveDate = today - chrono::Duration::days(i64::from(self.policy.lookback_days));

        let points = self
            .call_upstream(key, "history", |provider| {
                Box::pin(async move {
                    let points = provider.fetch_history(key, from).await?;
                    if points.is_empty() {
                        return Err(CoreError::Api {
                            provider: provider.name().to_string(),
                            message: format!("No history returned for {key}"),
                        });
                    }
                    Ok(points)
                })
            })
            .await?;

        let history = Arc::new(SymbolHistory::from_points(key, points).map_err(|e| {
            CoreError::Fetch {
                symbol: key.to_string(),
                message: e.to_string(),
            }
        })?);

        self.histories
            .write()
            .await
            .insert(key.to_string(), Arc::clone(&history));
        info!(symbol = %key, points = history.len(), "history cached");
        Ok(history)
    }

    async fn fetch_quote(&self, key: &str) -> Result<Quote, CoreError> {
        let mut quote = self
            .call_upstream(key, "quote", |provider| {
                Box::pin(async move {
                    let quote = provider.fetch_quote(key).await?;
                    if !quote.is_valid() {
                        return Err(CoreError::Api {
                            provider: provider.name().to_string(),
                            message: format!("Invalid quote values for {key}"),
                        });
                    }
                    Ok(quote)
                })
            })
            .await?;

        quote.symbol = key.to_string();
        self.quotes
            .write()
            .await
            .insert(key.to_string(), quote.clone());
        info!(symbol = %key, price = quote.price, "quote cached");
        Ok(quote)
    }

    /// Run `call` against each provider in priority order, with the policy's
    /// timeout and retries. All failures collapse into one `Fetch` error.
    async fn call_upstream<'p, T>(
        &'p self,
        symbol: &'p str,
        what: &'static str,
        call: impl Fn(&'p dyn MarketDataProvider) -> BoxFuture<'p, Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        if self.registry.is_empty() {
            return Err(CoreError::Fetch {
                symbol: symbol.to_string(),
                message: CoreError::NoProvider(symbol.to_string()).to_string(),
            });
        }

        let mut last_error: Option<CoreError> = None;

        for provider in self.registry.providers() {
            for attempt in 0..=self.policy.max_retries {
                if attempt > 0 {
                    tokio::time::sleep(self.policy.retry_delay).await;
                }

                self.upstream_calls.fetch_add(1, Ordering::Relaxed);
                info!(provider = provider.name(), symbol, attempt, "fetching {what}");

                match tokio::time::timeout(self.policy.timeout, call(provider)).await {
                    Ok(Ok(value)) => return Ok(value),
                    Ok(Err(e)) => {
                        warn!(provider = provider.name(), symbol, "{what} fetch failed: {e}");
                        last_error = Some(e);
                    }
                    Err(_) => {
                        let e = CoreError::Timeout {
                            symbol: symbol.to_string(),
                            millis: u64::try_from(self.policy.timeout.as_millis()).unwrap_or(u64::MAX),
                        };
                        warn!(provider = provider.name(), symbol, "{e}");
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(CoreError::Fetch {
            symbol: symbol.to_string(),
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "upstream returned no data".into()),
        })
    }
}
