use crate::models::settings::Settings;

use super::proxy::ProxyProvider;
use super::traits::MarketDataProvider;
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooFinanceProvider;

/// Ordered list of market-data providers.
///
/// The store tries them in registration order and falls back to the next one
/// when a provider fails.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with the default providers for `settings`.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::new();

        // Proxy first when configured: it returns the full quote summary
        if let Some(base_url) = &settings.proxy_base_url {
            registry.register(Box::new(ProxyProvider::new(
                base_url.clone(),
                settings.fetch_timeout_secs,
            )));
        }

        // Yahoo Finance direct, no API key needed.
        // Not available on WASM (uses native reqwest/tokio connectors)
        #[cfg(not(target_arch = "wasm32"))]
        {
            match YahooFinanceProvider::new() {
                Ok(yahoo) => registry.register(Box::new(yahoo)),
                Err(e) => tracing::warn!("Yahoo Finance provider unavailable: {e}"),
            }
        }

        registry
    }

    /// Register a new provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.providers.push(provider);
    }

    /// All providers, ordered by priority.
    pub fn providers(&self) -> impl Iterator<Item = &dyn MarketDataProvider> {
        self.providers
            .iter()
            .map(|p| p.as_ref() as &dyn MarketDataProvider)
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
