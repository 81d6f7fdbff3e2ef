use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::chart::TimeRange;

/// Runtime configuration for a dashboard session.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the market-data proxy (e.g., "http://localhost:4000").
    /// When set, the proxy is tried before Yahoo Finance.
    pub proxy_base_url: Option<String>,

    /// Per-attempt upstream timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Extra attempts after a failed upstream call.
    pub max_retries: u32,

    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,

    /// Maximum number of symbols on one chart.
    pub max_symbols: usize,

    /// How far back a history fetch reaches, in days. Range changes inside
    /// this window are served from cache.
    pub history_lookback_days: u32,

    /// Range shown when a view is first opened.
    pub default_range: TimeRange,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_base_url: None,
            fetch_timeout_secs: 10,
            max_retries: 1,
            retry_delay_ms: 250,
            max_symbols: 10,
            history_lookback_days: 730,
            default_range: TimeRange::OneMonth,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fetch_timeout_secs == 0 {
            return Err(CoreError::ValidationError(
                "fetch_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.max_symbols == 0 {
            return Err(CoreError::ValidationError(
                "max_symbols must be greater than zero".into(),
            ));
        }
        if self.history_lookback_days == 0 {
            return Err(CoreError::ValidationError(
                "history_lookback_days must be greater than zero".into(),
            ));
        }
        if let Some(url) = &self.proxy_base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(CoreError::ValidationError(format!(
                    "proxy_base_url '{url}' must start with http:// or https://"
                )));
            }
        }
        Ok(())
    }
}
