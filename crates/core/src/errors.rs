use thiserror::Error;

/// Unified error type for the entire stock-dashboard-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Upstream / Network ──────────────────────────────────────────
    #[error("Failed to fetch {symbol}: {message}")]
    Fetch { symbol: String, message: String },

    #[error("API error ({provider}): {message}")]
    Api { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No market data provider available for {0}")]
    NoProvider(String),

    #[error("Fetch for {symbol} timed out after {millis}ms")]
    Timeout { symbol: String, millis: u64 },

    // ── Ledger ──────────────────────────────────────────────────────
    #[error("Symbol {0} is already held in the portfolio")]
    DuplicateSymbol(String),

    #[error("Invalid share count for {symbol}: {shares} (must be a positive integer)")]
    InvalidShares { symbol: String, shares: i64 },

    // ── Alignment / View ────────────────────────────────────────────
    #[error("Alignment inconsistency: date {date} has no value in any series")]
    AlignmentInconsistency { date: String },

    #[error("Too many symbols: {requested} requested, at most {max} allowed")]
    TooManySymbols { requested: usize, max: usize },

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── Serialization / Storage ─────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Whether this error is a per-symbol upstream failure that a dashboard
    /// view tolerates (reported in `failed_symbols`) rather than aborts on.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            CoreError::Fetch { .. }
                | CoreError::Api { .. }
                | CoreError::Network(_)
                | CoreError::NoProvider(_)
                | CoreError::Timeout { .. }
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL; keep the query string out of messages.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
