// ═══════════════════════════════════════════════════════════════════
// Error Tests: CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use stock_dashboard_core::errors::CoreError;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn fetch() {
        let err = CoreError::Fetch {
            symbol: "AAPL".into(),
            message: "upstream returned no data".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch AAPL: upstream returned no data"
        );
    }

    #[test]
    fn api() {
        let err = CoreError::Api {
            provider: "Proxy".into(),
            message: "AAPL: rate limited".into(),
        };
        assert_eq!(err.to_string(), "API error (Proxy): AAPL: rate limited");
    }

    #[test]
    fn network() {
        let err = CoreError::Network("connection refused".into());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn no_provider() {
        let err = CoreError::NoProvider("MSFT".into());
        assert_eq!(
            err.to_string(),
            "No market data provider available for MSFT"
        );
    }

    #[test]
    fn timeout() {
        let err = CoreError::Timeout {
            symbol: "NVDA".into(),
            millis: 10_000,
        };
        assert_eq!(err.to_string(), "Fetch for NVDA timed out after 10000ms");
    }

    #[test]
    fn duplicate_symbol() {
        let err = CoreError::DuplicateSymbol("AAPL".into());
        assert_eq!(
            err.to_string(),
            "Symbol AAPL is already held in the portfolio"
        );
    }

    #[test]
    fn invalid_shares() {
        let err = CoreError::InvalidShares {
            symbol: "AAPL".into(),
            shares: -3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid share count for AAPL: -3 (must be a positive integer)"
        );
    }

    #[test]
    fn alignment_inconsistency() {
        let err = CoreError::AlignmentInconsistency {
            date: "2025-01-02".into(),
        };
        assert_eq!(
            err.to_string(),
            "Alignment inconsistency: date 2025-01-02 has no value in any series"
        );
    }

    #[test]
    fn too_many_symbols() {
        let err = CoreError::TooManySymbols {
            requested: 11,
            max: 10,
        };
        assert_eq!(
            err.to_string(),
            "Too many symbols: 11 requested, at most 10 allowed"
        );
    }

    #[test]
    fn validation_error() {
        let err = CoreError::ValidationError("Range must be at least 1 day".into());
        assert_eq!(
            err.to_string(),
            "Validation failed: Range must be at least 1 day"
        );
    }

    #[test]
    fn serialization() {
        let err = CoreError::Serialization("bad bytes".into());
        assert_eq!(err.to_string(), "Serialization error: bad bytes");
    }

    #[test]
    fn deserialization() {
        let err = CoreError::Deserialization("unexpected EOF".into());
        assert_eq!(err.to_string(), "Deserialization error: unexpected EOF");
    }

    #[test]
    fn storage() {
        let err = CoreError::Storage("disk full".into());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }
}

// ── Fetch failure classification ────────────────────────────────────

mod fetch_failure {
    use super::*;

    #[test]
    fn upstream_errors_are_tolerated() {
        let tolerated = [
            CoreError::Fetch {
                symbol: "A".into(),
                message: "x".into(),
            },
            CoreError::Api {
                provider: "P".into(),
                message: "x".into(),
            },
            CoreError::Network("x".into()),
            CoreError::NoProvider("A".into()),
            CoreError::Timeout {
                symbol: "A".into(),
                millis: 1,
            },
        ];
        for err in &tolerated {
            assert!(err.is_fetch_failure(), "{err} should be a fetch failure");
        }
    }

    #[test]
    fn input_and_internal_errors_are_not() {
        let fatal = [
            CoreError::DuplicateSymbol("A".into()),
            CoreError::InvalidShares {
                symbol: "A".into(),
                shares: 0,
            },
            CoreError::AlignmentInconsistency {
                date: "2025-01-01".into(),
            },
            CoreError::TooManySymbols {
                requested: 2,
                max: 1,
            },
            CoreError::ValidationError("x".into()),
            CoreError::Serialization("x".into()),
            CoreError::Deserialization("x".into()),
            CoreError::Storage("x".into()),
        ];
        for err in &fatal {
            assert!(!err.is_fetch_failure(), "{err} should not be a fetch failure");
        }
    }
}

// ── From conversions ────────────────────────────────────────────────

mod conversions {
    use super::*;

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Storage(ref m) if m.contains("read-only")));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn from_bincode_error() {
        let bin_err = bincode::deserialize::<String>(&[0xff]).unwrap_err();
        let err: CoreError = bin_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }

    #[test]
    fn question_mark_propagation() {
        fn parse(s: &str) -> Result<Vec<u32>, CoreError> {
            Ok(serde_json::from_str(s)?)
        }
        assert_eq!(parse("[1,2]").unwrap(), vec![1, 2]);
        assert!(parse("{").is_err());
    }

    #[test]
    fn debug_format() {
        let err = CoreError::DuplicateSymbol("AAPL".into());
        let debug = format!("{err:?}");
        assert!(debug.contains("DuplicateSymbol"));
        assert!(debug.contains("AAPL"));
    }
}
