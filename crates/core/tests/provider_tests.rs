// ═══════════════════════════════════════════════════════════════════
// Provider Tests: proxy payload parsing, quote derivation,
// ProviderRegistry ordering
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;

use stock_dashboard_core::errors::CoreError;
use stock_dashboard_core::models::price::PricePoint;
use stock_dashboard_core::models::quote::Quote;
use stock_dashboard_core::models::settings::Settings;
use stock_dashboard_core::providers::proxy::{parse_summary, parse_time_series, ProxyProvider};
use stock_dashboard_core::providers::registry::ProviderRegistry;
use stock_dashboard_core::providers::traits::MarketDataProvider;

fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const TIME_SERIES_BODY: &str = r#"{
    "Meta Data": { "2. Symbol": "AAPL" },
    "Time Series (Daily)": {
        "2025-01-03": { "1. open": "11.5", "4. close": "12.00", "5. volume": "100" },
        "2025-01-01": { "1. open": "9.5",  "4. close": "10.00", "5. volume": "100" },
        "2025-01-02": { "1. open": "10.5", "4. close": "11.00", "5. volume": "100" }
    }
}"#;

// ═══════════════════════════════════════════════════════════════════
// Proxy: /api/stock
// ═══════════════════════════════════════════════════════════════════

mod proxy_time_series {
    use super::*;

    #[test]
    fn parses_and_sorts_closes() {
        let points = parse_time_series("AAPL", TIME_SERIES_BODY, make_date(2024, 1, 1)).unwrap();
        assert_eq!(
            points,
            vec![
                PricePoint::new(make_date(2025, 1, 1), 10.0),
                PricePoint::new(make_date(2025, 1, 2), 11.0),
                PricePoint::new(make_date(2025, 1, 3), 12.0),
            ]
        );
    }

    #[test]
    fn keeps_points_from_start_date() {
        let points = parse_time_series("AAPL", TIME_SERIES_BODY, make_date(2025, 1, 2)).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, make_date(2025, 1, 2));
    }

    #[test]
    fn start_after_all_points_is_empty_not_error() {
        let points = parse_time_series("AAPL", TIME_SERIES_BODY, make_date(2026, 1, 1)).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn skips_unparseable_rows() {
        let body = r#"{"Time Series (Daily)": {
            "2025-01-01": { "4. close": "10.0" },
            "not-a-date": { "4. close": "11.0" },
            "2025-01-03": { "4. close": "n/a" }
        }}"#;
        let points = parse_time_series("AAPL", body, make_date(2024, 1, 1)).unwrap();
        assert_eq!(points, vec![PricePoint::new(make_date(2025, 1, 1), 10.0)]);
    }

    #[test]
    fn no_usable_rows_is_error() {
        let body = r#"{"Time Series (Daily)": { "bad": { "4. close": "x" } }}"#;
        let err = parse_time_series("AAPL", body, make_date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, CoreError::Api { ref provider, .. } if provider == "Proxy"));
    }

    #[test]
    fn missing_series_is_error() {
        let body = r#"{"Note": "API call frequency exceeded"}"#;
        let err = parse_time_series("AAPL", body, make_date(2024, 1, 1)).unwrap_err();
        assert!(err.to_string().contains("No time series data for AAPL"));
    }

    #[test]
    fn invalid_json_is_api_error() {
        let err = parse_time_series("AAPL", "<html>", make_date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, CoreError::Api { .. }));
        assert!(err.is_fetch_failure());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Proxy: /api/stock/summary
// ═══════════════════════════════════════════════════════════════════

mod proxy_summary {
    use super::*;

    #[test]
    fn parses_full_summary() {
        let body = r#"{
            "symbol": "AAPL", "shortName": "Apple Inc.",
            "price": 175.3, "change": 2.5, "changePercent": 1.45,
            "marketCap": 2700000000000, "fiftyTwoWeekHigh": 199.62,
            "fiftyTwoWeekLow": 164.08, "dividendYield": 0.55, "peRatio": 28.4
        }"#;
        let quote = parse_summary("aapl", body).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.short_name, "Apple Inc.");
        assert_eq!(quote.price, 175.3);
        assert_eq!(quote.market_cap, Some(2.7e12));
    }

    #[test]
    fn symbol_comes_from_request() {
        let body = r#"{"symbol":"something-else","price":1.0,"change":0.0,"changePercent":0.0}"#;
        assert_eq!(parse_summary("msft", body).unwrap().symbol, "MSFT");
    }

    #[test]
    fn missing_required_fields() {
        let body = r#"{"symbol":"AAPL","shortName":"Apple"}"#;
        let err = parse_summary("AAPL", body).unwrap_err();
        assert!(err.to_string().contains("Failed to parse summary for AAPL"));
    }

    #[test]
    fn negative_price_rejected() {
        let body = r#"{"symbol":"AAPL","price":-1.0,"change":0.0,"changePercent":0.0}"#;
        let err = parse_summary("AAPL", body).unwrap_err();
        assert!(err.to_string().contains("Invalid quote values"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = ProxyProvider::new("http://localhost:4000/", 5);
        assert_eq!(provider.base_url(), "http://localhost:4000");
        assert_eq!(provider.name(), "Proxy");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Yahoo Finance: quote from daily closes
// ═══════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
mod yahoo_quote {
    use super::*;
    use stock_dashboard_core::providers::yahoo_finance::quote_from_closes;

    #[test]
    fn change_from_previous_close() {
        let points = vec![
            PricePoint::new(make_date(2025, 1, 1), 100.0),
            PricePoint::new(make_date(2025, 1, 2), 110.0),
        ];
        let quote = quote_from_closes("aapl", &points).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, 110.0);
        assert!((quote.change - 10.0).abs() < 1e-9);
        assert!((quote.change_percent - 10.0).abs() < 1e-9);
    }

    #[test]
    fn single_close_has_zero_change() {
        let points = vec![PricePoint::new(make_date(2025, 1, 1), 50.0)];
        let quote = quote_from_closes("AAPL", &points).unwrap();
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.change_percent, 0.0);
    }

    #[test]
    fn no_closes() {
        assert!(quote_from_closes("AAPL", &[]).is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// ProviderRegistry
// ═══════════════════════════════════════════════════════════════════

struct NamedProvider(&'static str);

#[async_trait]
impl MarketDataProvider for NamedProvider {
    fn name(&self) -> &str {
        self.0
    }

    async fn fetch_history(
        &self,
        _symbol: &str,
        _from: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        Ok(Vec::new())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        Ok(Quote::new(symbol, 1.0, 0.0, 0.0))
    }
}

mod registry {
    use super::*;

    #[test]
    fn empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.names().is_empty());
    }

    #[test]
    fn registration_order_is_priority() {
        let mut registry = ProviderRegistry::default();
        registry.register(Box::new(NamedProvider("First")));
        registry.register(Box::new(NamedProvider("Second")));

        assert_eq!(registry.names(), vec!["First", "Second"]);
        let first = registry.providers().next().unwrap();
        assert_eq!(first.name(), "First");
    }

    #[test]
    fn defaults_put_proxy_first() {
        let settings = Settings {
            proxy_base_url: Some("http://localhost:4000".into()),
            ..Settings::default()
        };
        let registry = ProviderRegistry::new_with_defaults(&settings);
        assert_eq!(registry.names().first().map(String::as_str), Some("Proxy"));
    }

    #[test]
    fn defaults_without_proxy() {
        let registry = ProviderRegistry::new_with_defaults(&Settings::default());
        assert!(!registry.names().contains(&"Proxy".to_string()));
    }
}
