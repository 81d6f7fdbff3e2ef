pub mod dashboard_service;
pub mod portfolio_ledger;
pub mod range_filter;
pub mod series_aligner;
pub mod symbol_store;
