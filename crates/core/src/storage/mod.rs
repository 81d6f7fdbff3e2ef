pub mod cache_snapshot;
pub mod holdings;
pub mod kv;
