use crate::errors::CoreError;
use crate::services::symbol_store::SymbolStore;

use super::kv::KeyValueStore;

/// Key the binary symbol-cache snapshot lives under.
pub const SYMBOL_CACHE_KEY: &str = "symbolCache";

/// Persist the store's cache so the next session starts warm.
pub async fn save_cache(store: &SymbolStore, kv: &dyn KeyValueStore) -> Result<(), CoreError> {
    let bytes = store.export_snapshot().await?;
    kv.put(SYMBOL_CACHE_KEY, &bytes)
}

/// Warm `store` from a saved snapshot. Returns the number of histories
/// loaded; 0 when nothing was saved.
pub async fn load_cache(store: &SymbolStore, kv: &dyn KeyValueStore) -> Result<usize, CoreError> {
    match kv.get(SYMBOL_CACHE_KEY)? {
        Some(bytes) => store.import_snapshot(&bytes).await,
        None => Ok(0),
    }
}
