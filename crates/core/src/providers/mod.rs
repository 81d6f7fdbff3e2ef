pub mod registry;
pub mod traits;

// Upstream implementations
pub mod proxy;
#[cfg(not(target_arch = "wasm32"))]
pub mod yahoo_finance;
