use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (the pool is an `Arc` internally). The ledger
/// keeps no other process-wide state; everything mutable lives in the store.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: points_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
