pub mod health;
pub mod points;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /points/add              grant points (POST)
/// /points/withdraw         FIFO debit (POST)
/// /points/{id}/balance     available balance (GET)
/// /points/{id}/expiring    expiring points window (GET)
/// /points/reserve          two-phase reserve (POST)
/// /points/commit           commit a reservation (POST)
/// /points/rollback         roll back a reservation (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/points", points::router())
}
