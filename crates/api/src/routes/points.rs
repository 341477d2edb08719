//! Route definitions for the `/points` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::points;
use crate::state::AppState;

/// Routes mounted at `/points`.
///
/// ```text
/// POST /add               -> add_points
/// POST /withdraw          -> withdraw_points
/// GET  /{id}/balance      -> get_balance
/// GET  /{id}/expiring     -> get_expiring_points  (?days=N)
/// POST /reserve           -> reserve_points
/// POST /commit            -> commit_reservation
/// POST /rollback          -> rollback_reservation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(points::add_points))
        .route("/withdraw", post(points::withdraw_points))
        .route("/{id}/balance", get(points::get_balance))
        .route("/{id}/expiring", get(points::get_expiring_points))
        .route("/reserve", post(points::reserve_points))
        .route("/commit", post(points::commit_reservation))
        .route("/rollback", post(points::rollback_reservation))
}
