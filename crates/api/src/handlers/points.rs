//! Handlers for the `/points` resource.
//!
//! The ledger surface: granting points, FIFO debits, balance and expiry
//! reads, and the two-phase reserve / commit / rollback flow.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use points_core::error::CoreError;
use points_core::types::{ReservationId, UserId};
use points_db::models::transaction::{Transaction, UserBalance};
use points_db::repositories::TransactionRepo;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Window parameter for the expiring-points endpoint.
const DEFAULT_EXPIRY_WINDOW_DAYS: i32 = 7;

#[derive(Debug, Deserialize)]
pub struct AddPointsRequest {
    pub user_id: String,
    pub amount: i64,
    pub ttl_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawPointsRequest {
    pub user_id: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReservePointsRequest {
    pub user_id: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct CommitReservationRequest {
    pub reservation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RollbackReservationRequest {
    pub reservation_id: String,
}

/// Query parameters for the expiring-points endpoint.
#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    /// Window size in days. Defaults to 7.
    pub days: Option<i32>,
}

/// POST /api/v1/points/add
///
/// Grant points to a user, optionally with a TTL in days.
pub async fn add_points(
    State(state): State<AppState>,
    Json(req): Json<AddPointsRequest>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    let user_id = parse_user_id(&req.user_id)?;
    validate_amount(req.amount)?;
    if req.ttl_days < 0 {
        return Err(CoreError::Validation("ttl_days must be non-negative".into()).into());
    }

    let created = TransactionRepo::add_points(&state.pool, user_id, req.amount, req.ttl_days).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/v1/points/withdraw
///
/// Debit points under FIFO consumption. 400 when the balance cannot cover
/// the amount.
pub async fn withdraw_points(
    State(state): State<AppState>,
    Json(req): Json<WithdrawPointsRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = parse_user_id(&req.user_id)?;
    validate_amount(req.amount)?;

    TransactionRepo::withdraw_points(&state.pool, user_id, req.amount).await?;
    Ok(Json(json!({ "message": "points withdrawn successfully" })))
}

/// GET /api/v1/points/{id}/balance
///
/// The user's available balance: live deposit lots only, reserved points
/// excluded.
pub async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserBalance>> {
    let user_id = parse_path_user_id(&id)?;
    let balance = TransactionRepo::get_balance(&state.pool, user_id).await?;
    Ok(Json(balance))
}

/// GET /api/v1/points/{id}/expiring?days=N
///
/// Points expiring within the window, grouped by deadline, soonest first.
pub async fn get_expiring_points(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ExpiringQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = parse_path_user_id(&id)?;

    let days = params.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
    if days <= 0 {
        return Err(CoreError::Validation("days must be positive".into()).into());
    }

    let expiring = TransactionRepo::get_expiring_points(&state.pool, user_id, days).await?;
    Ok(Json(json!({
        "user_id": user_id,
        "days": days,
        "expiring_points": expiring,
    })))
}

/// POST /api/v1/points/reserve
///
/// Hold points for a later commit. Returns the fresh reservation id.
pub async fn reserve_points(
    State(state): State<AppState>,
    Json(req): Json<ReservePointsRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let user_id = parse_user_id(&req.user_id)?;
    validate_amount(req.amount)?;

    let reservation_id = TransactionRepo::reserve_points(&state.pool, user_id, req.amount).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "reservation_id": reservation_id,
            "message": "points reserved successfully",
        })),
    ))
}

/// POST /api/v1/points/commit
///
/// Finalize a reservation. 404 when the reservation is unknown or already
/// settled.
pub async fn commit_reservation(
    State(state): State<AppState>,
    Json(req): Json<CommitReservationRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let reservation_id = parse_reservation_id(&req.reservation_id)?;

    TransactionRepo::commit_reservation(&state.pool, reservation_id).await?;
    Ok(Json(json!({ "message": "reservation committed successfully" })))
}

/// POST /api/v1/points/rollback
///
/// Cancel a reservation and return its points. 404 when the reservation is
/// unknown or already settled.
pub async fn rollback_reservation(
    State(state): State<AppState>,
    Json(req): Json<RollbackReservationRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let reservation_id = parse_reservation_id(&req.reservation_id)?;

    TransactionRepo::rollback_reservation(&state.pool, reservation_id).await?;
    Ok(Json(json!({ "message": "reservation rolled back successfully" })))
}

// ── Private helpers ──────────────────────────────────────────────────────

fn validate_amount(amount: i64) -> AppResult<()> {
    if amount > 0 {
        Ok(())
    } else {
        Err(CoreError::Validation("amount must be positive".into()).into())
    }
}

fn parse_user_id(raw: &str) -> AppResult<UserId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("invalid user_id".into()))
}

fn parse_reservation_id(raw: &str) -> AppResult<ReservationId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("invalid reservation_id".into()))
}

/// A path user id that does not parse, or is the nil UUID, addresses no
/// known user and is reported as 404 rather than 400.
fn parse_path_user_id(raw: &str) -> AppResult<UserId> {
    match raw.parse::<Uuid>() {
        Ok(id) if !id.is_nil() => Ok(id),
        _ => Err(CoreError::NotFound { entity: "user" }.into()),
    }
}
