//! The `transactions` row and its tagged `(type, status)` variants.

use points_core::reservation::HoldStatus;
use points_core::types::{ReservationId, Timestamp, TransactionId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Transaction kind, stored as the PostgreSQL `transaction_type` enum.
///
/// `Commit` and `Rollback` are transitional values kept for schema
/// compatibility; settled reservations come to rest as `Withdrawal` or
/// stay `Reserve` with a cancelled status, so only the first three kinds
/// appear in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Deposit,
    Withdrawal,
    Reserve,
    Commit,
    Rollback,
}

/// Transaction status, stored as the PostgreSQL `transaction_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Completed,
    Reserved,
    Cancelled,
}

impl TxStatus {
    /// Project the row status into the core reservation state machine.
    pub fn as_hold_status(self) -> HoldStatus {
        match self {
            Self::Reserved => HoldStatus::Reserved,
            Self::Completed => HoldStatus::Completed,
            Self::Cancelled => HoldStatus::Cancelled,
        }
    }
}

/// The role a row plays in the ledger, derived from `(type, status)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    /// `(deposit, completed)`: contributes `remaining_amount` to the pool
    /// while unexpired.
    DepositLot,
    /// `(withdrawal, completed)`: audit record, `remaining_amount` is 0.
    WithdrawalRecord,
    /// `(reserve, reserved)`: holds points away from the pool.
    ReservationHold,
    /// `(*, cancelled)`: a rolled-back hold; its points were returned.
    CancelledHold,
}

/// A row from the `transactions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub amount: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<ReservationId>,
    pub remaining_amount: i64,
}

impl Transaction {
    /// Classify the row by its `(type, status)` pair.
    ///
    /// Returns `None` for combinations no operation produces.
    pub fn role(&self) -> Option<RowRole> {
        match (self.tx_type, self.status) {
            (_, TxStatus::Cancelled) => Some(RowRole::CancelledHold),
            (TxType::Deposit, TxStatus::Completed) => Some(RowRole::DepositLot),
            (TxType::Withdrawal, TxStatus::Completed) => Some(RowRole::WithdrawalRecord),
            (TxType::Reserve, TxStatus::Reserved) => Some(RowRole::ReservationHold),
            _ => None,
        }
    }
}

/// Balance read model: sum of a user's live deposit lots.
#[derive(Debug, Clone, Serialize)]
pub struct UserBalance {
    pub user_id: UserId,
    pub total_amount: i64,
}

/// One expiry bucket: the points that vanish at `expires_at`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpiringPoints {
    pub amount: i64,
    pub expires_at: Timestamp,
}
