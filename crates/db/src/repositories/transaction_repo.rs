//! Repository for the `transactions` table: the six ledger operations.
//!
//! Debit-shaped operations (withdraw, reserve) share one discipline: open a
//! transaction, lock the user's live deposit lots in FIFO order with
//! `SELECT ... FOR UPDATE`, plan deductions with the pure FIFO consumer,
//! apply them, write the new rows, commit. Locks are always taken in
//! `created_at ASC, id ASC` order and never span two users, so concurrent
//! debits for one user serialize and cross-user deadlock cannot occur.

use std::time::Duration;

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction as PgTx};
use uuid::Uuid;

use points_core::fifo::{self, ConsumePlan, Lot};
use points_core::reservation::ReservationState;
use points_core::types::{ReservationId, TransactionId, UserId};

use crate::error::LedgerError;
use crate::models::transaction::{ExpiringPoints, Transaction, TxStatus, TxType, UserBalance};

/// Column list for `transactions` queries.
const COLUMNS: &str =
    "id, user_id, amount, type, status, expires_at, created_at, reservation_id, remaining_amount";

/// Deadline for the lock-free read paths (balance, expiring points).
const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Provides the ledger operations over the `transactions` table.
pub struct TransactionRepo;

impl TransactionRepo {
    /// Insert one deposit lot for `user_id`.
    ///
    /// A positive `ttl_days` sets `expires_at` that many days from now;
    /// zero means the lot never expires. Returns the created row with its
    /// database-assigned `created_at`.
    pub async fn add_points(
        pool: &PgPool,
        user_id: UserId,
        amount: i64,
        ttl_days: i64,
    ) -> Result<Transaction, LedgerError> {
        let expires_at = (ttl_days > 0).then(|| Utc::now() + chrono::Duration::days(ttl_days));

        let query = format!(
            "INSERT INTO transactions \
                 (id, user_id, amount, type, status, expires_at, remaining_amount) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, Transaction>(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(amount)
            .bind(TxType::Deposit)
            .bind(TxStatus::Completed)
            .bind(expires_at)
            .bind(amount)
            .fetch_one(pool)
            .await?;
        Ok(created)
    }

    /// Withdraw `amount` points from `user_id` under FIFO consumption.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] when the user's live
    /// lots cannot cover the amount; the transaction rolls back and no row
    /// is touched. On success each consumed lot is decremented and one
    /// `(withdrawal, completed)` audit row is inserted.
    pub async fn withdraw_points(
        pool: &PgPool,
        user_id: UserId,
        amount: i64,
    ) -> Result<(), LedgerError> {
        let mut tx = pool.begin().await?;

        let lots = Self::lock_live_deposits(&mut tx, user_id).await?;
        let deductions = match fifo::consume(&lots, amount) {
            ConsumePlan::Deductions(ds) => ds,
            ConsumePlan::Insufficient { available } => {
                // Dropping the transaction releases the row locks.
                return Err(LedgerError::InsufficientFunds {
                    available,
                    requested: amount,
                });
            }
        };

        for deduction in &deductions {
            Self::decrement_lot(&mut tx, deduction.id, deduction.amount).await?;
        }

        sqlx::query(
            "INSERT INTO transactions (id, user_id, amount, type, status, remaining_amount) \
             VALUES ($1, $2, $3, $4, $5, 0)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(amount)
        .bind(TxType::Withdrawal)
        .bind(TxStatus::Completed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Sum of `remaining_amount` over the user's live deposit lots.
    ///
    /// Snapshot read, no locks. Reserved points are not included; this is
    /// the available pool only.
    pub async fn get_balance(pool: &PgPool, user_id: UserId) -> Result<UserBalance, LedgerError> {
        let query = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(remaining_amount), 0)::BIGINT \
             FROM transactions \
             WHERE user_id = $1 \
               AND type = $2 \
               AND status = $3 \
               AND remaining_amount > 0 \
               AND (expires_at IS NULL OR expires_at > NOW())",
        )
        .bind(user_id)
        .bind(TxType::Deposit)
        .bind(TxStatus::Completed)
        .fetch_one(pool);

        let total_amount = tokio::time::timeout(READ_TIMEOUT, query)
            .await
            .map_err(|_| LedgerError::ReadTimeout)??;

        Ok(UserBalance {
            user_id,
            total_amount,
        })
    }

    /// Points that expire within the next `days` days, grouped by deadline.
    ///
    /// The window is `(now, now + days * 24h]`: already-expired lots are
    /// out, a lot expiring exactly at the window edge is in. Ordered by
    /// `expires_at` ascending. Snapshot read, no locks.
    pub async fn get_expiring_points(
        pool: &PgPool,
        user_id: UserId,
        days: i32,
    ) -> Result<Vec<ExpiringPoints>, LedgerError> {
        let query = sqlx::query_as::<_, ExpiringPoints>(
            "SELECT SUM(remaining_amount)::BIGINT AS amount, expires_at \
             FROM transactions \
             WHERE user_id = $1 \
               AND type = $2 \
               AND status = $3 \
               AND remaining_amount > 0 \
               AND expires_at IS NOT NULL \
               AND expires_at > NOW() \
               AND expires_at <= NOW() + make_interval(days => $4) \
             GROUP BY expires_at \
             ORDER BY expires_at ASC",
        )
        .bind(user_id)
        .bind(TxType::Deposit)
        .bind(TxStatus::Completed)
        .bind(days)
        .fetch_all(pool);

        let buckets = tokio::time::timeout(READ_TIMEOUT, query)
            .await
            .map_err(|_| LedgerError::ReadTimeout)??;
        Ok(buckets)
    }

    /// Reserve `amount` points for `user_id`, returning a fresh reservation id.
    ///
    /// Consumes lots exactly like a withdrawal, but instead of an audit row
    /// each deduction becomes a `(reserve, reserved)` hold row carrying the
    /// reservation id, with `amount = remaining_amount =` the deduction.
    /// The hold amounts over the reservation always sum to the request.
    pub async fn reserve_points(
        pool: &PgPool,
        user_id: UserId,
        amount: i64,
    ) -> Result<ReservationId, LedgerError> {
        let mut tx = pool.begin().await?;

        let lots = Self::lock_live_deposits(&mut tx, user_id).await?;
        let deductions = match fifo::consume(&lots, amount) {
            ConsumePlan::Deductions(ds) => ds,
            ConsumePlan::Insufficient { available } => {
                return Err(LedgerError::InsufficientFunds {
                    available,
                    requested: amount,
                });
            }
        };

        let reservation_id = Uuid::new_v4();
        for deduction in &deductions {
            sqlx::query(
                "INSERT INTO transactions \
                     (id, user_id, amount, type, status, reservation_id, remaining_amount) \
                 VALUES ($1, $2, $3, $4, $5, $6, $3)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(deduction.amount)
            .bind(TxType::Reserve)
            .bind(TxStatus::Reserved)
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

            Self::decrement_lot(&mut tx, deduction.id, deduction.amount).await?;
        }

        tx.commit().await?;
        Ok(reservation_id)
    }

    /// Commit a reservation: its hold rows become completed withdrawals.
    ///
    /// Terminal. Fails with [`LedgerError::ReservationNotFound`] when the
    /// reservation is unknown or already committed or rolled back, leaving
    /// state unchanged. The user's available balance does not move; the
    /// points already left the pool at reserve time.
    pub async fn commit_reservation(
        pool: &PgPool,
        reservation_id: ReservationId,
    ) -> Result<(), LedgerError> {
        let mut tx = pool.begin().await?;

        let state = Self::lock_and_classify(&mut tx, reservation_id).await?;
        if !state.can_settle() {
            return Err(LedgerError::ReservationNotFound);
        }

        sqlx::query(
            "UPDATE transactions \
             SET status = $2, type = $3 \
             WHERE reservation_id = $1 AND status = $4",
        )
        .bind(reservation_id)
        .bind(TxStatus::Completed)
        .bind(TxType::Withdrawal)
        .bind(TxStatus::Reserved)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Roll back a reservation: cancel its holds and return the points.
    ///
    /// Terminal. Every hold's `amount` is credited back to the user's
    /// oldest live deposit lot, not necessarily the lot it was drawn from;
    /// the total returned always equals the total reserved. A user with no
    /// live deposit lot left has nowhere to credit and the return is
    /// dropped, matching the historical behavior of the service.
    pub async fn rollback_reservation(
        pool: &PgPool,
        reservation_id: ReservationId,
    ) -> Result<(), LedgerError> {
        let mut tx = pool.begin().await?;

        let holds: Vec<(TransactionId, i64, UserId, TxStatus)> = sqlx::query_as(
            "SELECT id, amount, user_id, status \
             FROM transactions \
             WHERE reservation_id = $1 \
             ORDER BY created_at ASC, id ASC \
             FOR UPDATE",
        )
        .bind(reservation_id)
        .fetch_all(&mut *tx)
        .await?;

        let statuses: Vec<_> = holds
            .iter()
            .map(|(_, _, _, status)| status.as_hold_status())
            .collect();
        if !ReservationState::classify(&statuses).can_settle() {
            return Err(LedgerError::ReservationNotFound);
        }

        sqlx::query(
            "UPDATE transactions \
             SET status = $2 \
             WHERE reservation_id = $1 AND status = $3",
        )
        .bind(reservation_id)
        .bind(TxStatus::Cancelled)
        .bind(TxStatus::Reserved)
        .execute(&mut *tx)
        .await?;

        for (_, amount, user_id, status) in &holds {
            if *status != TxStatus::Reserved {
                continue;
            }
            sqlx::query(
                "UPDATE transactions \
                 SET remaining_amount = remaining_amount + $1 \
                 WHERE id = ( \
                     SELECT id FROM transactions \
                     WHERE user_id = $2 \
                       AND type = $3 \
                       AND status = $4 \
                       AND (expires_at IS NULL OR expires_at > NOW()) \
                     ORDER BY created_at ASC, id ASC \
                     LIMIT 1 \
                 )",
            )
            .bind(amount)
            .bind(user_id)
            .bind(TxType::Deposit)
            .bind(TxStatus::Completed)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Find a transaction row by its primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        id: TransactionId,
    ) -> Result<Option<Transaction>, LedgerError> {
        let query = format!("SELECT {COLUMNS} FROM transactions WHERE id = $1");
        let row = sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// List the rows of one reservation group in FIFO order.
    pub async fn list_by_reservation(
        pool: &PgPool,
        reservation_id: ReservationId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let query = format!(
            "SELECT {COLUMNS} FROM transactions \
             WHERE reservation_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, Transaction>(&query)
            .bind(reservation_id)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    /// Select and exclusively lock the user's live deposit lots, oldest
    /// first with id as tie-break. Lock order is fixed, so two debits for
    /// the same user block on the first lot rather than deadlocking.
    async fn lock_live_deposits(
        tx: &mut PgTx<'_, Postgres>,
        user_id: UserId,
    ) -> Result<Vec<Lot>, sqlx::Error> {
        let rows: Vec<(TransactionId, i64)> = sqlx::query_as(
            "SELECT id, remaining_amount \
             FROM transactions \
             WHERE user_id = $1 \
               AND type = $2 \
               AND status = $3 \
               AND remaining_amount > 0 \
               AND (expires_at IS NULL OR expires_at > NOW()) \
             ORDER BY created_at ASC, id ASC \
             FOR UPDATE",
        )
        .bind(user_id)
        .bind(TxType::Deposit)
        .bind(TxStatus::Completed)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, remaining)| Lot { id, remaining })
            .collect())
    }

    /// Lock every row of a reservation group and derive its state.
    ///
    /// The select has no status filter: under read-committed, a concurrent
    /// settle that beats us to the locks leaves the rows in their terminal
    /// status by the time we observe them, so re-settling classifies as
    /// terminal and fails instead of double-processing.
    async fn lock_and_classify(
        tx: &mut PgTx<'_, Postgres>,
        reservation_id: ReservationId,
    ) -> Result<ReservationState, sqlx::Error> {
        let statuses: Vec<(TxStatus,)> = sqlx::query_as(
            "SELECT status FROM transactions WHERE reservation_id = $1 FOR UPDATE",
        )
        .bind(reservation_id)
        .fetch_all(&mut **tx)
        .await?;

        let statuses: Vec<_> = statuses
            .into_iter()
            .map(|(status,)| status.as_hold_status())
            .collect();
        Ok(ReservationState::classify(&statuses))
    }

    /// Decrement a locked deposit lot by a planned deduction.
    async fn decrement_lot(
        tx: &mut PgTx<'_, Postgres>,
        lot_id: TransactionId,
        amount: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE transactions SET remaining_amount = remaining_amount - $1 WHERE id = $2")
            .bind(amount)
            .bind(lot_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
