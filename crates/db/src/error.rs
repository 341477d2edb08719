//! Ledger operation outcomes that are not plain database failures.

/// Error type returned by [`TransactionRepo`](crate::repositories::TransactionRepo).
///
/// `InsufficientFunds` and `ReservationNotFound` are domain outcomes the
/// HTTP layer maps to 400 and 404; everything else surfaces through the
/// `Database` variant and is classified there.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("reservation not found or already processed")]
    ReservationNotFound,

    #[error("read query deadline exceeded")]
    ReadTimeout,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
