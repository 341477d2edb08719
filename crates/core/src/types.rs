/// All ledger identifiers are opaque 128-bit UUIDs.
pub type UserId = uuid::Uuid;

/// Primary key of a ledger transaction row.
pub type TransactionId = uuid::Uuid;

/// Groups the hold rows created by a single reservation.
pub type ReservationId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
