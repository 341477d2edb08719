//! Domain model structs and row types.
//!
//! The ledger has a single entity, the `transactions` row, plus the two
//! read-model shapes (`UserBalance`, `ExpiringPoints`) the balance and
//! expiry queries produce.

pub mod transaction;
