//! Repository layer.
//!
//! Repositories are zero-sized structs providing async methods that take
//! `&PgPool` as the first argument. All mutable ledger state lives in the
//! store; nothing is cached in process.

pub mod transaction_repo;

pub use transaction_repo::TransactionRepo;
