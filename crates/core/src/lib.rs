//! Pure domain logic for the bonus-points ledger.
//!
//! This crate has no internal dependencies so it can be used by both the
//! repository layer and any future worker or CLI tooling. Everything here
//! is synchronous and side-effect free; all I/O lives in `points_db`.

pub mod error;
pub mod fifo;
pub mod reservation;
pub mod types;
