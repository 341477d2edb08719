//! FIFO consumption of deposit lots.
//!
//! This is the only debit algorithm in the system: withdrawals and
//! reservations both plan their per-lot deductions here, against lots the
//! repository has already selected and locked in `created_at` order.

use crate::types::TransactionId;

/// A deposit lot as seen by the consumer: its row id and how many points
/// it still holds. The caller supplies lots oldest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lot {
    pub id: TransactionId,
    pub remaining: i64,
}

/// How many points to take from one lot. Always `0 < amount <= remaining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deduction {
    pub id: TransactionId,
    pub amount: i64,
}

/// Outcome of planning a debit against an ordered list of lots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumePlan {
    /// Per-lot deductions, in input order, summing to the requested target.
    Deductions(Vec<Deduction>),
    /// The lots cannot cover the target; nothing may be debited.
    Insufficient { available: i64 },
}

/// Plan a FIFO debit of `target` points against `lots`.
///
/// Walks the lots in order, taking `min(remaining, left)` from each until
/// the target is covered. Lots are never touched beyond what they hold,
/// and younger lots are only drawn from once every older lot is drained.
///
/// A non-positive target consumes nothing and yields an empty plan;
/// callers are expected to have validated the amount already.
pub fn consume(lots: &[Lot], target: i64) -> ConsumePlan {
    if target <= 0 {
        return ConsumePlan::Deductions(Vec::new());
    }

    let available: i64 = lots.iter().map(|lot| lot.remaining).sum();
    if available < target {
        return ConsumePlan::Insufficient { available };
    }

    let mut deductions = Vec::new();
    let mut left = target;
    for lot in lots {
        if left == 0 {
            break;
        }
        let take = lot.remaining.min(left);
        if take == 0 {
            continue;
        }
        deductions.push(Deduction {
            id: lot.id,
            amount: take,
        });
        left -= take;
    }

    ConsumePlan::Deductions(deductions)
}
