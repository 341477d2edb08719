//! Reservation lifecycle as a pure state machine.
//!
//! A reservation is the group of hold rows sharing one `reservation_id`.
//! The group's state is derived from the statuses of its rows; commit and
//! rollback are only legal while the group is active, and both transitions
//! are terminal.

/// Status of one row in a reservation group.
///
/// Intentionally mirrored from the `db` crate's status enum because this
/// crate has no internal deps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldStatus {
    Reserved,
    Completed,
    Cancelled,
}

/// State of a reservation group as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    /// No rows carry this reservation id.
    Absent,
    /// At least one row is still reserved; commit and rollback are legal.
    Active,
    /// All rows were flipped to completed withdrawals. Terminal.
    Committed,
    /// All rows were cancelled and the points returned. Terminal.
    Cancelled,
}

impl ReservationState {
    /// Derive the group state from its row statuses.
    ///
    /// Reserve creates all rows reserved, and both settling transitions
    /// update the whole group in one transaction, so a group is never
    /// genuinely mixed; any lingering reserved row keeps it active.
    pub fn classify(statuses: &[HoldStatus]) -> Self {
        if statuses.is_empty() {
            return Self::Absent;
        }
        if statuses.contains(&HoldStatus::Reserved) {
            return Self::Active;
        }
        if statuses.iter().all(|s| *s == HoldStatus::Cancelled) {
            Self::Cancelled
        } else {
            Self::Committed
        }
    }

    /// Whether commit or rollback may proceed from this state.
    pub fn can_settle(self) -> bool {
        self == Self::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_is_absent() {
        assert_eq!(ReservationState::classify(&[]), ReservationState::Absent);
    }

    #[test]
    fn reserved_rows_make_group_active() {
        let state = ReservationState::classify(&[HoldStatus::Reserved, HoldStatus::Reserved]);
        assert_eq!(state, ReservationState::Active);
        assert!(state.can_settle());
    }

    #[test]
    fn completed_rows_make_group_committed() {
        let state = ReservationState::classify(&[HoldStatus::Completed, HoldStatus::Completed]);
        assert_eq!(state, ReservationState::Committed);
        assert!(!state.can_settle());
    }

    #[test]
    fn cancelled_rows_make_group_cancelled() {
        let state = ReservationState::classify(&[HoldStatus::Cancelled]);
        assert_eq!(state, ReservationState::Cancelled);
        assert!(!state.can_settle());
    }

    #[test]
    fn terminal_states_refuse_settlement() {
        assert!(!ReservationState::Absent.can_settle());
        assert!(!ReservationState::Committed.can_settle());
        assert!(!ReservationState::Cancelled.can_settle());
    }
}
