//! Deposit lifecycle state machine
//!
//! Status is a view derived from the post-mutation balance snapshot, never
//! stored independently of the rules here. The transition function is pure
//! and is called exactly once per mutating event, atomically with the
//! balance write that triggered it.

use alloy::primitives::{I256, U256};

/// Deposit lifecycle states.
///
/// `active`: open and fundable. `underfunded`: remaining balance dropped
/// below the minimum viable intent size; still open but no longer
/// re-evaluated upward. `withdrawn`: revoked by the owner. `closed`: fully
/// consumed by fulfillment. `closed` and `withdrawn` are terminal, with one
/// exception: a withdrawal observed after close leaves the status `closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositStatus {
    Active,
    Underfunded,
    Closed,
    Withdrawn,
}

impl DepositStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DepositStatus::Active => "active",
            DepositStatus::Underfunded => "underfunded",
            DepositStatus::Closed => "closed",
            DepositStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(DepositStatus::Active),
            "underfunded" => Some(DepositStatus::Underfunded),
            "closed" => Some(DepositStatus::Closed),
            "withdrawn" => Some(DepositStatus::Withdrawn),
            _ => None,
        }
    }
}

/// The closed set of actions that can move a deposit through its lifecycle.
/// Events that do not mutate the balance have no conversion into this enum,
/// so an "unknown action kind" is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Initial funding (or any liquidity arriving while open).
    Deposit,
    /// Liquidity leaving through intent fulfillment, deposit still open.
    Exchange,
    /// The deposit was closed by the contract.
    Close,
    /// The owner revoked the deposit.
    Withdraw,
}

/// Post-mutation view of a deposit, as the transition rules see it.
#[derive(Debug, Clone, Copy)]
pub struct DepositSnapshot {
    pub remaining: I256,
    pub min_amount: U256,
    pub status: DepositStatus,
}

/// Compute the next status for `action` applied to the post-mutation
/// snapshot. Pure; callers persist the result together with the balance.
pub fn next_status(
    action: LifecycleAction,
    snapshot: &DepositSnapshot,
    min_viable_unit: U256,
) -> DepositStatus {
    match action {
        LifecycleAction::Deposit | LifecycleAction::Exchange => {
            // A non-active deposit is never re-activated by liquidity events.
            if snapshot.status != DepositStatus::Active {
                return snapshot.status;
            }
            let underfunded = snapshot.remaining < i256_of(min_viable_unit)
                || snapshot.remaining < i256_of(snapshot.min_amount);
            if underfunded {
                DepositStatus::Underfunded
            } else {
                DepositStatus::Active
            }
        }
        LifecycleAction::Close => match snapshot.status {
            DepositStatus::Active | DepositStatus::Underfunded => DepositStatus::Closed,
            other => other,
        },
        LifecycleAction::Withdraw => match snapshot.status {
            // Withdrawal after close records the amount but never leaves
            // the closed state.
            DepositStatus::Closed => DepositStatus::Closed,
            _ => DepositStatus::Withdrawn,
        },
    }
}

fn i256_of(value: U256) -> I256 {
    I256::try_from(value).unwrap_or(I256::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(remaining: i64, min: u64, status: DepositStatus) -> DepositSnapshot {
        DepositSnapshot {
            remaining: I256::try_from(remaining).unwrap(),
            min_amount: U256::from(min),
            status,
        }
    }

    const UNIT: u64 = 1;

    #[test]
    fn funded_active_deposit_stays_active() {
        let next = next_status(
            LifecycleAction::Deposit,
            &snap(1_000, 100, DepositStatus::Active),
            U256::from(UNIT),
        );
        assert_eq!(next, DepositStatus::Active);
    }

    #[test]
    fn balance_below_min_amount_goes_underfunded() {
        let next = next_status(
            LifecycleAction::Exchange,
            &snap(50, 100, DepositStatus::Active),
            U256::from(UNIT),
        );
        assert_eq!(next, DepositStatus::Underfunded);
    }

    #[test]
    fn balance_below_one_unit_goes_underfunded() {
        let next = next_status(
            LifecycleAction::Exchange,
            &snap(0, 0, DepositStatus::Active),
            U256::from(UNIT),
        );
        assert_eq!(next, DepositStatus::Underfunded);
    }

    #[test]
    fn liquidity_events_never_reactivate() {
        for status in [
            DepositStatus::Underfunded,
            DepositStatus::Closed,
            DepositStatus::Withdrawn,
        ] {
            let next = next_status(
                LifecycleAction::Deposit,
                &snap(10_000, 100, status),
                U256::from(UNIT),
            );
            assert_eq!(next, status, "{status:?} must not re-evaluate");
            let next = next_status(
                LifecycleAction::Exchange,
                &snap(10_000, 100, status),
                U256::from(UNIT),
            );
            assert_eq!(next, status, "{status:?} must not re-evaluate");
        }
    }

    #[test]
    fn close_absorbs_open_states_only() {
        for (status, expected) in [
            (DepositStatus::Active, DepositStatus::Closed),
            (DepositStatus::Underfunded, DepositStatus::Closed),
            (DepositStatus::Closed, DepositStatus::Closed),
            (DepositStatus::Withdrawn, DepositStatus::Withdrawn),
        ] {
            let next = next_status(
                LifecycleAction::Close,
                &snap(0, 100, status),
                U256::from(UNIT),
            );
            assert_eq!(next, expected);
        }
    }

    #[test]
    fn withdraw_is_terminal_except_after_close() {
        for (status, expected) in [
            (DepositStatus::Active, DepositStatus::Withdrawn),
            (DepositStatus::Underfunded, DepositStatus::Withdrawn),
            (DepositStatus::Withdrawn, DepositStatus::Withdrawn),
            (DepositStatus::Closed, DepositStatus::Closed),
        ] {
            let next = next_status(
                LifecycleAction::Withdraw,
                &snap(0, 100, status),
                U256::from(UNIT),
            );
            assert_eq!(next, expected);
        }
    }

    #[test]
    fn status_roundtrips_through_strings() {
        for status in [
            DepositStatus::Active,
            DepositStatus::Underfunded,
            DepositStatus::Closed,
            DepositStatus::Withdrawn,
        ] {
            assert_eq!(DepositStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DepositStatus::from_str("drained"), None);
    }
}
