//! # Domain Invariants
//!
//! Critical invariants that MUST hold across the marketplace state.
//! Checked at runtime by the test suites; the exploit demonstration works by
//! showing exactly which of these the interactions-before-effects ordering
//! breaks.

use crate::domain::ledger::BalanceLedger;
use crate::domain::records::RecordStore;
use crate::domain::value_objects::{Address, Amount, RecordId};

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Conservation: the sum of all balances equals the minted supply.
///
/// Holds across every operation except the initial mint itself, because a
/// transfer's debit and credit are one indivisible step.
#[must_use]
pub fn check_conservation_invariant(ledger: &BalanceLedger) -> bool {
    let sum = ledger
        .snapshot()
        .iter()
        .fold(Amount::ZERO, |acc, (_, balance)| acc.saturating_add(*balance));
    sum == ledger.total_minted()
}

/// No balance is below zero.
///
/// The checked transfer path guarantees this; the unchecked settlement path
/// can violate it, which is what the re-entrancy exploit makes visible.
#[must_use]
pub fn check_overdraft_invariant(ledger: &BalanceLedger) -> bool {
    ledger
        .snapshot()
        .iter()
        .all(|(_, balance)| !balance.is_negative())
}

/// Record ids are unique and the per-owner index agrees with the id map.
#[must_use]
pub fn check_record_index_invariant(store: &RecordStore) -> bool {
    let all = store.all_records();

    // Ids unique and strictly increasing in creation order.
    let ascending = all.windows(2).all(|pair| pair[0].id < pair[1].id);
    if !ascending {
        return false;
    }

    // Every owner's listing is exactly the id-ordered subset it owns.
    let mut owners: Vec<Address> = all.iter().map(|record| record.owner).collect();
    owners.sort_unstable();
    owners.dedup();
    owners.into_iter().all(|owner| {
        let listed: Vec<RecordId> = store
            .records_owned_by(owner)
            .iter()
            .map(|record| record.id)
            .collect();
        let expected: Vec<RecordId> = all
            .iter()
            .filter(|record| record.owner == owner)
            .map(|record| record.id)
            .collect();
        listed == expected
    })
}

/// Check all invariants at once.
#[must_use]
pub fn check_all_invariants(ledger: &BalanceLedger, store: &RecordStore) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_conservation_invariant(ledger) {
        let sum = ledger
            .snapshot()
            .iter()
            .fold(Amount::ZERO, |acc, (_, balance)| acc.saturating_add(*balance));
        violations.push(InvariantViolation::ConservationViolated {
            minted: ledger.total_minted(),
            sum,
        });
    }

    for (account, balance) in ledger.snapshot() {
        if balance.is_negative() {
            violations.push(InvariantViolation::OverdrawnAccount { account, balance });
        }
    }

    if !check_record_index_invariant(store) {
        violations.push(InvariantViolation::RecordIndexInconsistent);
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Balances no longer sum to the minted supply.
    ConservationViolated {
        /// What was minted.
        minted: Amount,
        /// What the balances sum to.
        sum: Amount,
    },
    /// An account balance went below zero.
    OverdrawnAccount {
        /// The overdrawn account.
        account: Address,
        /// Its (negative) balance.
        balance: Amount,
    },
    /// The record id map and owner index disagree.
    RecordIndexInconsistent,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConservationViolated { minted, sum } => {
                write!(f, "conservation violated: minted {minted}, balances sum to {sum}")
            }
            Self::OverdrawnAccount { account, balance } => {
                write!(f, "account {account} overdrawn: balance {balance}")
            }
            Self::RecordIndexInconsistent => {
                write!(f, "record id map and owner index disagree")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
