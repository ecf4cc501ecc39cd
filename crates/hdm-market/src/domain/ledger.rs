//! # Balance Ledger
//!
//! Fungible unit-of-account ledger: mint-on-init, zero-default balances for
//! unseen identities, and atomic debit/credit transfers.
//!
//! The checked [`transfer`](BalanceLedger::transfer) keeps every balance
//! non-negative. [`transfer_unchecked`](BalanceLedger::transfer_unchecked)
//! applies the debit/credit pair without re-checking sufficiency; it exists
//! for an engine that validated the debit *before* an external interaction,
//! and it is the lever the interactions-before-effects purchase ordering
//! mis-uses.

use crate::domain::value_objects::{Address, Amount};
use crate::errors::LedgerError;
use std::collections::HashMap;
use std::sync::RwLock;

/// The fungible-balance ledger.
///
/// Both balance updates of a transfer happen under one write lock, so no
/// intermediate state is ever observable.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    inner: RwLock<LedgerInner>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    balances: HashMap<Address, Amount>,
    minted: Option<Amount>,
}

impl BalanceLedger {
    /// Creates an empty ledger. No supply exists until
    /// [`mint_initial_supply`](Self::mint_initial_supply) runs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits the one-shot initial supply to `to`.
    ///
    /// # Errors
    ///
    /// * [`LedgerError::SupplyAlreadyMinted`] on a second call.
    /// * [`LedgerError::NegativeAmount`] for a negative supply.
    pub fn mint_initial_supply(&self, to: Address, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        let mut inner = self.inner.write().unwrap();
        if inner.minted.is_some() {
            return Err(LedgerError::SupplyAlreadyMinted);
        }
        inner.minted = Some(amount);
        let balance = inner.balances.entry(to).or_insert(Amount::ZERO);
        *balance = balance.saturating_add(amount);
        Ok(())
    }

    /// Returns the current balance, zero for identities never seen.
    #[must_use]
    pub fn balance_of(&self, who: Address) -> Amount {
        self.inner
            .read()
            .unwrap()
            .balances
            .get(&who)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Moves `amount` from `from` to `to`, debit and credit as one
    /// indivisible step.
    ///
    /// # Errors
    ///
    /// * [`LedgerError::NegativeAmount`] for a negative amount.
    /// * [`LedgerError::InsufficientFunds`] when `from` holds less than
    ///   `amount`; nothing is changed in that case.
    pub fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        let mut inner = self.inner.write().unwrap();
        let available = inner.balances.get(&from).copied().unwrap_or(Amount::ZERO);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        Self::apply(&mut inner, from, to, amount);
        Ok(())
    }

    /// Moves `amount` from `from` to `to` without the sufficiency check.
    ///
    /// The caller is responsible for having validated the debit beforehand.
    /// If that validation happened before an external call handed control
    /// away, the debit can overdraw `from` — the resulting negative balance
    /// is exactly what the invariant checker reports.
    ///
    /// # Errors
    ///
    /// * [`LedgerError::NegativeAmount`] for a negative amount.
    pub fn transfer_unchecked(
        &self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        let mut inner = self.inner.write().unwrap();
        Self::apply(&mut inner, from, to, amount);
        Ok(())
    }

    /// Returns the total minted supply, zero before the initial mint.
    #[must_use]
    pub fn total_minted(&self) -> Amount {
        self.inner.read().unwrap().minted.unwrap_or(Amount::ZERO)
    }

    /// Returns every known account and its balance, ordered by address.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Address, Amount)> {
        let inner = self.inner.read().unwrap();
        let mut accounts: Vec<_> = inner.balances.iter().map(|(a, b)| (*a, *b)).collect();
        accounts.sort_by_key(|(addr, _)| *addr);
        accounts
    }

    fn apply(inner: &mut LedgerInner, from: Address, to: Address, amount: Amount) {
        {
            let debit = inner.balances.entry(from).or_insert(Amount::ZERO);
            *debit = debit.saturating_sub(amount);
        }
        let credit = inner.balances.entry(to).or_insert(Amount::ZERO);
        *credit = credit.saturating_add(amount);
    }
}

// =============================================================================
// TESTS
// =============================================================================
