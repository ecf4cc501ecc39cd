//! # Marketplace Services
//!
//! The purchase/transfer engines behind
//! [`HealthDataApi`](crate::ports::inbound::HealthDataApi):
//!
//! - [`secure::HealthDataMarket`] — checks-effects-interactions ordering
//!   plus an in-progress guard; the ordering every deployment should have.
//! - [`vulnerable::VulnerableHealthDataMarket`] — interactions-before-effects
//!   ordering with the guard deliberately omitted. Kept so the exploit
//!   collaborator can demonstrate, side by side, what the secure ordering
//!   prevents.
//!
//! Shared configuration, statistics, the RAII guard, and the read/transfer
//! logic both engines have in common live here.

pub mod secure;
pub mod vulnerable;

pub use secure::HealthDataMarket;
pub use vulnerable::VulnerableHealthDataMarket;

use crate::adapters::{InMemoryEventLog, ManualClock, RecordingDelivery};
use crate::domain::entities::HealthRecord;
use crate::domain::ledger::BalanceLedger;
use crate::domain::records::RecordStore;
use crate::domain::value_objects::{Address, Amount, RecordId, Timestamp};
use crate::errors::MarketError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Marketplace configuration.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// The deployer account credited with the initial supply.
    pub treasury: Address,
    /// The one-shot supply minted at construction.
    pub initial_supply: Amount,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            treasury: Address::new([0x01; 20]),
            initial_supply: Amount::new(1_000_000),
        }
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Running counters kept by each engine.
#[derive(Debug, Default, Clone)]
pub struct MarketStats {
    /// Records listed.
    pub records_created: u64,
    /// Purchases settled.
    pub purchases_completed: u64,
    /// Purchases rejected (not found, expired, underpaid, re-entered).
    pub purchases_rejected: u64,
    /// Access grants that changed an access list.
    pub access_grants: u64,
    /// Access revocations that changed an access list.
    pub access_revocations: u64,
    /// Record-bound transfers settled.
    pub access_transfers: u64,
    /// Total units settled through purchases.
    pub volume_settled: Amount,
}

// =============================================================================
// RE-ENTRANCY GUARD (RAII)
// =============================================================================

/// In-progress flag for one operation class, released on drop.
///
/// Drop-based release keeps the flag correct on every exit path, early
/// returns included.
#[derive(Debug)]
pub(crate) struct OperationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> OperationGuard<'a> {
    /// Acquires the guard, rejecting nested entry.
    ///
    /// # Errors
    ///
    /// [`MarketError::ReentrantCall`] when the flag is already held.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self, MarketError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .is_err()
        {
            return Err(MarketError::ReentrantCall);
        }
        Ok(Self { flag })
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// =============================================================================
// SHARED READ / TRANSFER LOGIC
// =============================================================================

/// Records of `patient` visible to `caller`.
pub(crate) fn visible_patient_records(
    store: &RecordStore,
    caller: Address,
    patient: Address,
) -> Result<Vec<HealthRecord>, MarketError> {
    let records = store.records_owned_by(patient);
    if caller == patient {
        return Ok(records);
    }
    let visible: Vec<HealthRecord> = records
        .into_iter()
        .filter(|record| record.access_list.contains(&caller))
        .collect();
    if visible.is_empty() {
        return Err(MarketError::Unauthorized);
    }
    Ok(visible)
}

/// The record-bound transfer behind `transfer_with_access`: pays `to` the
/// exact price of the first record of theirs carrying a grant for `caller`.
pub(crate) fn record_bound_transfer(
    store: &RecordStore,
    ledger: &BalanceLedger,
    caller: Address,
    to: Address,
    amount: Amount,
) -> Result<RecordId, MarketError> {
    let bound = store
        .records_owned_by(to)
        .into_iter()
        .find(|record| record.access_list.contains(&caller))
        .ok_or(MarketError::Unauthorized)?;
    if amount != bound.price {
        return Err(MarketError::IncorrectAmount);
    }
    ledger.transfer(caller, to, amount)?;
    Ok(bound.id)
}

// =============================================================================
// TEST WIRING
// =============================================================================

/// A market wired to a manual clock and in-memory observers.
pub struct TestMarket<M> {
    /// The engine under test.
    pub market: Arc<M>,
    /// Manual clock, starts at the epoch.
    pub clock: Arc<ManualClock>,
    /// Captures every published event.
    pub events: Arc<InMemoryEventLog>,
    /// Captures every delivery.
    pub delivery: Arc<RecordingDelivery>,
}

/// Wires a secure market for tests and demos.
///
/// # Panics
///
/// Only if `config` carries a negative initial supply.
#[must_use]
pub fn create_test_market(config: MarketConfig) -> TestMarket<HealthDataMarket> {
    let clock = Arc::new(ManualClock::at(Timestamp::EPOCH));
    let events = Arc::new(InMemoryEventLog::new());
    let delivery = Arc::new(RecordingDelivery::new());
    let market = Arc::new(
        HealthDataMarket::new(config, clock.clone(), delivery.clone(), events.clone())
            .expect("valid test config"),
    );
    TestMarket {
        market,
        clock,
        events,
        delivery,
    }
}

/// Wires a vulnerable market for tests and demos.
///
/// # Panics
///
/// Only if `config` carries a negative initial supply.
#[must_use]
pub fn create_test_vulnerable_market(
    config: MarketConfig,
) -> TestMarket<VulnerableHealthDataMarket> {
    let clock = Arc::new(ManualClock::at(Timestamp::EPOCH));
    let events = Arc::new(InMemoryEventLog::new());
    let delivery = Arc::new(RecordingDelivery::new());
    let market = Arc::new(
        VulnerableHealthDataMarket::new(config, clock.clone(), delivery.clone(), events.clone())
            .expect("valid test config"),
    );
    TestMarket {
        market,
        clock,
        events,
        delivery,
    }
}

// =============================================================================
// TESTS
// =============================================================================
