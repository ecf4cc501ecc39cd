//! # Reentrancy Probe
//!
//! Attacker collaborator. The probe implements the [`DeliveryGateway`] port,
//! so a market wired to it hands the probe control mid-purchase; from inside
//! that callback the probe calls `purchase_data` again before the first
//! invocation has finished.
//!
//! Against the interactions-before-effects ordering the nested call sees
//! stale balances and lands a second debit. Against the
//! checks-effects-interactions ordering the nested call is rejected by the
//! re-entrancy guard — and would fail the balance check anyway, since the
//! first debit is already recorded by the time the probe runs.

use crate::domain::entities::PurchaseReceipt;
use crate::domain::value_objects::{Address, Amount, RecordId};
use crate::errors::MarketError;
use crate::ports::inbound::HealthDataApi;
use crate::ports::outbound::{DataDelivery, DeliveryGateway};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// The purchase the probe keeps re-entering.
#[derive(Clone, Copy, Debug)]
struct AttackPlan {
    owner: Address,
    record_id: RecordId,
    paid_amount: Amount,
}

/// A malicious buyer that re-enters the market from its delivery callback.
pub struct ReentrancyProbe {
    identity: Address,
    max_reentries: u32,
    target: RwLock<Option<Arc<dyn HealthDataApi>>>,
    plan: RwLock<Option<AttackPlan>>,
    reentries: AtomicU32,
    nested_outcomes: RwLock<Vec<Result<PurchaseReceipt, MarketError>>>,
}

impl ReentrancyProbe {
    /// Creates a probe acting as `identity`, re-entering at most
    /// `max_reentries` times per attack.
    #[must_use]
    pub fn new(identity: Address, max_reentries: u32) -> Self {
        Self {
            identity,
            max_reentries,
            target: RwLock::new(None),
            plan: RwLock::new(None),
            reentries: AtomicU32::new(0),
            nested_outcomes: RwLock::new(Vec::new()),
        }
    }

    /// The account the probe buys as.
    #[must_use]
    pub fn identity(&self) -> Address {
        self.identity
    }

    /// Runs the attack: buy `(owner, record_id)` from `target`, re-entering
    /// from inside the delivery callback.
    ///
    /// Returns the *outer* purchase result; nested results are collected in
    /// [`nested_outcomes`](Self::nested_outcomes).
    ///
    /// # Errors
    ///
    /// Whatever the outer `purchase_data` call fails with.
    pub async fn attack(
        &self,
        target: Arc<dyn HealthDataApi>,
        owner: Address,
        record_id: RecordId,
        paid_amount: Amount,
    ) -> Result<PurchaseReceipt, MarketError> {
        {
            *self.target.write().unwrap() = Some(target.clone());
            *self.plan.write().unwrap() = Some(AttackPlan {
                owner,
                record_id,
                paid_amount,
            });
            self.reentries.store(0, Ordering::SeqCst);
            self.nested_outcomes.write().unwrap().clear();
        }
        target
            .purchase_data(self.identity, owner, record_id, paid_amount)
            .await
    }

    /// How many times the probe re-entered during the last attack.
    #[must_use]
    pub fn reentries(&self) -> u32 {
        self.reentries.load(Ordering::SeqCst)
    }

    /// The outcomes of the nested (re-entrant) purchase calls.
    #[must_use]
    pub fn nested_outcomes(&self) -> Vec<Result<PurchaseReceipt, MarketError>> {
        self.nested_outcomes.read().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryGateway for ReentrancyProbe {
    async fn deliver(&self, delivery: DataDelivery) {
        if delivery.purchaser != self.identity {
            return;
        }
        let (target, plan) = {
            let target = self.target.read().unwrap().clone();
            let plan = *self.plan.read().unwrap();
            (target, plan)
        };
        let (Some(target), Some(plan)) = (target, plan) else {
            return;
        };
        if self.reentries.fetch_add(1, Ordering::SeqCst) >= self.max_reentries {
            self.reentries.fetch_sub(1, Ordering::SeqCst);
            return;
        }

        debug!(record_id = %plan.record_id, "probe re-entering purchase_data");
        let outcome = target
            .purchase_data(self.identity, plan.owner, plan.record_id, plan.paid_amount)
            .await;
        self.nested_outcomes.write().unwrap().push(outcome);
    }
}

// =============================================================================
// TESTS
// =============================================================================
