//! # Vulnerable Purchase Engine
//!
//! Interactions-before-effects ordering, kept side by side with the secure
//! engine so the re-entrancy exploit can be demonstrated rather than
//! described. Same public contract as
//! [`HealthDataMarket`](crate::service::secure::HealthDataMarket); the
//! deltas are:
//!
//! - `purchase_data` hands control to the delivery gateway *before* the
//!   ledger bookkeeping, and settles afterwards without re-checking — a
//!   re-entrant call observes stale balances and can over-spend the buyer.
//! - There is no in-progress guard.
//! - `grant_access`/`revoke_access` perform no owner check (the historical
//!   behavior this variant preserves; its regression test asserts an
//!   unauthorized grant goes through).
//!
//! Do not wire this engine to anything that matters.

use crate::domain::access::AccessControl;
use crate::domain::entities::{HealthRecord, PurchaseReceipt, RecordRef};
use crate::domain::ledger::BalanceLedger;
use crate::domain::records::RecordStore;
use crate::domain::services::validate_purchase;
use crate::domain::value_objects::{Address, Amount, DataHash, RecordId, Timestamp};
use crate::errors::MarketError;
use crate::events::MarketEvent;
use crate::ports::inbound::HealthDataApi;
use crate::ports::outbound::{Clock, DataDelivery, DeliveryGateway, EventSink};
use crate::service::{record_bound_transfer, visible_patient_records, MarketConfig, MarketStats};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// The marketplace with the ordering that loses money.
pub struct VulnerableHealthDataMarket {
    config: MarketConfig,
    ledger: Arc<BalanceLedger>,
    store: Arc<RecordStore>,
    access: AccessControl,
    clock: Arc<dyn Clock>,
    delivery: Arc<dyn DeliveryGateway>,
    events: Arc<dyn EventSink>,
    stats: RwLock<MarketStats>,
}

impl VulnerableHealthDataMarket {
    /// Builds a market and mints the initial supply to the treasury.
    ///
    /// # Errors
    ///
    /// [`MarketError::NegativeAmount`] for a negative initial supply.
    pub fn new(
        config: MarketConfig,
        clock: Arc<dyn Clock>,
        delivery: Arc<dyn DeliveryGateway>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, MarketError> {
        let ledger = Arc::new(BalanceLedger::new());
        ledger.mint_initial_supply(config.treasury, config.initial_supply)?;
        let store = Arc::new(RecordStore::new());
        let access = AccessControl::new(store.clone());
        Ok(Self {
            config,
            ledger,
            store,
            access,
            clock,
            delivery,
            events,
            stats: RwLock::new(MarketStats::default()),
        })
    }

    /// The configuration this market was built with.
    #[must_use]
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Handle to the underlying ledger (for observation and funding).
    #[must_use]
    pub fn ledger(&self) -> Arc<BalanceLedger> {
        self.ledger.clone()
    }

    /// Handle to the underlying record store (for observation).
    #[must_use]
    pub fn store(&self) -> Arc<RecordStore> {
        self.store.clone()
    }

    /// Current service statistics.
    pub async fn stats(&self) -> MarketStats {
        self.stats.read().await.clone()
    }

    /// Checks only — the ledger is read, never written. The gap between
    /// this and the later settlement is where control leaves the market.
    fn validate_only(
        &self,
        caller: Address,
        owner: Address,
        record_id: RecordId,
        paid_amount: Amount,
    ) -> Result<HealthRecord, MarketError> {
        let record = self.store.record(owner, record_id)?;
        validate_purchase(&record, self.clock.now(), paid_amount)?;
        let available = self.ledger.balance_of(caller);
        if available < record.price {
            return Err(MarketError::InsufficientFunds);
        }
        Ok(record)
    }

    async fn note_rejected(&self) {
        self.stats.write().await.purchases_rejected += 1;
    }
}

#[async_trait]
impl HealthDataApi for VulnerableHealthDataMarket {
    #[instrument(skip(self, data_hash), fields(caller = %caller))]
    async fn add_health_data(
        &self,
        caller: Address,
        name: &str,
        data_hash: DataHash,
        price: Amount,
        expiration: Timestamp,
    ) -> Result<RecordId, MarketError> {
        let record = self
            .store
            .add_record(caller, name, data_hash, price, expiration);
        self.events.publish(MarketEvent::HealthDataAdded {
            owner: caller,
            record_id: record.id,
            price,
            expiration,
        });
        self.stats.write().await.records_created += 1;
        info!(record_id = %record.id, "health data listed");
        Ok(record.id)
    }

    async fn get_all_my_health_records(&self, caller: Address) -> Vec<HealthRecord> {
        self.store.records_owned_by(caller)
    }

    async fn get_all_records_shared_with_me(&self, caller: Address) -> Vec<HealthRecord> {
        self.store.records_shared_with(caller)
    }

    async fn get_health_data_of_patient(
        &self,
        caller: Address,
        patient: Address,
    ) -> Result<Vec<HealthRecord>, MarketError> {
        visible_patient_records(&self.store, caller, patient)
    }

    async fn get_record(
        &self,
        owner: Address,
        index: usize,
    ) -> Result<HealthRecord, MarketError> {
        self.store.record_at(owner, index)
    }

    // No owner check here: anyone can grant on any record.
    #[instrument(skip(self), fields(caller = %caller, grantee = %grantee))]
    async fn grant_access(
        &self,
        caller: Address,
        target: RecordRef,
        grantee: Address,
    ) -> Result<(), MarketError> {
        let change = self.access.grant_unchecked(&target, grantee)?;
        if change.changed {
            self.events.publish(MarketEvent::AccessGranted {
                owner: change.owner,
                record_id: change.record_id,
                grantee,
            });
            self.stats.write().await.access_grants += 1;
        }
        Ok(())
    }

    // No owner check here either.
    #[instrument(skip(self), fields(caller = %caller, grantee = %grantee))]
    async fn revoke_access(
        &self,
        caller: Address,
        target: RecordRef,
        grantee: Address,
    ) -> Result<(), MarketError> {
        let change = self.access.revoke_unchecked(&target, grantee)?;
        if change.changed {
            self.events.publish(MarketEvent::AccessRevoked {
                owner: change.owner,
                record_id: change.record_id,
                grantee,
            });
            self.stats.write().await.access_revocations += 1;
        }
        Ok(())
    }

    async fn get_access_list(&self, owner: Address) -> Vec<Address> {
        self.access.access_list_of(owner)
    }

    #[instrument(skip(self), fields(caller = %caller, owner = %owner, record_id = %record_id))]
    async fn purchase_data(
        &self,
        caller: Address,
        owner: Address,
        record_id: RecordId,
        paid_amount: Amount,
    ) -> Result<PurchaseReceipt, MarketError> {
        let record = match self.validate_only(caller, owner, record_id, paid_amount) {
            Ok(record) => record,
            Err(err) => {
                warn!(%err, "purchase rejected");
                self.note_rejected().await;
                return Err(err);
            }
        };

        // Interaction first: the buyer gets control while the sufficiency
        // check above is the only thing standing between them and the
        // ledger. A nested purchase issued from this callback re-validates
        // against balances that do not yet reflect this purchase.
        self.delivery
            .deliver(DataDelivery {
                purchaser: caller,
                owner,
                record_id,
                data_hash: record.data_hash.clone(),
            })
            .await;

        // Effects after the interaction, without re-checking sufficiency —
        // it was "already validated" above.
        self.ledger.transfer_unchecked(caller, owner, record.price)?;

        self.events.publish(MarketEvent::DataPurchased {
            purchaser: caller,
            owner,
            record_id,
            price: record.price,
        });
        {
            let mut stats = self.stats.write().await;
            stats.purchases_completed += 1;
            stats.volume_settled = stats.volume_settled.saturating_add(record.price);
        }
        info!(price = %record.price, "purchase settled");

        Ok(PurchaseReceipt {
            purchaser: caller,
            owner,
            record_id,
            price: record.price,
        })
    }

    #[instrument(skip(self), fields(caller = %caller, to = %to))]
    async fn transfer_with_access(
        &self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), MarketError> {
        let record_id = record_bound_transfer(&self.store, &self.ledger, caller, to, amount)?;
        self.stats.write().await.access_transfers += 1;
        debug!(record_id = %record_id, "record-bound transfer settled");
        Ok(())
    }

    async fn balance_of(&self, who: Address) -> Amount {
        self.ledger.balance_of(who)
    }
}

// =============================================================================
// TESTS
// =============================================================================
