//! # Secure Purchase Engine
//!
//! Checks-effects-interactions ordering: every validation and every ledger
//! write completes before control is handed to the delivery gateway, and an
//! in-progress guard rejects nested purchase entry outright. A re-entrant
//! call therefore observes fully settled balances — repeated re-entry cannot
//! double-spend.

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
use crate::service::{
    record_bound_transfer, visible_patient_records, MarketConfig, MarketStats, OperationGuard,
};

use async_trait::async_trait;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// The marketplace with the ordering a deployment should have.
pub struct HealthDataMarket {
    config: MarketConfig,
    ledger: Arc<BalanceLedger>,
    store: Arc<RecordStore>,
    access: AccessControl,
    clock: Arc<dyn Clock>,
    delivery: Arc<dyn DeliveryGateway>,
    events: Arc<dyn EventSink>,
    stats: RwLock<MarketStats>,
    /// In-progress flag for the purchase operation class.
    purchase_guard: AtomicBool,
}

impl HealthDataMarket {
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
            purchase_guard: AtomicBool::new(false),
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

    /// Validation and ledger effects, all before any external call.
    fn settle_checked(
        &self,
        caller: Address,
        owner: Address,
        record_id: RecordId,
        paid_amount: Amount,
    ) -> Result<HealthRecord, MarketError> {
        let record = self.store.record(owner, record_id)?;
        validate_purchase(&record, self.clock.now(), paid_amount)?;
        self.ledger.transfer(caller, owner, record.price)?;
        Ok(record)
    }

    async fn note_rejected(&self) {
        self.stats.write().await.purchases_rejected += 1;
    }
}

#[async_trait]
impl HealthDataApi for HealthDataMarket {
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

    #[instrument(skip(self), fields(caller = %caller, grantee = %grantee))]
    async fn grant_access(
        &self,
        caller: Address,
        target: RecordRef,
        grantee: Address,
    ) -> Result<(), MarketError> {
        let change = self.access.grant(caller, &target, grantee).map_err(|err| {
            warn!(%err, "grant rejected");
            err
        })?;
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

    #[instrument(skip(self), fields(caller = %caller, grantee = %grantee))]
    async fn revoke_access(
        &self,
        caller: Address,
        target: RecordRef,
        grantee: Address,
    ) -> Result<(), MarketError> {
        let change = self.access.revoke(caller, &target, grantee).map_err(|err| {
            warn!(%err, "revoke rejected");
            err
        })?;
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
        // Held across the external delivery call: nested entry is rejected
        // before it can observe anything.
        let _guard = match OperationGuard::acquire(&self.purchase_guard) {
            Ok(guard) => guard,
            Err(err) => {
                warn!("purchase re-entered while in progress");
                self.note_rejected().await;
                return Err(err);
            }
        };

        // Checks, then effects. The ledger write is the last fallible step.
        let record = match self.settle_checked(caller, owner, record_id, paid_amount) {
            Ok(record) => record,
            Err(err) => {
                self.note_rejected().await;
                return Err(err);
            }
        };

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

        // Interactions last: control leaves the market only with state final.
        self.delivery
            .deliver(DataDelivery {
                purchaser: caller,
                owner,
                record_id,
                data_hash: record.data_hash.clone(),
            })
            .await;

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
