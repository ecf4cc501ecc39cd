//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the marketplace depends on. Adapters implement these to
//! provide a time source, the external data-delivery interaction, and event
//! observation.
//!
//! `DeliveryGateway` is the one port that hands control to the outside
//! world mid-operation. Whether the engine invokes it before or after its
//! ledger effects is exactly the difference between the vulnerable and the
//! secure purchase ordering.

use crate::domain::value_objects::{Address, DataHash, RecordId, Timestamp};
use crate::events::MarketEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// CLOCK
// =============================================================================

/// Time source for expiration checks.
///
/// Injected so tests can drive expiry deterministically instead of
/// sleeping.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

// =============================================================================
// DATA DELIVERY (the external interaction)
// =============================================================================

/// What a successful purchase hands to the purchaser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDelivery {
    /// The buying account being notified.
    pub purchaser: Address,
    /// The record's owner.
    pub owner: Address,
    /// The purchased record.
    pub record_id: RecordId,
    /// The content fingerprint the purchaser paid for.
    pub data_hash: DataHash,
}

/// External delivery of purchased data to the buyer.
///
/// This call leaves the marketplace's control: the implementor may do
/// anything — including calling back into the marketplace before this
/// invocation returns. Implementations are notification hooks and cannot
/// fail; a committed purchase is never unwound by its delivery.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    /// Delivers the purchased fingerprint to the buyer.
    async fn deliver(&self, delivery: DataDelivery);
}

// =============================================================================
// EVENT SINK
// =============================================================================

/// Observer for committed marketplace events.
pub trait EventSink: Send + Sync {
    /// Publishes one committed event.
    fn publish(&self, event: MarketEvent);
}

// =============================================================================
// TESTS
// =============================================================================
