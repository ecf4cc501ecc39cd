//! # Event Schema
//!
//! Payloads published through the [`EventSink`](crate::ports::outbound::EventSink)
//! port whenever the marketplace commits an externally observable effect.
//! `DataPurchased` is emitted exactly once per successful purchase;
//! `AccessGranted`/`AccessRevoked` only fire when the access set actually
//! changed (idempotent repeats are silent).

use crate::domain::value_objects::{Address, Amount, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

// =============================================================================
// TOPICS
// =============================================================================

/// Stable topic names for event filtering.
pub mod topics {
    /// A record was listed.
    pub const HEALTH_DATA_ADDED: &str = "health_data_added";
    /// An identity was added to a record's access list.
    pub const ACCESS_GRANTED: &str = "access_granted";
    /// An identity was removed from a record's access list.
    pub const ACCESS_REVOKED: &str = "access_revoked";
    /// A purchase settled.
    pub const DATA_PURCHASED: &str = "data_purchased";
}

// =============================================================================
// EVENTS
// =============================================================================

/// An externally observable marketplace event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// A new record was listed by its owner.
    HealthDataAdded {
        /// The creating account.
        owner: Address,
        /// The freshly allocated id.
        record_id: RecordId,
        /// Asking price.
        price: Amount,
        /// Expiry of the listing.
        expiration: Timestamp,
    },

    /// An identity was granted access to a record.
    AccessGranted {
        /// The record's owner.
        owner: Address,
        /// The record in question.
        record_id: RecordId,
        /// The identity that gained access.
        grantee: Address,
    },

    /// An identity's access to a record was revoked.
    AccessRevoked {
        /// The record's owner.
        owner: Address,
        /// The record in question.
        record_id: RecordId,
        /// The identity that lost access.
        grantee: Address,
    },

    /// A purchase settled: `price` units moved from `purchaser` to `owner`.
    DataPurchased {
        /// The buying account.
        purchaser: Address,
        /// The record's owner (credited).
        owner: Address,
        /// The purchased record.
        record_id: RecordId,
        /// The settled price.
        price: Amount,
    },
}

impl MarketEvent {
    /// Returns the stable topic name for this event.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            MarketEvent::HealthDataAdded { .. } => topics::HEALTH_DATA_ADDED,
            MarketEvent::AccessGranted { .. } => topics::ACCESS_GRANTED,
            MarketEvent::AccessRevoked { .. } => topics::ACCESS_REVOKED,
            MarketEvent::DataPurchased { .. } => topics::DATA_PURCHASED,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
