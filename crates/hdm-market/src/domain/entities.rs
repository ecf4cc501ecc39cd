//! # Domain Entities
//!
//! Core entities of the marketplace: the health record itself, the two ways
//! of addressing one, and the receipt a successful purchase produces.

use crate::domain::value_objects::{Address, Amount, DataHash, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// HEALTH RECORD
// =============================================================================

/// A health-data record listed on the marketplace.
///
/// Created once, never deleted. After creation the only mutable field is
/// `access_list`; in particular `owner` never changes — a purchase moves
/// balance, not ownership of the record entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Globally unique id, 1-based, assigned at creation.
    pub id: RecordId,
    /// Free-text label.
    pub name: String,
    /// Opaque content fingerprint; not validated.
    pub data_hash: DataHash,
    /// Asking price in ledger units.
    pub price: Amount,
    /// True at creation; no operation in scope flips it.
    pub is_for_sale: bool,
    /// The creating account. Immutable.
    pub owner: Address,
    /// Absolute expiry; the record is purchasable strictly before this.
    pub expiration: Timestamp,
    /// Identities explicitly granted access. The owner is implicitly
    /// always authorized and is not stored here.
    pub access_list: BTreeSet<Address>,
}

impl HealthRecord {
    /// Returns true once `now` has reached or passed the expiration.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expiration
    }

    /// Returns true iff `identity` is the owner or has an explicit grant.
    #[must_use]
    pub fn grants_access_to(&self, identity: Address) -> bool {
        identity == self.owner || self.access_list.contains(&identity)
    }
}

// =============================================================================
// RECORD REFERENCE (two addressing modes)
// =============================================================================

/// How a caller addresses a record for access-control operations.
///
/// Id-addressing is primary. Owner-addressing is the legacy single-record
/// mode and only resolves when that owner has exactly one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordRef {
    /// Address a record by its globally unique id.
    Id(RecordId),
    /// Address an owner's sole record (legacy mode).
    Owner(Address),
}

// =============================================================================
// PURCHASE RECEIPT
// =============================================================================

/// The result of a successful `purchase_data` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// The buying account.
    pub purchaser: Address,
    /// The record's owner (the account credited).
    pub owner: Address,
    /// The purchased record.
    pub record_id: RecordId,
    /// The price actually settled.
    pub price: Amount,
}

// =============================================================================
// TESTS
// =============================================================================
