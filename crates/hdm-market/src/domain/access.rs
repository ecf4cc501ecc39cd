//! # Access Control
//!
//! Per-record discretionary access lists over the [`RecordStore`].
//!
//! Grant and revoke are owner-only and idempotent. The `*_unchecked`
//! variants skip the owner check; they exist because the vulnerable contract
//! variant historically shipped without it, and its regression tests assert
//! an unauthorized grant goes through.
//!
//! Authorization always reads the current committed store state — there is
//! no cached copy of an access list anywhere.

use crate::domain::entities::{HealthRecord, RecordRef};
use crate::domain::records::RecordStore;
use crate::domain::value_objects::{Address, RecordId};
use crate::errors::MarketError;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The outcome of a grant or revoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessChange {
    /// The affected record.
    pub record_id: RecordId,
    /// That record's owner.
    pub owner: Address,
    /// Whether the access set actually changed (false for idempotent repeats).
    pub changed: bool,
}

/// Access-list management gating record reads and mutation.
#[derive(Clone, Debug)]
pub struct AccessControl {
    store: Arc<RecordStore>,
}

impl AccessControl {
    /// Creates an access-control layer over `store`.
    #[must_use]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Adds `grantee` to the addressed record's access list.
    ///
    /// # Errors
    ///
    /// * [`MarketError::Unauthorized`] unless `caller` owns the record.
    /// * Resolution errors from [`RecordStore::resolve`].
    pub fn grant(
        &self,
        caller: Address,
        target: &RecordRef,
        grantee: Address,
    ) -> Result<AccessChange, MarketError> {
        let record = self.store.resolve(target)?;
        if record.owner != caller {
            return Err(MarketError::Unauthorized);
        }
        self.apply(&record, |acl| acl.insert(grantee))
    }

    /// Adds `grantee` without checking who asked.
    ///
    /// # Errors
    ///
    /// Resolution errors from [`RecordStore::resolve`].
    pub fn grant_unchecked(
        &self,
        target: &RecordRef,
        grantee: Address,
    ) -> Result<AccessChange, MarketError> {
        let record = self.store.resolve(target)?;
        self.apply(&record, |acl| acl.insert(grantee))
    }

    /// Removes `grantee` from the addressed record's access list.
    /// Removing an absent grantee is a no-op.
    ///
    /// # Errors
    ///
    /// * [`MarketError::Unauthorized`] unless `caller` owns the record.
    /// * Resolution errors from [`RecordStore::resolve`].
    pub fn revoke(
        &self,
        caller: Address,
        target: &RecordRef,
        grantee: Address,
    ) -> Result<AccessChange, MarketError> {
        let record = self.store.resolve(target)?;
        if record.owner != caller {
            return Err(MarketError::Unauthorized);
        }
        self.apply(&record, |acl| acl.remove(&grantee))
    }

    /// Removes `grantee` without checking who asked.
    ///
    /// # Errors
    ///
    /// Resolution errors from [`RecordStore::resolve`].
    pub fn revoke_unchecked(
        &self,
        target: &RecordRef,
        grantee: Address,
    ) -> Result<AccessChange, MarketError> {
        let record = self.store.resolve(target)?;
        self.apply(&record, |acl| acl.remove(&grantee))
    }

    /// Returns true iff `identity` is the record's owner or holds a grant.
    #[must_use]
    pub fn is_authorized(&self, identity: Address, record: &HealthRecord) -> bool {
        record.grants_access_to(identity)
    }

    /// Union of access lists across all of `owner`'s records, deduplicated
    /// and ordered. The legacy owner-level read shape.
    #[must_use]
    pub fn access_list_of(&self, owner: Address) -> Vec<Address> {
        let mut union = BTreeSet::new();
        for record in self.store.records_owned_by(owner) {
            union.extend(record.access_list);
        }
        union.into_iter().collect()
    }

    fn apply(
        &self,
        record: &HealthRecord,
        mutate: impl FnOnce(&mut BTreeSet<Address>) -> bool,
    ) -> Result<AccessChange, MarketError> {
        let changed = self.store.update_access_list(record.id, mutate)?;
        Ok(AccessChange {
            record_id: record.id,
            owner: record.owner,
            changed,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
