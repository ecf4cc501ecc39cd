//! # Record Store
//!
//! Keyed storage of health records: global 1-based id allocation, per-owner
//! listing in creation order, and the single sanctioned mutation path
//! (access-list updates).
//!
//! Id map, owner index, and the id counter live under one lock, so every
//! mutation is transactional with respect to the operation that issued it.

use crate::domain::entities::{HealthRecord, RecordRef};
use crate::domain::value_objects::{Address, Amount, DataHash, RecordId, Timestamp};
use crate::errors::MarketError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

/// Keyed storage for [`HealthRecord`]s.
#[derive(Debug, Default)]
pub struct RecordStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    /// All records, keyed by globally unique id (iteration = creation order).
    records: BTreeMap<RecordId, HealthRecord>,
    /// Per-owner ids in creation order.
    by_owner: HashMap<Address, Vec<RecordId>>,
    /// Last allocated id; the first record gets id 1.
    last_id: u64,
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new record owned by `owner` and returns it.
    ///
    /// Allocates the next global id, sets `is_for_sale = true` and an empty
    /// access list. Price and expiration are stored as given — validation is
    /// deferred to purchase time.
    pub fn add_record(
        &self,
        owner: Address,
        name: &str,
        data_hash: DataHash,
        price: Amount,
        expiration: Timestamp,
    ) -> HealthRecord {
        let mut inner = self.inner.write().unwrap();
        inner.last_id += 1;
        let record = HealthRecord {
            id: RecordId::new(inner.last_id),
            name: name.to_owned(),
            data_hash,
            price,
            is_for_sale: true,
            owner,
            expiration,
            access_list: BTreeSet::new(),
        };
        inner.by_owner.entry(owner).or_default().push(record.id);
        inner.records.insert(record.id, record.clone());
        record
    }

    /// Returns all records owned by `owner`, in creation order.
    #[must_use]
    pub fn records_owned_by(&self, owner: Address) -> Vec<HealthRecord> {
        let inner = self.inner.read().unwrap();
        inner
            .by_owner
            .get(&owner)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns all records, across all owners, whose access list contains
    /// `identity`. Global creation order.
    #[must_use]
    pub fn records_shared_with(&self, identity: Address) -> Vec<HealthRecord> {
        let inner = self.inner.read().unwrap();
        inner
            .records
            .values()
            .filter(|record| record.access_list.contains(&identity))
            .cloned()
            .collect()
    }

    /// Looks up the record with global id `id`, regardless of owner.
    #[must_use]
    pub fn record_by_id(&self, id: RecordId) -> Option<HealthRecord> {
        self.inner.read().unwrap().records.get(&id).cloned()
    }

    /// Looks up `(owner, id)`.
    ///
    /// # Errors
    ///
    /// [`MarketError::RecordNotFound`] when the id does not exist or the
    /// record is owned by someone else.
    pub fn record(&self, owner: Address, id: RecordId) -> Result<HealthRecord, MarketError> {
        self.record_by_id(id)
            .filter(|record| record.owner == owner)
            .ok_or(MarketError::RecordNotFound { owner, id })
    }

    /// Positional lookup into an owner's record list.
    ///
    /// # Errors
    ///
    /// [`MarketError::RecordIndexOutOfRange`] when `index` is past the end of
    /// that owner's list.
    pub fn record_at(&self, owner: Address, index: usize) -> Result<HealthRecord, MarketError> {
        let inner = self.inner.read().unwrap();
        inner
            .by_owner
            .get(&owner)
            .and_then(|ids| ids.get(index))
            .and_then(|id| inner.records.get(id).cloned())
            .ok_or(MarketError::RecordIndexOutOfRange { owner, index })
    }

    /// Resolves a [`RecordRef`] to the record it addresses.
    ///
    /// Id-addressing is primary. Owner-addressing is the legacy mode and
    /// resolves only when that owner has exactly one record.
    ///
    /// # Errors
    ///
    /// * [`MarketError::UnknownRecord`] for an id nobody owns.
    /// * [`MarketError::OwnerRefAmbiguous`] for owner-addressing an owner
    ///   with zero or several records.
    pub fn resolve(&self, target: &RecordRef) -> Result<HealthRecord, MarketError> {
        match *target {
            RecordRef::Id(id) => self
                .record_by_id(id)
                .ok_or(MarketError::UnknownRecord(id)),
            RecordRef::Owner(owner) => {
                let inner = self.inner.read().unwrap();
                let ids: &[RecordId] = inner.by_owner.get(&owner).map_or(&[], Vec::as_slice);
                match ids {
                    [only] => Ok(inner.records[only].clone()),
                    _ => Err(MarketError::OwnerRefAmbiguous {
                        owner,
                        count: ids.len(),
                    }),
                }
            }
        }
    }

    /// Applies `mutate` to the access list of record `id`.
    ///
    /// This is the only way stored record state changes after creation;
    /// every other field is immutable by construction.
    ///
    /// # Errors
    ///
    /// [`MarketError::UnknownRecord`] when no such record exists.
    pub fn update_access_list<R>(
        &self,
        id: RecordId,
        mutate: impl FnOnce(&mut BTreeSet<Address>) -> R,
    ) -> Result<R, MarketError> {
        let mut inner = self.inner.write().unwrap();
        inner
            .records
            .get_mut(&id)
            .map(|record| mutate(&mut record.access_list))
            .ok_or(MarketError::UnknownRecord(id))
    }

    /// Returns every stored record in global creation order.
    #[must_use]
    pub fn all_records(&self) -> Vec<HealthRecord> {
        self.inner.read().unwrap().records.values().cloned().collect()
    }

    /// Number of records ever created.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.inner.read().unwrap().records.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
