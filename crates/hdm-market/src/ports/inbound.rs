//! # Driving Port (API - Inbound)
//!
//! The public surface of the marketplace. Both purchase-ordering variants
//! implement this trait, so the exploit collaborator (and the test suite)
//! can drive either through the same interface.
//!
//! Caller identity is an explicit first argument on every operation — there
//! is no ambient "current caller"; identity travels with the call the same
//! way envelope identity travels with a message.

use crate::domain::entities::{HealthRecord, PurchaseReceipt, RecordRef};
use crate::domain::value_objects::{Address, Amount, DataHash, RecordId, Timestamp};
use crate::errors::MarketError;
use async_trait::async_trait;

/// Primary API of the health-data marketplace.
///
/// Every operation either completes and commits, or fails with a
/// [`MarketError`] and no partial state change.
#[async_trait]
pub trait HealthDataApi: Send + Sync {
    /// Lists a new record owned by `caller` and returns its id.
    ///
    /// The record starts for-sale with an empty access list. Price and
    /// expiration are not constrained here; they are enforced at purchase
    /// time.
    async fn add_health_data(
        &self,
        caller: Address,
        name: &str,
        data_hash: DataHash,
        price: Amount,
        expiration: Timestamp,
    ) -> Result<RecordId, MarketError>;

    /// All records owned by `caller`, in creation order.
    async fn get_all_my_health_records(&self, caller: Address) -> Vec<HealthRecord>;

    /// All records, across all owners, shared with `caller`.
    async fn get_all_records_shared_with_me(&self, caller: Address) -> Vec<HealthRecord>;

    /// Records of `patient` visible to `caller`: the owner sees everything,
    /// anyone else sees the subset they are authorized on.
    ///
    /// # Errors
    ///
    /// [`MarketError::Unauthorized`] when a non-owner caller is authorized
    /// on none of them.
    async fn get_health_data_of_patient(
        &self,
        caller: Address,
        patient: Address,
    ) -> Result<Vec<HealthRecord>, MarketError>;

    /// Positional lookup into `owner`'s record list.
    ///
    /// # Errors
    ///
    /// [`MarketError::RecordIndexOutOfRange`] past the end of the list.
    async fn get_record(&self, owner: Address, index: usize)
        -> Result<HealthRecord, MarketError>;

    /// Grants `grantee` access to the addressed record. Idempotent.
    async fn grant_access(
        &self,
        caller: Address,
        target: RecordRef,
        grantee: Address,
    ) -> Result<(), MarketError>;

    /// Revokes `grantee`'s access to the addressed record. Idempotent.
    async fn revoke_access(
        &self,
        caller: Address,
        target: RecordRef,
        grantee: Address,
    ) -> Result<(), MarketError>;

    /// The union of access lists across `owner`'s records.
    async fn get_access_list(&self, owner: Address) -> Vec<Address>;

    /// Purchases `(owner, record_id)` for `caller`, offering `paid_amount`.
    ///
    /// On success exactly `price` units move from `caller` to `owner` and a
    /// `DataPurchased` event is emitted once.
    ///
    /// # Errors
    ///
    /// * [`MarketError::RecordNotFound`] for an unknown `(owner, id)` pair.
    /// * [`MarketError::Expired`] at or past the record's expiration.
    /// * [`MarketError::InsufficientFunds`] when `paid_amount` is below the
    ///   price or the buyer's balance cannot cover it.
    /// * [`MarketError::ReentrantCall`] from the secure variant's guard when
    ///   re-entered.
    async fn purchase_data(
        &self,
        caller: Address,
        owner: Address,
        record_id: RecordId,
        paid_amount: Amount,
    ) -> Result<PurchaseReceipt, MarketError>;

    /// Narrow, record-bound transfer: pays `to` the exact price of a record
    /// of theirs that `caller` holds an explicit grant on.
    ///
    /// # Errors
    ///
    /// * [`MarketError::Unauthorized`] when no record of `to` carries a
    ///   grant for `caller`.
    /// * [`MarketError::IncorrectAmount`] unless `amount` equals that
    ///   record's price exactly.
    /// * [`MarketError::InsufficientFunds`] when `caller` cannot cover it.
    async fn transfer_with_access(
        &self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), MarketError>;

    /// Current ledger balance of `who`, zero for unseen identities.
    async fn balance_of(&self, who: Address) -> Amount;
}
