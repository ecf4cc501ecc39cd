//! # Domain Services
//!
//! Pure functions over domain types. No I/O, no locks.

use crate::domain::entities::HealthRecord;
use crate::domain::value_objects::{Amount, Timestamp};
use crate::errors::MarketError;

/// Validates a purchase attempt against a record.
///
/// Shared by both purchase orderings — what differs between them is *when*
/// the ledger effect happens relative to the external interaction, never
/// what gets validated.
///
/// # Errors
///
/// * [`MarketError::Expired`] once `now` reaches the record's expiration.
/// * [`MarketError::InsufficientFunds`] when the offer is below the price.
pub fn validate_purchase(
    record: &HealthRecord,
    now: Timestamp,
    paid_amount: Amount,
) -> Result<(), MarketError> {
    if record.is_expired(now) {
        return Err(MarketError::Expired);
    }
    if paid_amount < record.price {
        return Err(MarketError::InsufficientFunds);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
