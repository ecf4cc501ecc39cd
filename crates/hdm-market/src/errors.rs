//! # Error Types
//!
//! All error types for the marketplace core.
//!
//! `LedgerError` carries ledger-layer diagnostics (required/available
//! figures); `MarketError` is the caller-visible taxonomy with fixed
//! messages. Every failure aborts the whole operation with no partial state
//! change, and none of these are fatal to the process.

use crate::domain::value_objects::{Address, Amount, RecordId};
use thiserror::Error;

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors from balance-ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Debit would exceed the available balance.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientFunds {
        /// Units the operation needed.
        required: Amount,
        /// Units the account actually held.
        available: Amount,
    },

    /// `mint_initial_supply` was called a second time.
    #[error("initial supply already minted")]
    SupplyAlreadyMinted,

    /// A transfer or mint was given a negative amount.
    #[error("negative amount: {0}")]
    NegativeAmount(Amount),
}

// =============================================================================
// MARKET ERRORS
// =============================================================================

/// Errors surfaced by the public marketplace operations.
///
/// The first five variants carry the fixed, caller-visible messages the
/// contract surface has always used; the rest are distinct by construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Payment below the asking price, or a debit exceeding the balance.
    #[error("Insufficient funds to purchase data")]
    InsufficientFunds,

    /// The record's expiration has passed.
    #[error("Data has expired")]
    Expired,

    /// Caller is neither the owner nor an authorized grantee.
    #[error("Unauthorized access")]
    Unauthorized,

    /// A record-bound transfer with the wrong amount.
    #[error("Incorrect amount for data access")]
    IncorrectAmount,

    /// A nested invocation was rejected by the re-entrancy guard.
    #[error("Reentrant call")]
    ReentrantCall,

    /// No record with this id exists at all.
    #[error("unknown record id {0}")]
    UnknownRecord(RecordId),

    /// The id exists but is not owned by the given owner, or does not exist.
    #[error("record {id} not found for owner {owner}")]
    RecordNotFound {
        /// Owner the caller addressed.
        owner: Address,
        /// Record id the caller addressed.
        id: RecordId,
    },

    /// A positional lookup past the end of an owner's record list.
    #[error("record index {index} out of range for owner {owner}")]
    RecordIndexOutOfRange {
        /// Owner whose list was indexed.
        owner: Address,
        /// The out-of-range index.
        index: usize,
    },

    /// Owner-addressed (legacy) access needs exactly one record.
    #[error("owner {owner} has {count} records; owner-addressed access needs exactly one")]
    OwnerRefAmbiguous {
        /// The addressed owner.
        owner: Address,
        /// How many records that owner actually has.
        count: usize,
    },

    /// The one-shot initial mint was attempted twice.
    #[error("initial supply can only be minted once")]
    SupplyAlreadyMinted,

    /// A negative amount reached the ledger.
    #[error("amount must be non-negative")]
    NegativeAmount,
}

impl From<LedgerError> for MarketError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { .. } => MarketError::InsufficientFunds,
            LedgerError::SupplyAlreadyMinted => MarketError::SupplyAlreadyMinted,
            LedgerError::NegativeAmount(_) => MarketError::NegativeAmount,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
