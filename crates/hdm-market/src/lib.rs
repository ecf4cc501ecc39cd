//! # HealthData-Market — Permissioned Health-Data Marketplace Core
//!
//! ## Purpose
//!
//! Models a permissioned marketplace for health-data records: every record
//! has an owner, a price, an expiration, and a discretionary access list;
//! records are bought with a fungible balance every account holds. The crate
//! ships the record store, the access-control layer, the balance ledger, and
//! *two* purchase engines — the checks-effects-interactions one a deployment
//! should run, and an interactions-before-effects one kept alongside the
//! attacker collaborator that exploits it, so the re-entrancy hazard can be
//! demonstrated rather than described.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Conservation (balances sum to minted supply) | `domain/ledger.rs` - debit+credit under one lock; `check_conservation_invariant()` |
//! | Non-negative balances | `domain/ledger.rs` - `transfer()` sufficiency check; `check_overdraft_invariant()` |
//! | Unique, never-reused record ids | `domain/records.rs` - `add_record()`; `check_record_index_invariant()` |
//! | Access lists are sets, mutation is owner-only | `domain/access.rs` - `grant()` / `revoke()` |
//! | Effects happen-before interactions | `service/secure.rs` - `purchase_data()` ordering + in-progress guard |
//!
//! The vulnerable engine (`service/vulnerable.rs`) intentionally violates
//! the last invariant, and omits both the guard and the access-mutation
//! owner check. It exists for the comparative exploit scenario in the test
//! suite; do not wire it to anything that matters.
//!
//! ## Failure Semantics
//!
//! Every public operation either commits entirely or fails with a
//! [`errors::MarketError`] and no partial state change. Nothing here is
//! fatal to the process.
//!
//! ## Usage Example
//!
//! ```ignore
//! use hdm_market::prelude::*;
//! use std::sync::Arc;
//!
//! let market = Arc::new(HealthDataMarket::new(
//!     MarketConfig::default(),
//!     Arc::new(SystemClock),
//!     Arc::new(NullDelivery),
//!     Arc::new(InMemoryEventLog::new()),
//! )?);
//!
//! let id = market
//!     .add_health_data(patient, "mydata", DataHash::from("0x7777"),
//!                      Amount::new(1), expiration)
//!     .await?;
//! let receipt = market.purchase_data(buyer, patient, id, Amount::new(1)).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Value objects
    pub use crate::domain::value_objects::{Address, Amount, DataHash, RecordId, Timestamp};

    // Entities
    pub use crate::domain::entities::{HealthRecord, PurchaseReceipt, RecordRef};

    // Domain components
    pub use crate::domain::access::{AccessChange, AccessControl};
    pub use crate::domain::ledger::BalanceLedger;
    pub use crate::domain::records::RecordStore;

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, check_conservation_invariant, check_overdraft_invariant,
        check_record_index_invariant, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::HealthDataApi;
    pub use crate::ports::outbound::{Clock, DataDelivery, DeliveryGateway, EventSink};

    // Events
    pub use crate::events::{topics, MarketEvent};

    // Errors
    pub use crate::errors::{LedgerError, MarketError};

    // Adapters
    pub use crate::adapters::{
        InMemoryEventLog, LoggedEvent, ManualClock, NullDelivery, RecordingDelivery,
        ReentrancyProbe, SystemClock,
    };

    // Services
    pub use crate::service::{
        create_test_market, create_test_vulnerable_market, HealthDataMarket, MarketConfig,
        MarketStats, TestMarket, VulnerableHealthDataMarket,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
