//! # Domain Layer (Inner Hexagon)
//!
//! Pure business state and logic for the marketplace: value objects,
//! entities, the three stateful components (ledger, record store, access
//! control), validation services, and runtime invariant checks.
//!
//! No I/O and no async here; dependencies point inward only.

pub mod access;
pub mod entities;
pub mod invariants;
pub mod ledger;
pub mod records;
pub mod services;
pub mod value_objects;

pub use access::*;
pub use entities::*;
pub use invariants::*;
pub use ledger::*;
pub use records::*;
pub use services::*;
pub use value_objects::*;
