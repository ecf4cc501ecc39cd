//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the outbound ports: clocks, the in-memory
//! event log, honest delivery gateways, and the malicious one.

pub mod clock;
pub mod delivery;
pub mod event_log;
pub mod probe;

pub use clock::*;
pub use delivery::*;
pub use event_log::*;
pub use probe::*;
