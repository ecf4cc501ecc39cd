//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the marketplace and the outside world.
//!
//! - **Driving port (inbound)**: [`HealthDataApi`](inbound::HealthDataApi)
//! - **Driven ports (outbound)**: [`Clock`](outbound::Clock),
//!   [`DeliveryGateway`](outbound::DeliveryGateway),
//!   [`EventSink`](outbound::EventSink)
//!
//! No concrete implementations in this module.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
