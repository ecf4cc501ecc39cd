//! # Delivery Adapters
//!
//! Honest implementations of the [`DeliveryGateway`] port: one that drops
//! deliveries and one that records them for inspection.

use crate::ports::outbound::{DataDelivery, DeliveryGateway};
use async_trait::async_trait;
use std::sync::RwLock;

/// Discards every delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDelivery;

#[async_trait]
impl DeliveryGateway for NullDelivery {
    async fn deliver(&self, _delivery: DataDelivery) {}
}

/// Records every delivery for later inspection.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    deliveries: RwLock<Vec<DataDelivery>>,
}

impl RecordingDelivery {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every delivery seen so far, in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<DataDelivery> {
        self.deliveries.read().unwrap().clone()
    }

    /// Number of deliveries seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deliveries.read().unwrap().len()
    }

    /// Returns true if nothing has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deliveries.read().unwrap().is_empty()
    }
}

#[async_trait]
impl DeliveryGateway for RecordingDelivery {
    async fn deliver(&self, delivery: DataDelivery) {
        self.deliveries.write().unwrap().push(delivery);
    }
}

// =============================================================================
// TESTS
// =============================================================================
