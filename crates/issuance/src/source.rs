//! Read-only sources for the order snapshot and the carrier directory.

use async_trait::async_trait;
use thiserror::Error;

use shipalloc_core::OrderId;
use shipalloc_shipping::Order;

use crate::carrier::CarrierDirectory;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Order source. Fetched once per session.
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, SourceError>;
}

/// Carrier directory source. Fetched once per session.
#[async_trait]
pub trait CarrierSource: Send + Sync {
    async fn fetch_carriers(&self) -> Result<CarrierDirectory, SourceError>;
}

/// Serves one fixed order and carrier directory (plan files, tests).
#[derive(Debug, Clone)]
pub struct StaticSource {
    order: Order,
    carriers: CarrierDirectory,
}

impl StaticSource {
    pub fn new(order: Order, carriers: CarrierDirectory) -> Self {
        Self { order, carriers }
    }
}

#[async_trait]
impl OrderSource for StaticSource {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, SourceError> {
        if &self.order.id != order_id {
            return Err(SourceError::NotFound(format!("order {order_id}")));
        }
        Ok(self.order.clone())
    }
}

#[async_trait]
impl CarrierSource for StaticSource {
    async fn fetch_carriers(&self) -> Result<CarrierDirectory, SourceError> {
        Ok(self.carriers.clone())
    }
}
