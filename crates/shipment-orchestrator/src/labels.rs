//! Label retrieval for shipped orders.
use crate::carrier::CarrierError;
use crate::clients::OrderClient;
use crate::model::OrderId;
use crate::registry::CarrierRegistry;
use record_actor::ActorClient;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} has not been shipped")]
    NotShipped(OrderId),

    #[error("carrier {0} is not registered")]
    UnknownCarrier(String),

    #[error(transparent)]
    Carrier(#[from] CarrierError),

    #[error("record store unavailable: {0}")]
    Store(String),
}

#[derive(Clone)]
pub struct LabelFetcher {
    registry: Arc<CarrierRegistry>,
    orders: OrderClient,
    label_timeout: Duration,
}

impl LabelFetcher {
    pub fn new(
        registry: Arc<CarrierRegistry>,
        orders: OrderClient,
        label_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            orders,
            label_timeout,
        }
    }

    /// Raw label bytes from the carrier that shipped the order.
    #[instrument(skip(self))]
    pub async fn fetch_order_label(&self, order_id: &OrderId) -> Result<Vec<u8>, LabelError> {
        let order = self
            .orders
            .get(order_id.clone())
            .await
            .map_err(|e| LabelError::Store(e.to_string()))?
            .ok_or_else(|| LabelError::OrderNotFound(order_id.clone()))?;
        let (Some(tracking_id), Some(carrier_type)) =
            (order.carrier_tracking_id.as_deref(), order.carrier_type.as_ref())
        else {
            return Err(LabelError::NotShipped(order_id.clone()));
        };
        let carrier = self
            .registry
            .get(carrier_type)
            .ok_or_else(|| LabelError::UnknownCarrier(carrier_type.to_string()))?;

        let fetch = carrier.adapter.fetch_label(tracking_id);
        let label = tokio::time::timeout(self.label_timeout, fetch)
            .await
            .unwrap_or(Err(CarrierError::Timeout(self.label_timeout)))
            .inspect_err(|e| warn!(carrier = %carrier_type, error = %e, "Label fetch failed"))?;
        Ok(label)
    }
}
