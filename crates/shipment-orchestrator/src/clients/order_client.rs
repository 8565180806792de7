//! # Order Client
//!
//! Provides a high‑level API for interacting with the `Order` actor.
//! It wraps a `ResourceClient<Order>` and exposes the dispatch claim protocol.
use crate::model::{CanonicalStatus, CarrierType, Order, OrderId};
use crate::order_actor::{OrderAction, OrderActionResult, OrderError};
use async_trait::async_trait;
use record_actor::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, instrument};

/// Client for interacting with the Order actor.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>) -> Self {
        Self { inner }
    }

    /// Hands an order over from the order-management side.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn register_order(&self, order: Order) -> Result<OrderId, OrderError> {
        debug!("Sending request");
        self.inner.insert(order).await.map_err(Self::map_error)
    }

    /// Claims the order for the dispatch identified by `key`.
    ///
    /// Returns the order as it stood when the claim was taken.
    #[instrument(skip(self))]
    pub async fn begin_dispatch(&self, id: &OrderId, key: &str) -> Result<Order, OrderError> {
        debug!("Claiming order");
        let action = OrderAction::BeginDispatch {
            key: key.to_string(),
        };
        match self.inner.perform_action(id.clone(), action).await {
            Ok(OrderActionResult::BeginDispatch(order)) => Ok(order),
            Ok(_) => unreachable!("BeginDispatch action must return BeginDispatch result"),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    /// Writes carrier, tracking id and label reference in one update.
    #[instrument(skip(self))]
    pub async fn complete_dispatch(
        &self,
        id: &OrderId,
        key: &str,
        carrier_type: CarrierType,
        tracking_id: String,
        label_ref: Option<String>,
    ) -> Result<Order, OrderError> {
        debug!("Recording shipment");
        let action = OrderAction::CompleteDispatch {
            key: key.to_string(),
            carrier_type,
            tracking_id,
            label_ref,
        };
        match self.inner.perform_action(id.clone(), action).await {
            Ok(OrderActionResult::CompleteDispatch(order)) => Ok(order),
            Ok(_) => unreachable!("CompleteDispatch action must return CompleteDispatch result"),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    #[instrument(skip(self))]
    pub async fn abandon_dispatch(&self, id: &OrderId, key: &str) -> Result<(), OrderError> {
        debug!("Releasing claim");
        let action = OrderAction::AbandonDispatch {
            key: key.to_string(),
        };
        match self.inner.perform_action(id.clone(), action).await {
            Ok(OrderActionResult::AbandonDispatch(())) => Ok(()),
            Ok(_) => unreachable!("AbandonDispatch action must return AbandonDispatch result"),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    /// Returns whether the stored status changed.
    #[instrument(skip(self))]
    pub async fn mirror_status(
        &self,
        id: &OrderId,
        status: CanonicalStatus,
    ) -> Result<bool, OrderError> {
        debug!("Mirroring status");
        match self
            .inner
            .perform_action(id.clone(), OrderAction::MirrorStatus(status))
            .await
        {
            Ok(OrderActionResult::MirrorStatus(changed)) => Ok(changed),
            Ok(_) => unreachable!("MirrorStatus action must return MirrorStatus result"),
            Err(e) => Err(Self::map_error(e)),
        }
    }
}

#[async_trait]
impl ActorClient<Order> for OrderClient {
    type Error = OrderError;

    fn inner(&self) -> &ResourceClient<Order> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::NotFound(id) => OrderError::NotFound(OrderId(id)),
            other => other
                .into_entity_error::<OrderError>()
                .unwrap_or_else(|e| OrderError::ActorCommunicationError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Recipient;
    use record_actor::mock::{create_mock_client, expect_action, MockClient};

    #[tokio::test]
    async fn test_begin_dispatch_sends_claim_key() {
        let (client, mut receiver) = create_mock_client::<Order>(10);
        let order_client = OrderClient::new(client);

        let task = tokio::spawn(async move {
            order_client
                .begin_dispatch(&"o-1".into(), "dispatch-7")
                .await
        });

        let (id, action, responder) = expect_action(&mut receiver)
            .await
            .expect("Expected Action request");
        assert_eq!(id, OrderId::from("o-1"));
        match action {
            OrderAction::BeginDispatch { key } => assert_eq!(key, "dispatch-7"),
            _ => panic!("Expected BeginDispatch action"),
        }

        let mut claimed = Order::new("o-1", Recipient::default(), 0.0);
        claimed.dispatch_claim = Some("dispatch-7".into());
        responder
            .send(Ok(OrderActionResult::BeginDispatch(claimed)))
            .unwrap();

        let order = task.await.unwrap().unwrap();
        assert_eq!(order.dispatch_claim.as_deref(), Some("dispatch-7"));
    }

    #[tokio::test]
    async fn test_entity_errors_keep_their_type() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_action("o-2".into())
            .return_err(FrameworkError::EntityError(Box::new(
                OrderError::AlreadyShipped {
                    order_id: "o-2".into(),
                    tracking_id: "T-9".into(),
                },
            )));
        let order_client = OrderClient::new(mock.client());

        let err = order_client
            .begin_dispatch(&"o-2".into(), "k")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::AlreadyShipped {
                order_id: "o-2".into(),
                tracking_id: "T-9".into()
            }
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_missing_record_maps_to_not_found() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_action("o-3".into())
            .return_err(FrameworkError::NotFound("o-3".into()));
        let order_client = OrderClient::new(mock.client());

        let err = order_client
            .mirror_status(&"o-3".into(), CanonicalStatus::InTransit)
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::NotFound("o-3".into()));
    }

    #[tokio::test]
    async fn test_closed_store_is_a_communication_error() {
        let (client, receiver) = create_mock_client::<Order>(1);
        drop(receiver);
        let order_client = OrderClient::new(client);

        let err = order_client.get("o-4".into()).await.unwrap_err();
        assert!(matches!(err, OrderError::ActorCommunicationError(_)));
    }
}
