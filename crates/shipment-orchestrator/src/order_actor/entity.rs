//! ActorEntity implementation for [`Order`].
//!
//! The claim protocol (`BeginDispatch` → `CompleteDispatch` | `AbandonDispatch`) is the
//! idempotency guard: a tracking id is written at most once, and two dispatches of the same
//! order can never both reach the carrier.

use super::actions::{OrderAction, OrderActionResult};
use super::error::OrderError;
use crate::model::{CanonicalStatus, Order, OrderId};
use async_trait::async_trait;
use record_actor::ActorEntity;
use tracing::debug;

#[async_trait]
impl ActorEntity for Order {
    type Id = OrderId;
    type Action = OrderAction;
    type ActionResult = OrderActionResult;
    type Context = ();
    type Error = OrderError;

    fn id(&self) -> OrderId {
        self.id.clone()
    }

    /// Orders enter the store unclaimed.
    async fn on_insert(&mut self, _ctx: &()) -> Result<(), OrderError> {
        self.dispatch_claim = None;
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: OrderAction,
        _ctx: &(),
    ) -> Result<OrderActionResult, OrderError> {
        match action {
            OrderAction::BeginDispatch { key } => {
                self.ensure_unshipped()?;
                if self.dispatch_claim.is_some() {
                    return Err(OrderError::DispatchInProgress(self.id.clone()));
                }
                self.dispatch_claim = Some(key);
                Ok(OrderActionResult::BeginDispatch(self.clone()))
            }
            OrderAction::CompleteDispatch {
                key,
                carrier_type,
                tracking_id,
                label_ref,
            } => {
                self.ensure_unshipped()?;
                self.ensure_claimed_by(&key)?;
                self.carrier_type = Some(carrier_type);
                self.carrier_tracking_id = Some(tracking_id);
                self.label_ref = label_ref;
                self.status = CanonicalStatus::Pending;
                self.dispatch_claim = None;
                Ok(OrderActionResult::CompleteDispatch(self.clone()))
            }
            OrderAction::AbandonDispatch { key } => {
                self.ensure_claimed_by(&key)?;
                self.dispatch_claim = None;
                Ok(OrderActionResult::AbandonDispatch(()))
            }
            OrderAction::MirrorStatus(status) => {
                let changed = status != self.status && status.rank() >= self.status.rank();
                if changed {
                    debug!(
                        order_id = %self.id,
                        from = %self.status,
                        to = %status,
                        "Order status mirrored"
                    );
                    self.status = status;
                }
                Ok(OrderActionResult::MirrorStatus(changed))
            }
        }
    }
}

impl Order {
    fn ensure_unshipped(&self) -> Result<(), OrderError> {
        match &self.carrier_tracking_id {
            Some(tracking_id) => Err(OrderError::AlreadyShipped {
                order_id: self.id.clone(),
                tracking_id: tracking_id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn ensure_claimed_by(&self, key: &str) -> Result<(), OrderError> {
        if self.dispatch_claim.as_deref() == Some(key) {
            Ok(())
        } else {
            Err(OrderError::ClaimMismatch(self.id.clone()))
        }
    }
}
