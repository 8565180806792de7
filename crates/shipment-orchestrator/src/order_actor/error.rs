//! Error types for the Order actor.

use crate::model::OrderId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// The requested order was not found.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The order already carries a tracking id.
    #[error("Order {order_id} already shipped with tracking id {tracking_id}")]
    AlreadyShipped {
        order_id: OrderId,
        tracking_id: String,
    },

    /// Another dispatch currently holds the claim on this order.
    #[error("Order {0} has a dispatch in progress")]
    DispatchInProgress(OrderId),

    /// A completion or release came from a dispatch that does not hold the claim.
    #[error("Order {0} is not claimed by this dispatch")]
    ClaimMismatch(OrderId),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
