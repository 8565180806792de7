//! # Order Actor
//!
//! Owns the [`Order`] records the shipment core reads and the shipment fields it writes.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](record_actor::ActorEntity) implementation for [`Order`]
//! - [`error`] - [`OrderError`]
//! - [`actions`] - [`OrderAction`] and [`OrderActionResult`]
//! - [`new()`] - Factory function that creates the actor and client
//!
//! ## Usage
//!
//! ```rust
//! use shipment_orchestrator::order_actor;
//! use shipment_orchestrator::model::{Order, Recipient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (actor, client) = order_actor::new(32);
//!     tokio::spawn(actor.run(()));
//!
//!     client.register_order(Order::new("o-1", Recipient::default(), 0.0)).await?;
//!     let claimed = client.begin_dispatch(&"o-1".into(), "dispatch-1").await?;
//!     assert_eq!(claimed.dispatch_claim.as_deref(), Some("dispatch-1"));
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::clients::OrderClient;
use crate::model::Order;
use record_actor::ResourceActor;

/// Creates a new Order actor and its client.
pub fn new(buffer_size: usize) -> (ResourceActor<Order>, OrderClient) {
    let (actor, generic_client) = ResourceActor::new(buffer_size);
    (actor, OrderClient::new(generic_client))
}
