//! # System Lifecycle
//!
//! Starting, wiring and stopping the shipment core.
//!
//! ## Wiring
//!
//! ```rust,ignore
//! // 1. Create both record stores
//! let (order_actor, order_client) = order_actor::new(buffer);
//! let (timeline_actor, timeline_client) = timeline_actor::new(buffer);
//!
//! // 2. Start them (neither needs injected context)
//! tokio::spawn(order_actor.run(()));
//! tokio::spawn(timeline_actor.run(()));
//!
//! // 3. Hand clients and the registry snapshot to the components
//! let dispatcher = ShipmentDispatcher::new(order_client.clone(), timeline_client.clone(), policy);
//! let bulk = BulkOrchestrator::new(registry.clone(), router, dispatcher, order_client.clone(), width);
//! ```
//!
//! [`ShipmentSystem`] does all of this and owns the task handles for shutdown.

pub mod shipment_system;
pub mod tracing;

pub use shipment_system::ShipmentSystem;
