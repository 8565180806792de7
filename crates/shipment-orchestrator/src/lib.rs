//! # Shipment Orchestrator
//!
//! The control core that takes a batch of orders, picks a carrier for each, ships them
//! concurrently, and keeps every shipped order's delivery timeline in step with its carrier.
//!
//! ## Components
//!
//! - **[carrier]**: the [`CarrierAdapter`](carrier::CarrierAdapter) contract, a sandbox
//!   carrier and a scripted test double.
//! - **[registry]**: the immutable snapshot of configured carriers.
//! - **[router]**: pure, deterministic carrier selection.
//! - **[dispatcher]**: one order through one carrier, with timeout, retry and the
//!   idempotency guard.
//! - **[bulk]**: bounded-concurrency fan-out with progress and cancellation.
//! - **[sync]**: carrier status polling folded into a monotonic timeline.
//! - **[order_actor]**, **[timeline_actor]**: the record stores, built on
//!   [`record_actor`].
//! - **[lifecycle]**: [`ShipmentSystem`](lifecycle::ShipmentSystem) wiring and tracing setup.
//!
//! ## Testing
//!
//! [`carrier::testing::ScriptedCarrier`] scripts carrier outcomes and records how many
//! `ship` calls ran at once; [`record_actor::mock`] stands in for a store.

pub mod bulk;
pub mod carrier;
pub mod clients;
pub mod config;
pub mod dispatcher;
pub mod labels;
pub mod lifecycle;
pub mod model;
pub mod order_actor;
pub mod registry;
pub mod router;
pub mod sync;
pub mod timeline_actor;
