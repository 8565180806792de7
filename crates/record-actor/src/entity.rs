//! # ActorEntity Trait
//!
//! The contract every record (an order, a delivery timeline, …) implements to be owned by
//! a [`ResourceActor`](crate::ResourceActor). A record carries its own identifier, so the
//! store is keyed by whatever the caller already uses to name it; nothing is generated here.
//!
//! # Architecture Note
//! All mutation goes through [`ActorEntity::handle_action`], which runs inside the owning
//! task. Two callers racing on the same record are therefore serialized by the channel,
//! and an action can implement check-then-set logic (claims, set-once fields, monotonic
//! merges) without any locking.
//!
//! # Provided Methods (Hooks)
//! - [`ActorEntity::on_insert`] runs before a record is stored and may reject it.
//!
//! The default implementation does nothing (`Ok(())`).

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any record must implement to be managed by a `ResourceActor`.
///
/// # Async & Context
/// This trait is `#[async_trait]` so hooks may await other actors. The `Context` type is
/// injected into every hook at `run()` time rather than at construction time, which lets
/// stores that depend on each other be created in any order.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The unique identifier for this record.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// Enum of record-specific mutations.
    type Action: Send + Sync + Debug;

    /// The result type returned by actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context injected into the actor. Use `()` if none is needed.
    type Context: Send + Sync;

    /// The error type for this record.
    ///
    /// # Design Note: Error Granularity
    ///
    /// One error enum per record type rather than one per action. Callers match on a
    /// single type; the cost is that an action's signature admits errors only a sibling
    /// action can produce.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The key this record is stored under.
    fn id(&self) -> Self::Id;

    /// Called before the record is stored. Returning an error rejects the insert.
    async fn on_insert(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Apply a record-specific action.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
