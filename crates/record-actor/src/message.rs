//! # Generic Messages
//!
//! The request enum exchanged between a `ResourceClient` and its `ResourceActor`.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Internal message type sent to the actor.
///
/// - **Insert**: stores a new record under its own id. Duplicate ids are rejected.
/// - **Get**: returns a snapshot (clone) of the record, if present.
/// - **Action**: runs [`ActorEntity::handle_action`] against the stored record.
///
/// Records are never removed through this interface.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Insert {
        entity: T,
        respond_to: Response<T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}
