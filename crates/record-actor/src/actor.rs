//! # Record Actor Server
//!
//! `ResourceActor` owns the store for one record type and processes every request
//! sequentially in its own Tokio task.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The generic actor that owns a collection of records.
///
/// # Architecture Note
/// This struct is the "Server" half of the actor. It owns the state (`store`) and the
/// receiver end of the channel, so no `Mutex` or `RwLock` is needed: one message is
/// handled at a time and every action sees the result of the previous one.
///
/// # Usage Pattern
///
/// 1. **Create**: `ResourceActor::new()` returns the actor and its client.
/// 2. **Wire**: pass dependencies into `actor.run(context)`.
/// 3. **Run**: spawn the run loop in a background task.
///
/// ```rust
/// use record_actor::{ActorEntity, ResourceActor};
/// use async_trait::async_trait;
///
/// #[derive(Clone, Debug)] struct Parcel { code: String, scans: u32 }
/// #[derive(Debug)] enum ParcelAction { Scan }
/// #[derive(Debug)] struct ParcelError;
/// impl std::fmt::Display for ParcelError {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "parcel") }
/// }
/// impl std::error::Error for ParcelError {}
///
/// #[async_trait]
/// impl ActorEntity for Parcel {
///     type Id = String;
///     type Action = ParcelAction;
///     type ActionResult = u32;
///     type Context = ();
///     type Error = ParcelError;
///
///     fn id(&self) -> String { self.code.clone() }
///     async fn handle_action(&mut self, _: ParcelAction, _: &()) -> Result<u32, ParcelError> {
///         self.scans += 1;
///         Ok(self.scans)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let (actor, client) = ResourceActor::<Parcel>::new(10);
///     tokio::spawn(actor.run(()));
///
///     let id = client.insert(Parcel { code: "P-1".into(), scans: 0 }).await.unwrap();
///     assert_eq!(client.perform_action(id, ParcelAction::Scan).await.unwrap(), 1);
/// }
/// ```
pub struct ResourceActor<T: ActorEntity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
}

impl<T: ActorEntity> ResourceActor<T> {
    /// Creates a new `ResourceActor` and its associated `ResourceClient`.
    ///
    /// `buffer_size` is the capacity of the request channel; callers wait for space when
    /// it is full.
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    /// Runs the actor's event loop until every client has been dropped.
    ///
    /// The `context` argument is handed to every hook and action.
    pub async fn run(mut self, context: T::Context) {
        // Short type name, e.g. "OrderTimeline"
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Insert {
                    mut entity,
                    respond_to,
                } => {
                    let id = entity.id();
                    debug!(entity_type, %id, "Insert");
                    if self.store.contains_key(&id) {
                        warn!(entity_type, %id, "Already exists");
                        let _ = respond_to.send(Err(FrameworkError::AlreadyExists(id.to_string())));
                        continue;
                    }
                    if let Err(e) = entity.on_insert(&context).await {
                        warn!(entity_type, %id, error = %e, "on_insert failed");
                        let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                        continue;
                    }
                    self.store.insert(id.clone(), entity);
                    info!(entity_type, %id, size = self.store.len(), "Inserted");
                    let _ = respond_to.send(Ok(id));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    let found = item.is_some();
                    debug!(entity_type, %id, found, "Get");
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::Action {
                    id,
                    action,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?action, "Action");
                    if let Some(item) = self.store.get_mut(&id) {
                        let result = item
                            .handle_action(action, &context)
                            .await
                            .map_err(|e| FrameworkError::EntityError(Box::new(e)));
                        match &result {
                            Ok(_) => debug!(entity_type, %id, "Action ok"),
                            Err(e) => warn!(entity_type, %id, error = %e, "Action failed"),
                        }
                        let _ = respond_to.send(result);
                    } else {
                        warn!(entity_type, %id, "Not found");
                        let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                    }
                }
            }
        }

        info!(entity_type, size = self.store.len(), "Shutdown");
    }
}
