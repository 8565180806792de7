//! # ActorClient Trait
//!
//! Shared behaviour for record-specific client wrappers: a read path built on top of the
//! generic `ResourceClient`, with framework errors mapped into the wrapper's own error type.
use crate::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;

/// Trait for record-specific clients to inherit the standard read operation.
///
/// # Example
///
/// ```rust
/// use record_actor::{ActorClient, ActorEntity, FrameworkError, ResourceClient};
/// use async_trait::async_trait;
///
/// #[derive(Clone, Debug)] struct Manifest { id: u32 }
/// #[derive(Debug)] enum ManifestAction {}
/// #[derive(Debug, thiserror::Error)] #[error("{0}")] struct ManifestError(String);
///
/// #[async_trait]
/// impl ActorEntity for Manifest {
///     type Id = u32; type Action = ManifestAction; type ActionResult = ();
///     type Context = (); type Error = ManifestError;
///     fn id(&self) -> u32 { self.id }
///     async fn handle_action(&mut self, _: ManifestAction, _: &()) -> Result<(), ManifestError> { Ok(()) }
/// }
///
/// struct ManifestClient { inner: ResourceClient<Manifest> }
///
/// #[async_trait]
/// impl ActorClient<Manifest> for ManifestClient {
///     type Error = ManifestError;
///     fn inner(&self) -> &ResourceClient<Manifest> { &self.inner }
///     fn map_error(e: FrameworkError) -> ManifestError { ManifestError(e.to_string()) }
/// }
///
/// async fn usage(client: ManifestClient) {
///     // get() comes for free
///     let _ = client.get(1).await;
/// }
/// ```
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The record-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Map framework errors to the record's error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Fetch a snapshot of a record by id.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }
}
