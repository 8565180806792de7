//! # Mock Framework & Testing Guide
//!
//! `MockClient<T>` hands out a real [`ResourceClient<T>`] whose requests are answered from
//! a queue of expectations instead of a running store. Use it to test code that sits *around*
//! a client (dispatch logic, sync logic) without spinning up the actor that owns the records.
//!
//! ## When to use Mocks vs Real Actors
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **State** | None, answers are scripted | Real record state |
//! | **Error Injection** | Easy (`return_err`) | Needs the store in a specific state |
//! | **Use Case** | Logic around the client | The record's own actions, end-to-end flows |
//!
//! ## Testing Failure Scenarios
//!
//! ```rust
//! use record_actor::mock::MockClient;
//! use record_actor::{ActorEntity, FrameworkError};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)] struct Parcel { id: u32 }
//! #[derive(Debug)] enum ParcelAction {}
//! #[derive(Debug, thiserror::Error)] #[error("Err")] struct ParcelError;
//!
//! #[async_trait]
//! impl ActorEntity for Parcel {
//!     type Id = u32; type Action = ParcelAction; type ActionResult = ();
//!     type Context = (); type Error = ParcelError;
//!     fn id(&self) -> u32 { self.id }
//!     async fn handle_action(&mut self, _: ParcelAction, _: &()) -> Result<(), ParcelError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Parcel>::new();
//!     let client = mock.client();
//!
//!     // Simulate the store going away mid-flight
//!     mock.expect_get(1).return_err(FrameworkError::ActorClosed);
//!
//!     let result = client.get(1).await;
//!     assert!(matches!(result, Err(FrameworkError::ActorClosed)));
//!     mock.verify();
//! }
//! ```
//!
//! The lower-level helpers ([`create_mock_client`], [`expect_get`], [`expect_action`], …)
//! expose the raw request so a test can inspect the payload before answering it.

use crate::{ActorEntity, FrameworkError, ResourceClient, ResourceRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

/// An expected request and the answer to give it.
enum Expectation<T: ActorEntity> {
    Get {
        id: T::Id,
        response: Result<Option<T>, FrameworkError>,
    },
    Insert {
        response: Result<T::Id, FrameworkError>,
    },
    Action {
        id: T::Id,
        response: Result<T::ActionResult, FrameworkError>,
    },
}

type ExpectationQueue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock client with ordered expectations.
///
/// Requests must arrive in the order the expectations were registered. A request that
/// does not match the next expectation (wrong kind or wrong id) panics the responder
/// task, which surfaces in the test as `FrameworkError::ActorDropped`.
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: ExpectationQueue<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: ExpectationQueue<T> = Arc::new(Mutex::new(VecDeque::new()));
        let queue = expectations.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let next = queue.lock().unwrap().pop_front();

                match (request, next) {
                    (
                        ResourceRequest::Get { id, respond_to },
                        Some(Expectation::Get { id: want, response }),
                    ) => {
                        assert_eq!(id, want, "get for unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Insert { respond_to, .. },
                        Some(Expectation::Insert { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Action { id, respond_to, .. },
                        Some(Expectation::Action { id: want, response }),
                    ) => {
                        assert_eq!(id, want, "action for unexpected id");
                        let _ = respond_to.send(response);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns a client wired to this mock.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    /// Expects a `get` for `id`.
    pub fn expect_get(&mut self, id: T::Id) -> GetExpectationBuilder<T> {
        GetExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects an `insert`.
    pub fn expect_insert(&mut self) -> InsertExpectationBuilder<T> {
        InsertExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Expects an `action` against `id`.
    pub fn expect_action(&mut self, id: T::Id) -> ActionExpectationBuilder<T> {
        ActionExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Panics if any expectation is still queued.
    pub fn verify(&self) {
        let remaining = self.expectations.lock().unwrap().len();
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: ExpectationQueue<T>,
}

impl<T: ActorEntity> GetExpectationBuilder<T> {
    pub fn return_ok(self, value: Option<T>) {
        self.push(Ok(value));
    }

    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Option<T>, FrameworkError>) {
        self.expectations.lock().unwrap().push_back(Expectation::Get {
            id: self.id,
            response,
        });
    }
}

/// Builder for `insert` expectations.
pub struct InsertExpectationBuilder<T: ActorEntity> {
    expectations: ExpectationQueue<T>,
}

impl<T: ActorEntity> InsertExpectationBuilder<T> {
    pub fn return_ok(self, id: T::Id) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Insert { response: Ok(id) });
    }

    pub fn return_err(self, error: FrameworkError) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Insert {
                response: Err(error),
            });
    }
}

/// Builder for `action` expectations.
pub struct ActionExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: ExpectationQueue<T>,
}

impl<T: ActorEntity> ActionExpectationBuilder<T> {
    pub fn return_ok(self, result: T::ActionResult) {
        self.push(Ok(result));
    }

    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T::ActionResult, FrameworkError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Action {
                id: self.id,
                response,
            });
    }
}

// =============================================================================
// RAW REQUEST HELPERS
// =============================================================================

/// Creates a client and the receiver its requests land on.
///
/// Pair with [`expect_insert`], [`expect_get`] or [`expect_action`] to pull the next
/// request off the channel and answer it by hand.
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Next request, if it is an Insert.
pub async fn expect_insert<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T, oneshot::Sender<Result<T::Id, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Insert { entity, respond_to }) => Some((entity, respond_to)),
        _ => None,
    }
}

/// Next request, if it is a Get.
pub async fn expect_get<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, oneshot::Sender<Result<Option<T>, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Next request, if it is an Action.
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Action,
    oneshot::Sender<Result<T::ActionResult, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Crate {
        label: String,
        weight: u32,
    }

    #[derive(Debug)]
    enum CrateAction {
        AddWeight(u32),
    }

    #[derive(Debug, thiserror::Error)]
    #[error("crate error")]
    struct CrateError;

    #[async_trait]
    impl ActorEntity for Crate {
        type Id = String;
        type Action = CrateAction;
        type ActionResult = u32;
        type Context = ();
        type Error = CrateError;

        fn id(&self) -> String {
            self.label.clone()
        }

        async fn handle_action(&mut self, action: CrateAction, _: &()) -> Result<u32, CrateError> {
            match action {
                CrateAction::AddWeight(w) => {
                    self.weight += w;
                    Ok(self.weight)
                }
            }
        }
    }

    #[tokio::test]
    async fn test_raw_helpers_expose_payload() {
        let (client, mut receiver) = create_mock_client::<Crate>(10);

        let task = tokio::spawn(async move {
            client
                .insert(Crate {
                    label: "C-1".into(),
                    weight: 4,
                })
                .await
        });

        let (entity, responder) = expect_insert(&mut receiver).await.expect("Expected Insert");
        assert_eq!(entity.weight, 4);
        responder.send(Ok(entity.label.clone())).unwrap();

        assert_eq!(task.await.unwrap().unwrap(), "C-1");
    }

    #[tokio::test]
    async fn test_action_payload_can_be_inspected() {
        let (client, mut receiver) = create_mock_client::<Crate>(10);

        let task = tokio::spawn(async move {
            client
                .perform_action("C-9".to_string(), CrateAction::AddWeight(3))
                .await
        });

        let (id, action, responder) = expect_action(&mut receiver).await.expect("Expected Action");
        assert_eq!(id, "C-9");
        assert!(matches!(action, CrateAction::AddWeight(3)));
        responder.send(Ok(10)).unwrap();

        assert_eq!(task.await.unwrap().unwrap(), 10);
    }

    #[tokio::test]
    async fn test_mock_client_with_expectations() {
        let mut mock = MockClient::<Crate>::new();
        mock.expect_insert().return_ok("C-2".to_string());
        mock.expect_get("C-2".to_string()).return_ok(Some(Crate {
            label: "C-2".into(),
            weight: 1,
        }));
        mock.expect_action("C-2".to_string())
            .return_err(FrameworkError::NotFound("C-2".into()));

        let client = mock.client();
        let id = client
            .insert(Crate {
                label: "C-2".into(),
                weight: 1,
            })
            .await
            .unwrap();
        assert_eq!(id, "C-2");

        let fetched = client.get(id.clone()).await.unwrap().unwrap();
        assert_eq!(fetched.weight, 1);

        let err = client
            .perform_action(id, CrateAction::AddWeight(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameworkError::NotFound(_)));

        mock.verify();
    }
}
