//! # Timeline Actor
//!
//! Owns one [`OrderTimeline`](crate::model::OrderTimeline) per shipped order. Every merge
//! runs inside this store's task, so concurrent syncs of the same order are applied one
//! after the other against the latest state.

use crate::clients::TimelineClient;
use crate::model::{MergeOutcome, OrderTimeline, TimelineUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use record_actor::{ActorEntity, ResourceActor};
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum TimelineAction {
    /// Merge one translated carrier observation.
    Apply(TimelineUpdate),
    /// Note a poll that produced nothing to merge.
    RecordSyncAttempt(DateTime<Utc>),
}

/// Results from TimelineActions - variants match 1:1 with TimelineAction
#[derive(Debug, Clone)]
pub enum TimelineActionResult {
    Apply {
        timeline: OrderTimeline,
        outcome: MergeOutcome,
    },
    RecordSyncAttempt(OrderTimeline),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TimelineError {
    #[error("Timeline not found: {0}")]
    NotFound(String),

    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

#[async_trait]
impl ActorEntity for OrderTimeline {
    type Id = crate::model::OrderId;
    type Action = TimelineAction;
    type ActionResult = TimelineActionResult;
    type Context = ();
    type Error = TimelineError;

    fn id(&self) -> Self::Id {
        self.order_id.clone()
    }

    async fn handle_action(
        &mut self,
        action: TimelineAction,
        _ctx: &(),
    ) -> Result<TimelineActionResult, TimelineError> {
        match action {
            TimelineAction::Apply(update) => {
                let outcome = self.merge(update);
                Ok(TimelineActionResult::Apply {
                    timeline: self.clone(),
                    outcome,
                })
            }
            TimelineAction::RecordSyncAttempt(at) => {
                self.record_sync_attempt(at);
                Ok(TimelineActionResult::RecordSyncAttempt(self.clone()))
            }
        }
    }
}

/// Creates a new Timeline actor and its client.
pub fn new(buffer_size: usize) -> (ResourceActor<OrderTimeline>, TimelineClient) {
    let (actor, generic_client) = ResourceActor::new(buffer_size);
    (actor, TimelineClient::new(generic_client))
}
