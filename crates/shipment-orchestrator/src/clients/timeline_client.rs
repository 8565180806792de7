//! # Timeline Client
//!
//! Wraps a `ResourceClient<OrderTimeline>`.
use crate::model::{MergeOutcome, OrderId, OrderTimeline, TimelineUpdate};
use crate::timeline_actor::{TimelineAction, TimelineActionResult, TimelineError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use record_actor::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, instrument};

/// Client for interacting with the Timeline actor.
#[derive(Clone)]
pub struct TimelineClient {
    inner: ResourceClient<OrderTimeline>,
}

impl TimelineClient {
    pub fn new(inner: ResourceClient<OrderTimeline>) -> Self {
        Self { inner }
    }

    /// Starts a timeline with a single `pending` event.
    ///
    /// Fails with `FrameworkError::AlreadyExists` (as a communication error) when the order
    /// already has one; use [`TimelineClient::ensure`] to tolerate that.
    #[instrument(skip(self))]
    pub async fn initialize(
        &self,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<OrderTimeline, TimelineError> {
        debug!("Sending request");
        let timeline = OrderTimeline::started(order_id, at);
        self.inner
            .insert(timeline.clone())
            .await
            .map_err(Self::map_error)?;
        Ok(timeline)
    }

    /// Returns the order's timeline, starting one if none exists yet.
    #[instrument(skip(self))]
    pub async fn ensure(
        &self,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<OrderTimeline, TimelineError> {
        if let Some(existing) = self.get(order_id.clone()).await? {
            return Ok(existing);
        }
        match self
            .inner
            .insert(OrderTimeline::started(order_id.clone(), at))
            .await
        {
            Ok(_) | Err(FrameworkError::AlreadyExists(_)) => self
                .get(order_id.clone())
                .await?
                .ok_or_else(|| TimelineError::NotFound(order_id.to_string())),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        order_id: &OrderId,
        update: TimelineUpdate,
    ) -> Result<(OrderTimeline, MergeOutcome), TimelineError> {
        debug!(status = %update.status, "Merging update");
        match self
            .inner
            .perform_action(order_id.clone(), TimelineAction::Apply(update))
            .await
        {
            Ok(TimelineActionResult::Apply { timeline, outcome }) => Ok((timeline, outcome)),
            Ok(_) => unreachable!("Apply action must return Apply result"),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    #[instrument(skip(self))]
    pub async fn record_sync_attempt(
        &self,
        order_id: &OrderId,
        at: DateTime<Utc>,
    ) -> Result<OrderTimeline, TimelineError> {
        match self
            .inner
            .perform_action(order_id.clone(), TimelineAction::RecordSyncAttempt(at))
            .await
        {
            Ok(TimelineActionResult::RecordSyncAttempt(timeline)) => Ok(timeline),
            Ok(_) => unreachable!("RecordSyncAttempt action must return RecordSyncAttempt result"),
            Err(e) => Err(Self::map_error(e)),
        }
    }
}

#[async_trait]
impl ActorClient<OrderTimeline> for TimelineClient {
    type Error = TimelineError;

    fn inner(&self) -> &ResourceClient<OrderTimeline> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::NotFound(id) => TimelineError::NotFound(id),
            other => TimelineError::ActorCommunicationError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalStatus;
    use crate::timeline_actor;

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let (actor, client) = timeline_actor::new(8);
        tokio::spawn(actor.run(()));
        let now = Utc::now();

        let first = client.ensure("o-1".into(), now).await.unwrap();
        let update = TimelineUpdate {
            status: CanonicalStatus::InTransit,
            occurred_at: now,
            location: None,
            notes: None,
            synced_at: now,
        };
        client.apply(&"o-1".into(), update).await.unwrap();

        let second = client.ensure("o-1".into(), now).await.unwrap();
        assert_eq!(first.events.len(), 1);
        assert_eq!(second.events.len(), 2);
        assert!(client.initialize("o-1".into(), now).await.is_err());
    }

    #[tokio::test]
    async fn test_apply_to_unknown_order_is_not_found() {
        let (actor, client) = timeline_actor::new(8);
        tokio::spawn(actor.run(()));

        let err = client
            .record_sync_attempt(&"ghost".into(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, TimelineError::NotFound("ghost".into()));
    }
}
