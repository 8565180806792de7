//! # Status Sync Engine
//!
//! Pulls a shipped order's status from its carrier and folds it into the order's timeline.
//!
//! The engine never decides what a carrier code means: translation belongs to the adapter.
//! The merge itself runs inside the timeline store (see [`OrderTimeline::merge`]), so two
//! syncs of the same order racing each other still apply one after the other.
//!
//! Carrier trouble is reported in the returned [`SyncOutcome`], not as an error. A status
//! that would move the timeline backwards is logged and dropped.
use crate::carrier::CarrierError;
use crate::clients::{OrderClient, TimelineClient};
use crate::model::{
    CanonicalStatus, MergeOutcome, OrderId, OrderTimeline, ShipmentErrorKind, TimelineUpdate,
};
use crate::registry::CarrierRegistry;
use crate::timeline_actor::TimelineError;
use chrono::Utc;
use record_actor::ActorClient;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} has not been shipped")]
    NotShipped(OrderId),

    #[error("order {order_id} was shipped with carrier {carrier_type}, which is no longer registered")]
    UnknownCarrier {
        order_id: OrderId,
        carrier_type: String,
    },

    #[error("order {0} has no timeline")]
    TimelineNotFound(OrderId),

    #[error("record store unavailable: {0}")]
    Store(String),
}

impl From<TimelineError> for SyncError {
    fn from(e: TimelineError) -> Self {
        match e {
            TimelineError::NotFound(id) => SyncError::TimelineNotFound(OrderId(id)),
            TimelineError::ActorCommunicationError(msg) => SyncError::Store(msg),
        }
    }
}

/// What one sync did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum SyncDisposition {
    /// The timeline moved to a higher-ranked status.
    Advanced,
    /// Same status, new location or notes recorded.
    Annotated,
    Unchanged,
    /// The carrier reported an older status; discarded.
    Conflict {
        current: CanonicalStatus,
        incoming: CanonicalStatus,
    },
    /// The timeline was already terminal; the carrier was not called.
    AlreadyTerminal,
    /// The carrier returned a code its translation table does not know.
    UnmappedStatus { code: String },
    CarrierUnavailable {
        kind: ShipmentErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub timeline: OrderTimeline,
    /// True only when the canonical status advanced.
    pub status_changed: bool,
    #[serde(flatten)]
    pub disposition: SyncDisposition,
}

#[derive(Clone)]
pub struct StatusSyncEngine {
    registry: Arc<CarrierRegistry>,
    orders: OrderClient,
    timelines: TimelineClient,
    status_timeout: Duration,
}

impl StatusSyncEngine {
    pub fn new(
        registry: Arc<CarrierRegistry>,
        orders: OrderClient,
        timelines: TimelineClient,
        status_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            orders,
            timelines,
            status_timeout,
        }
    }

    /// Refreshes one order's timeline from its carrier.
    ///
    /// `force_advance` is passed through to the adapter; only sandbox carriers act on it.
    #[instrument(skip(self, order_id), fields(order_id = %order_id))]
    pub async fn sync_order_status(
        &self,
        order_id: &OrderId,
        force_advance: bool,
    ) -> Result<SyncOutcome, SyncError> {
        let order = self
            .orders
            .get(order_id.clone())
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?
            .ok_or_else(|| SyncError::OrderNotFound(order_id.clone()))?;
        let (Some(tracking_id), Some(carrier_type)) =
            (order.carrier_tracking_id.as_deref(), order.carrier_type.as_ref())
        else {
            return Err(SyncError::NotShipped(order_id.clone()));
        };
        let timeline = self.timelines.ensure(order_id.clone(), Utc::now()).await?;
        if timeline.is_terminal() {
            debug!("Timeline terminal, skipping carrier call");
            return Ok(SyncOutcome {
                timeline,
                status_changed: false,
                disposition: SyncDisposition::AlreadyTerminal,
            });
        }

        let Some(carrier) = self.registry.get(carrier_type) else {
            warn!(carrier = %carrier_type, "Order shipped with an unregistered carrier");
            self.timelines
                .record_sync_attempt(order_id, Utc::now())
                .await?;
            return Err(SyncError::UnknownCarrier {
                order_id: order_id.clone(),
                carrier_type: carrier_type.to_string(),
            });
        };

        let fetched = tokio::time::timeout(
            self.status_timeout,
            carrier.adapter.fetch_status(tracking_id, force_advance),
        )
        .await
        .unwrap_or(Err(CarrierError::Timeout(self.status_timeout)));

        let report = match fetched {
            Ok(report) => report,
            Err(e) => {
                warn!(carrier = %carrier_type, error = %e, "Status fetch failed");
                let timeline = self
                    .timelines
                    .record_sync_attempt(order_id, Utc::now())
                    .await?;
                return Ok(SyncOutcome {
                    timeline,
                    status_changed: false,
                    disposition: SyncDisposition::CarrierUnavailable {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                });
            }
        };

        let Some(status) = carrier.adapter.translate_status(&report.status) else {
            warn!(carrier = %carrier_type, code = %report.status, "Unmapped carrier status");
            let timeline = self
                .timelines
                .record_sync_attempt(order_id, Utc::now())
                .await?;
            return Ok(SyncOutcome {
                timeline,
                status_changed: false,
                disposition: SyncDisposition::UnmappedStatus {
                    code: report.status,
                },
            });
        };

        // Details come from the newest raw event that maps to the same status.
        let detail = report
            .events
            .iter()
            .rev()
            .find(|e| carrier.adapter.translate_status(&e.status) == Some(status));
        let now = Utc::now();
        let update = TimelineUpdate {
            status,
            occurred_at: detail.and_then(|e| e.timestamp).unwrap_or(now),
            location: detail.and_then(|e| e.location.clone()),
            notes: detail.and_then(|e| e.notes.clone()),
            synced_at: now,
        };

        let (timeline, outcome) = self.timelines.apply(order_id, update).await?;
        let disposition = match outcome {
            MergeOutcome::Advanced => {
                info!(status = %status, "Timeline advanced");
                if let Err(e) = self.orders.mirror_status(order_id, status).await {
                    warn!(error = %e, "Order status not mirrored");
                }
                SyncDisposition::Advanced
            }
            MergeOutcome::Annotated => SyncDisposition::Annotated,
            MergeOutcome::Unchanged => SyncDisposition::Unchanged,
            MergeOutcome::Conflict { current, incoming } => {
                warn!(%current, %incoming, "Sync conflict, regressing status discarded");
                SyncDisposition::Conflict { current, incoming }
            }
            MergeOutcome::Terminal => SyncDisposition::AlreadyTerminal,
        };

        Ok(SyncOutcome {
            status_changed: disposition == SyncDisposition::Advanced,
            timeline,
            disposition,
        })
    }

    /// Read-only view of an order's timeline.
    #[instrument(skip(self))]
    pub async fn get_order_timeline(&self, order_id: &OrderId) -> Result<OrderTimeline, SyncError> {
        self.timelines
            .get(order_id.clone())
            .await?
            .ok_or_else(|| SyncError::TimelineNotFound(order_id.clone()))
    }
}
