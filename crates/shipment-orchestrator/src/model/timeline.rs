//! Canonical delivery statuses and the per-order timeline.
//!
//! The timeline is append-only and monotonic: every event's rank is at least the rank of
//! the event before it, and once a terminal status is recorded nothing more is written.
//! [`OrderTimeline::merge`] is the only way events are added after creation.
use crate::model::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The core's own delivery vocabulary. Every carrier status is translated into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Pending,
    Preparing,
    InTransit,
    OutForDelivery,
    Delivered,
    Returned,
    Failed,
}

impl CanonicalStatus {
    /// Position on the delivery path. All terminal statuses share the top rank.
    pub fn rank(self) -> u8 {
        match self {
            CanonicalStatus::Pending => 0,
            CanonicalStatus::Preparing => 1,
            CanonicalStatus::InTransit => 2,
            CanonicalStatus::OutForDelivery => 3,
            CanonicalStatus::Delivered | CanonicalStatus::Returned | CanonicalStatus::Failed => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CanonicalStatus::Delivered | CanonicalStatus::Returned | CanonicalStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalStatus::Pending => "pending",
            CanonicalStatus::Preparing => "preparing",
            CanonicalStatus::InTransit => "in_transit",
            CanonicalStatus::OutForDelivery => "out_for_delivery",
            CanonicalStatus::Delivered => "delivered",
            CanonicalStatus::Returned => "returned",
            CanonicalStatus::Failed => "failed",
        }
    }
}

impl Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub status: CanonicalStatus,
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// A translated carrier observation, ready to be merged.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineUpdate {
    pub status: CanonicalStatus,
    /// When the carrier says it happened.
    pub occurred_at: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// When the core observed it.
    pub synced_at: DateTime<Utc>,
}

/// What [`OrderTimeline::merge`] did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// A higher-ranked status was appended.
    Advanced,
    /// Same status with new location/notes; appended without changing rank.
    Annotated,
    /// Nothing new.
    Unchanged,
    /// The update would move the timeline backwards and was discarded.
    Conflict {
        current: CanonicalStatus,
        incoming: CanonicalStatus,
    },
    /// The timeline is already terminal; nothing was touched.
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTimeline {
    pub order_id: OrderId,
    /// Chronological, rank non-decreasing.
    pub events: Vec<TimelineEvent>,
    pub terminal_status: Option<CanonicalStatus>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Read-time view of one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineStep<'a> {
    #[serde(flatten)]
    pub event: &'a TimelineEvent,
    pub completed: bool,
    pub current: bool,
}

impl OrderTimeline {
    /// A fresh timeline holding a single `pending` event.
    pub fn started(order_id: OrderId, at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            events: vec![TimelineEvent {
                status: CanonicalStatus::Pending,
                timestamp: at,
                location: None,
                notes: None,
            }],
            terminal_status: None,
            last_sync_at: None,
        }
    }

    pub fn current_status(&self) -> CanonicalStatus {
        self.events
            .last()
            .map(|e| e.status)
            .unwrap_or(CanonicalStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_status.is_some()
    }

    /// Folds one update into the timeline without ever lowering its rank.
    ///
    /// `last_sync_at` moves forward on every call except against a terminal timeline.
    pub fn merge(&mut self, update: TimelineUpdate) -> MergeOutcome {
        if self.is_terminal() {
            return MergeOutcome::Terminal;
        }
        self.last_sync_at = Some(update.synced_at);

        let current = self.current_status();
        let incoming = update.status;

        if incoming.rank() < current.rank() {
            return MergeOutcome::Conflict { current, incoming };
        }

        if incoming == current {
            let latest = self.events.last();
            let new_location = update.location.is_some()
                && update.location.as_ref() != latest.and_then(|e| e.location.as_ref());
            let new_notes = update.notes.is_some()
                && update.notes.as_ref() != latest.and_then(|e| e.notes.as_ref());
            if !(new_location || new_notes) {
                return MergeOutcome::Unchanged;
            }
            self.push(update);
            return MergeOutcome::Annotated;
        }

        // Equal rank but a different status can only happen between terminals,
        // and terminal timelines were handled above.
        self.push(update);
        if incoming.is_terminal() {
            self.terminal_status = Some(incoming);
        }
        MergeOutcome::Advanced
    }

    /// Records a poll that produced nothing mergeable.
    pub fn record_sync_attempt(&mut self, at: DateTime<Utc>) {
        if !self.is_terminal() {
            self.last_sync_at = Some(at);
        }
    }

    /// Events with `completed`/`current` derived from their position.
    ///
    /// The last event is current. Every earlier event is completed, and the last one is
    /// completed too once the timeline is terminal.
    pub fn steps(&self) -> Vec<TimelineStep<'_>> {
        let last = self.events.len().saturating_sub(1);
        self.events
            .iter()
            .enumerate()
            .map(|(i, event)| TimelineStep {
                event,
                completed: i < last || self.is_terminal(),
                current: i == last,
            })
            .collect()
    }

    fn push(&mut self, update: TimelineUpdate) {
        // Keep the log chronological even when a carrier back-dates an event.
        let floor = self.events.last().map(|e| e.timestamp);
        let timestamp = match floor {
            Some(floor) if update.occurred_at < floor => floor,
            _ => update.occurred_at,
        };
        self.events.push(TimelineEvent {
            status: update.status,
            timestamp,
            location: update.location,
            notes: update.notes,
        });
    }
}
