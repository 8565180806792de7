//! # Carrier Adapters
//!
//! The capability contract every carrier integration implements. Adapters are the only
//! code that knows a carrier's wire format; everything downstream of the registry sees a
//! `dyn CarrierAdapter` and never branches on the carrier's name.
//!
//! `ship` has an external, non-idempotent effect. Callers go through the
//! [`ShipmentDispatcher`](crate::dispatcher::ShipmentDispatcher), which holds the order's
//! dispatch claim for the whole retry loop.

pub mod sandbox;
pub mod status_table;
pub mod testing;

pub use sandbox::SandboxCarrier;
pub use status_table::StatusTable;

use crate::model::{CanonicalStatus, Order, ShipmentErrorKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// What a carrier hands back for an accepted shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipReceipt {
    pub tracking_id: String,
    pub label_ref: Option<String>,
}

/// One event as the carrier reports it, before translation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCarrierEvent {
    pub status: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Result of a status poll: the carrier's current code plus whatever history it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierStatusReport {
    pub status: String,
    pub events: Vec<RawCarrierEvent>,
}

impl CarrierStatusReport {
    /// A report with a single code and no event history.
    pub fn bare(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            events: Vec::new(),
        }
    }
}

/// Structured failure from a carrier call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CarrierError {
    #[error("carrier call timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("carrier returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("rate limited by carrier")]
    RateLimited { retry_after: Option<Duration> },

    /// Business-level refusal, e.g. an invalid address.
    #[error("rejected by carrier: {0}")]
    Rejected(String),

    #[error("destination not served: {0}")]
    UnsupportedDestination(String),

    #[error("unknown tracking id: {0}")]
    NotFound(String),
}

impl CarrierError {
    /// Whether the same call may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            CarrierError::Timeout(_)
            | CarrierError::Network(_)
            | CarrierError::RateLimited { .. } => true,
            // 408 and 429 are the carrier asking us to come back later
            CarrierError::Server { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            CarrierError::Rejected(_)
            | CarrierError::UnsupportedDestination(_)
            | CarrierError::NotFound(_) => false,
        }
    }

    /// Delay the carrier asked for, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CarrierError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub fn kind(&self) -> ShipmentErrorKind {
        if self.is_transient() {
            ShipmentErrorKind::TransientCarrierError
        } else {
            ShipmentErrorKind::CarrierRejected
        }
    }
}

/// A carrier integration.
///
/// Implementations must be cheap to share: the registry holds them behind `Arc` and every
/// bulk worker calls them concurrently.
#[async_trait]
pub trait CarrierAdapter: Send + Sync {
    /// Creates a shipment. `idempotency_key` is stable across retries of one dispatch.
    async fn ship(&self, order: &Order, idempotency_key: &str)
        -> Result<ShipReceipt, CarrierError>;

    /// Raw label document for a shipment.
    async fn fetch_label(&self, tracking_id: &str) -> Result<Vec<u8>, CarrierError>;

    /// Current carrier-side status. `force_advance` is honoured only by sandbox carriers.
    async fn fetch_status(
        &self,
        tracking_id: &str,
        force_advance: bool,
    ) -> Result<CarrierStatusReport, CarrierError>;

    /// Maps a carrier status code to the canonical vocabulary. `None` for unknown codes.
    fn translate_status(&self, code: &str) -> Option<CanonicalStatus>;
}
