//! Shipment-field mutations on an [`Order`](crate::model::Order).
//!
//! These are the only writes the core makes to an order. Each runs inside the order
//! store's task, so the claim check and the write cannot interleave with another dispatch.

use crate::model::{CanonicalStatus, CarrierType, Order};

/// Custom actions for Order records.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Claims the order for one dispatch, identified by `key`.
    ///
    /// # Errors
    /// `AlreadyShipped` if a tracking id is set, `DispatchInProgress` if another key holds
    /// the claim.
    BeginDispatch { key: String },
    /// Records the carrier's receipt in one update and releases the claim.
    CompleteDispatch {
        key: String,
        carrier_type: CarrierType,
        tracking_id: String,
        label_ref: Option<String>,
    },
    /// Releases the claim after a failed dispatch.
    AbandonDispatch { key: String },
    /// Copies the timeline's current status onto the order. Never moves it backwards.
    MirrorStatus(CanonicalStatus),
}

/// Results from OrderActions - variants match 1:1 with OrderAction
#[derive(Debug, Clone)]
pub enum OrderActionResult {
    BeginDispatch(Order),
    CompleteDispatch(Order),
    AbandonDispatch(()),
    /// Whether the stored status changed.
    MirrorStatus(bool),
}
