//! Dispatch requests and the records they produce.
use crate::model::{CarrierType, OrderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Why a single order did not ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipmentErrorKind {
    /// Missing or invalid field for the chosen carrier, or unknown order. Never retried.
    ValidationError,
    /// The router found no eligible carrier.
    NoCarrierAvailable,
    /// The order already has a tracking id, or another dispatch holds it.
    AlreadyShipped,
    /// Timeout, network failure, 5xx or rate limit that outlasted the retry budget.
    TransientCarrierError,
    /// The carrier refused the shipment.
    CarrierRejected,
    /// The record store could not be reached.
    Internal,
}

impl Display for ShipmentErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShipmentErrorKind::ValidationError => "ValidationError",
            ShipmentErrorKind::NoCarrierAvailable => "NoCarrierAvailable",
            ShipmentErrorKind::AlreadyShipped => "AlreadyShipped",
            ShipmentErrorKind::TransientCarrierError => "TransientCarrierError",
            ShipmentErrorKind::CarrierRejected => "CarrierRejected",
            ShipmentErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// One dispatch call: an order and, optionally, the carrier to use.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentRequest {
    pub order_id: OrderId,
    /// `None` lets the router decide.
    pub carrier_type: Option<CarrierType>,
}

/// Immutable record of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentResult {
    pub order_id: OrderId,
    pub success: bool,
    pub carrier_type: Option<CarrierType>,
    pub carrier_name: Option<String>,
    /// Present iff `success`.
    pub carrier_tracking_id: Option<String>,
    /// Present iff not `success`.
    pub error_kind: Option<ShipmentErrorKind>,
    pub error_message: Option<String>,
    /// Calls made to the carrier's `ship`. Zero when the order never reached it.
    pub attempts: u32,
    pub latency: Duration,
}

impl ShipmentResult {
    pub fn succeeded(
        order_id: OrderId,
        carrier_type: CarrierType,
        carrier_name: String,
        tracking_id: String,
        attempts: u32,
        latency: Duration,
    ) -> Self {
        Self {
            order_id,
            success: true,
            carrier_type: Some(carrier_type),
            carrier_name: Some(carrier_name),
            carrier_tracking_id: Some(tracking_id),
            error_kind: None,
            error_message: None,
            attempts,
            latency,
        }
    }

    /// A failure before any carrier was resolved.
    pub fn failed(order_id: OrderId, kind: ShipmentErrorKind, message: impl Into<String>) -> Self {
        Self {
            order_id,
            success: false,
            carrier_type: None,
            carrier_name: None,
            carrier_tracking_id: None,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            attempts: 0,
            latency: Duration::ZERO,
        }
    }

    pub fn with_carrier(mut self, carrier_type: CarrierType, carrier_name: String) -> Self {
        self.carrier_type = Some(carrier_type);
        self.carrier_name = Some(carrier_name);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// How a bulk job picks carriers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingMode {
    /// Every order goes to this carrier.
    Explicit(CarrierType),
    /// The router chooses per order.
    Smart,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid routing mode {0:?}, expected \"smart\" or \"explicit:<carrier>\"")]
pub struct ParseRoutingModeError(pub String);

impl FromStr for RoutingMode {
    type Err = ParseRoutingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("smart") {
            return Ok(RoutingMode::Smart);
        }
        match s.split_once(':') {
            Some((prefix, carrier))
                if prefix.eq_ignore_ascii_case("explicit") && !carrier.trim().is_empty() =>
            {
                Ok(RoutingMode::Explicit(CarrierType::new(carrier.trim())))
            }
            _ => Err(ParseRoutingModeError(s.to_string())),
        }
    }
}

impl Display for RoutingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingMode::Explicit(carrier) => write!(f, "explicit:{}", carrier),
            RoutingMode::Smart => f.write_str("smart"),
        }
    }
}

/// Incremental progress of a bulk job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkProgress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// The order whose result was just recorded.
    pub order_id: OrderId,
}

/// Final accounting of a bulk job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkShipResult {
    pub total_requested: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// In input order. Shorter than `total_requested` only when `cancelled`.
    pub results: Vec<ShipmentResult>,
    /// Orders the router sent to each carrier, whatever the outcome. Smart mode only;
    /// orders that were already shipped are not counted.
    pub routing_summary: Option<BTreeMap<CarrierType, usize>>,
    pub cancelled: bool,
}

impl BulkShipResult {
    pub fn failures(&self) -> impl Iterator<Item = &ShipmentResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Orders worth resubmitting: failures other than `AlreadyShipped`.
    pub fn retryable_order_ids(&self) -> Vec<OrderId> {
        self.failures()
            .filter(|r| r.error_kind != Some(ShipmentErrorKind::AlreadyShipped))
            .map(|r| r.order_id.clone())
            .collect()
    }
}
