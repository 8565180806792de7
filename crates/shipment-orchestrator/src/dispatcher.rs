//! # Shipment Dispatcher
//!
//! Ships one order through one resolved carrier. Every outcome, good or bad, comes back as
//! a [`ShipmentResult`]; nothing here returns an error to the caller.
//!
//! ## Sequence
//!
//! 1. Reject an order that already carries a tracking id.
//! 2. Check the carrier's required fields. Missing fields never reach the network.
//! 3. Claim the order in the order store under a fresh idempotency key.
//! 4. Call `ship` under a timeout, retrying transient failures with exponential backoff.
//! 5. On success write carrier and tracking id in one update and start the timeline.
//!    On failure release the claim.
use crate::carrier::CarrierError;
use crate::clients::{OrderClient, TimelineClient};
use crate::config::OrchestratorConfig;
use crate::model::{Order, ShipmentErrorKind, ShipmentResult};
use crate::order_actor::OrderError;
use crate::registry::RegisteredCarrier;
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Timeout and retry budget for `ship` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPolicy {
    pub ship_timeout: Duration,
    /// Retries after the first call.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

impl DispatchPolicy {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            ship_timeout: config.ship_timeout(),
            max_retries: config.max_ship_retries,
            base_delay: config.retry_base_delay(),
            backoff_multiplier: config.retry_backoff_multiplier,
            max_delay: config.retry_max_delay(),
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * multiplier^(attempt-1)`,
    /// capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// The carrier's own `retry_after` wins when present, within the same cap.
    fn delay_for(&self, error: &CarrierError, attempt: u32) -> Duration {
        error
            .retry_after()
            .map(|d| d.min(self.max_delay))
            .unwrap_or_else(|| self.backoff(attempt))
    }
}

#[derive(Clone)]
pub struct ShipmentDispatcher {
    orders: OrderClient,
    timelines: TimelineClient,
    policy: DispatchPolicy,
}

impl ShipmentDispatcher {
    pub fn new(orders: OrderClient, timelines: TimelineClient, policy: DispatchPolicy) -> Self {
        Self {
            orders,
            timelines,
            policy,
        }
    }

    #[instrument(skip_all, fields(order_id = %order.id, carrier = %carrier.carrier_type()))]
    pub async fn dispatch(&self, order: &Order, carrier: &RegisteredCarrier) -> ShipmentResult {
        let started = Instant::now();
        let carrier_type = carrier.carrier_type().clone();
        let carrier_name = carrier.display_name().to_string();
        let fail = |kind: ShipmentErrorKind, message: String, attempts: u32| {
            ShipmentResult::failed(order.id.clone(), kind, message)
                .with_carrier(carrier_type.clone(), carrier_name.clone())
                .with_attempts(attempts)
                .with_latency(started.elapsed())
        };

        if let Some(tracking_id) = &order.carrier_tracking_id {
            info!(%tracking_id, "Order already shipped, skipping");
            return fail(
                ShipmentErrorKind::AlreadyShipped,
                format!("order {} already shipped with tracking id {}", order.id, tracking_id),
                0,
            );
        }

        let missing = order.missing_fields(&carrier.profile.required_fields);
        if !missing.is_empty() {
            let fields: Vec<String> = missing.iter().map(|f| f.to_string()).collect();
            debug!(missing = ?fields, "Validation failed");
            return fail(
                ShipmentErrorKind::ValidationError,
                format!("missing required fields for {}: {}", carrier_type, fields.join(", ")),
                0,
            );
        }

        let key = Uuid::new_v4().to_string();
        let claimed = match self.orders.begin_dispatch(&order.id, &key).await {
            Ok(claimed) => claimed,
            Err(e) => {
                let (kind, message) = claim_failure(e);
                info!(%kind, %message, "Dispatch not claimed");
                return fail(kind, message, 0);
            }
        };

        let (outcome, attempts) = self.ship_with_retry(&claimed, carrier, &key).await;
        match outcome {
            Ok(receipt) => {
                if let Err(e) = self
                    .orders
                    .complete_dispatch(
                        &order.id,
                        &key,
                        carrier_type.clone(),
                        receipt.tracking_id.clone(),
                        receipt.label_ref.clone(),
                    )
                    .await
                {
                    // The carrier holds a shipment we could not record. The claim stays in
                    // place so nothing re-ships this order automatically.
                    error!(tracking_id = %receipt.tracking_id, error = %e, "Shipment not recorded");
                    return fail(
                        ShipmentErrorKind::Internal,
                        format!(
                            "carrier accepted shipment {} but it could not be recorded: {}",
                            receipt.tracking_id, e
                        ),
                        attempts,
                    );
                }
                if let Err(e) = self.timelines.ensure(order.id.clone(), Utc::now()).await {
                    warn!(error = %e, "Timeline not started, first sync will create it");
                }
                info!(tracking_id = %receipt.tracking_id, attempts, "Shipped");
                ShipmentResult::succeeded(
                    order.id.clone(),
                    carrier_type,
                    carrier_name,
                    receipt.tracking_id,
                    attempts,
                    started.elapsed(),
                )
            }
            Err(e) => {
                if let Err(release) = self.orders.abandon_dispatch(&order.id, &key).await {
                    warn!(error = %release, "Claim not released");
                }
                warn!(error = %e, attempts, "Shipment failed");
                fail(e.kind(), e.to_string(), attempts)
            }
        }
    }

    async fn ship_with_retry(
        &self,
        order: &Order,
        carrier: &RegisteredCarrier,
        key: &str,
    ) -> (Result<crate::carrier::ShipReceipt, CarrierError>, u32) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match tokio::time::timeout(
                self.policy.ship_timeout,
                carrier.adapter.ship(order, key),
            )
            .await
            {
                Ok(Ok(receipt)) => return (Ok(receipt), attempt),
                Ok(Err(e)) => e,
                Err(_) => CarrierError::Timeout(self.policy.ship_timeout),
            };

            if !error.is_transient() || attempt > self.policy.max_retries {
                return (Err(error), attempt);
            }
            let delay = self.policy.delay_for(&error, attempt);
            warn!(attempt, ?delay, error = %error, "Transient carrier error, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

fn claim_failure(error: OrderError) -> (ShipmentErrorKind, String) {
    match error {
        OrderError::AlreadyShipped {
            order_id,
            tracking_id,
        } => (
            ShipmentErrorKind::AlreadyShipped,
            format!("order {} already shipped with tracking id {}", order_id, tracking_id),
        ),
        OrderError::DispatchInProgress(order_id) => (
            ShipmentErrorKind::AlreadyShipped,
            format!("order {} is already being dispatched", order_id),
        ),
        OrderError::NotFound(order_id) => (
            ShipmentErrorKind::ValidationError,
            format!("order {} not found", order_id),
        ),
        other => (ShipmentErrorKind::Internal, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::testing::{ScriptedCarrier, ShipStep};
    use crate::model::{CarrierProfile, OrderField, Recipient};
    use crate::registry::CarrierRegistry;
    use crate::{order_actor, timeline_actor};
    use record_actor::ActorClient;
    use std::sync::Arc;

    fn fast_policy() -> DispatchPolicy {
        DispatchPolicy {
            ship_timeout: Duration::from_millis(50),
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(5),
        }
    }

    fn order(id: &str) -> Order {
        Order::new(
            id,
            Recipient {
                name: "Mona".into(),
                phone: "+201111".into(),
                address: "1 Corniche".into(),
                city: "Alexandria".into(),
                region: "Alexandria".into(),
                postal_code: None,
            },
            250.0,
        )
    }

    async fn setup(
        carrier: Arc<ScriptedCarrier>,
        profile: CarrierProfile,
    ) -> (ShipmentDispatcher, OrderClient, Arc<CarrierRegistry>) {
        let (order_actor, orders) = order_actor::new(16);
        let (timeline_actor, timelines) = timeline_actor::new(16);
        tokio::spawn(order_actor.run(()));
        tokio::spawn(timeline_actor.run(()));
        let registry = CarrierRegistry::builder()
            .register(profile, carrier)
            .unwrap()
            .build();
        (
            ShipmentDispatcher::new(orders.clone(), timelines, fast_policy()),
            orders,
            registry,
        )
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = DispatchPolicy {
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(350),
            ..fast_policy()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(
            policy.delay_for(
                &CarrierError::RateLimited {
                    retry_after: Some(Duration::from_millis(20))
                },
                3
            ),
            Duration::from_millis(20)
        );
    }

    #[tokio::test]
    async fn test_missing_field_never_reaches_carrier() {
        let carrier = Arc::new(ScriptedCarrier::new("A"));
        let profile =
            CarrierProfile::new("a", "A").with_required_fields([OrderField::PostalCode]);
        let (dispatcher, orders, registry) = setup(carrier.clone(), profile).await;
        orders.register_order(order("o-1")).await.unwrap();

        let result = dispatcher
            .dispatch(&order("o-1"), registry.get(&"a".into()).unwrap())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ShipmentErrorKind::ValidationError));
        assert!(result.error_message.unwrap().contains("postal_code"));
        assert_eq!(carrier.ship_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let carrier = Arc::new(
            ScriptedCarrier::new("A")
                .then(ShipStep::Fail(CarrierError::Rejected("bad address".into()))),
        );
        let (dispatcher, orders, registry) =
            setup(carrier.clone(), CarrierProfile::new("a", "A")).await;
        orders.register_order(order("o-1")).await.unwrap();

        let result = dispatcher
            .dispatch(&order("o-1"), registry.get(&"a".into()).unwrap())
            .await;
        assert_eq!(result.error_kind, Some(ShipmentErrorKind::CarrierRejected));
        assert_eq!(result.attempts, 1);
        assert_eq!(carrier.ship_calls(), 1);

        // The claim was released, so a later dispatch can proceed
        let retry = dispatcher
            .dispatch(&order("o-1"), registry.get(&"a".into()).unwrap())
            .await;
        assert!(retry.success);
    }

    #[tokio::test]
    async fn test_transient_errors_exhaust_retry_budget() {
        let carrier = Arc::new(
            ScriptedCarrier::new("A")
                .then(ShipStep::Fail(CarrierError::Network("reset".into())))
                .then(ShipStep::Fail(CarrierError::Server {
                    status: 502,
                    message: "bad gateway".into(),
                }))
                .then(ShipStep::Fail(CarrierError::RateLimited { retry_after: None })),
        );
        let (dispatcher, orders, registry) =
            setup(carrier.clone(), CarrierProfile::new("a", "A")).await;
        orders.register_order(order("o-1")).await.unwrap();

        let result = dispatcher
            .dispatch(&order("o-1"), registry.get(&"a".into()).unwrap())
            .await;
        assert_eq!(result.error_kind, Some(ShipmentErrorKind::TransientCarrierError));
        assert_eq!(result.attempts, 3);
        assert_eq!(carrier.ship_calls(), 3);

        let stored = orders.get("o-1".into()).await.unwrap().unwrap();
        assert!(stored.carrier_tracking_id.is_none());
    }

    #[tokio::test]
    async fn test_throttled_server_response_is_retried() {
        let carrier = Arc::new(ScriptedCarrier::new("A").then(ShipStep::Fail(
            CarrierError::Server {
                status: 429,
                message: "too many requests".into(),
            },
        )));
        let (dispatcher, orders, registry) =
            setup(carrier.clone(), CarrierProfile::new("a", "A")).await;
        orders.register_order(order("o-1")).await.unwrap();

        let result = dispatcher
            .dispatch(&order("o-1"), registry.get(&"a".into()).unwrap())
            .await;
        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.attempts, 2);
        assert_eq!(carrier.ship_calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_then_success_reuses_idempotency_key() {
        let carrier = Arc::new(ScriptedCarrier::new("A").then(ShipStep::Hang));
        let (dispatcher, orders, registry) =
            setup(carrier.clone(), CarrierProfile::new("a", "A")).await;
        orders.register_order(order("o-1")).await.unwrap();

        let result = dispatcher
            .dispatch(&order("o-1"), registry.get(&"a".into()).unwrap())
            .await;
        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.carrier_tracking_id.as_deref(), Some("A-1"));

        let keys = carrier.idempotency_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], keys[1]);

        let stored = orders.get("o-1".into()).await.unwrap().unwrap();
        assert_eq!(stored.carrier_tracking_id.as_deref(), Some("A-1"));
        assert_eq!(stored.carrier_type, Some("a".into()));
    }

    #[tokio::test]
    async fn test_second_dispatch_is_already_shipped() {
        let carrier = Arc::new(ScriptedCarrier::new("A"));
        let (dispatcher, orders, registry) =
            setup(carrier.clone(), CarrierProfile::new("a", "A")).await;
        orders.register_order(order("o-1")).await.unwrap();
        let a = registry.get(&"a".into()).unwrap();

        assert!(dispatcher.dispatch(&order("o-1"), a).await.success);
        // A stale snapshot without the tracking id still hits the store-side guard
        let again = dispatcher.dispatch(&order("o-1"), a).await;
        assert_eq!(again.error_kind, Some(ShipmentErrorKind::AlreadyShipped));
        assert_eq!(carrier.ship_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_order_is_validation_error() {
        let carrier = Arc::new(ScriptedCarrier::new("A"));
        let (dispatcher, _orders, registry) =
            setup(carrier.clone(), CarrierProfile::new("a", "A")).await;

        let result = dispatcher
            .dispatch(&order("ghost"), registry.get(&"a".into()).unwrap())
            .await;
        assert_eq!(result.error_kind, Some(ShipmentErrorKind::ValidationError));
        assert_eq!(carrier.ship_calls(), 0);
    }
}
