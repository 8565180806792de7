use record_actor::ActorClient;
use shipment_orchestrator::bulk::{cancellation, BulkError, BulkOptions};
use shipment_orchestrator::carrier::testing::{ScriptedCarrier, ShipStep};
use shipment_orchestrator::carrier::CarrierError;
use shipment_orchestrator::config::OrchestratorConfig;
use shipment_orchestrator::lifecycle::ShipmentSystem;
use shipment_orchestrator::model::{
    CarrierProfile, Coverage, Order, OrderField, OrderId, Recipient, RoutingMode,
    ShipmentErrorKind, ShipmentRequest,
};
use shipment_orchestrator::registry::CarrierRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn fast_config(worker_pool_size: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        worker_pool_size,
        ship_timeout_ms: 500,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 5,
        ..OrchestratorConfig::default()
    }
}

fn order(id: &str, region: &str) -> Order {
    Order::new(
        id,
        Recipient {
            name: "Karim".into(),
            phone: "+201234".into(),
            address: "7 Market St".into(),
            city: region.into(),
            region: region.into(),
            postal_code: None,
        },
        120.0,
    )
}

async fn register_all(system: &ShipmentSystem, orders: Vec<Order>) -> Vec<OrderId> {
    let mut ids = Vec::new();
    for o in orders {
        ids.push(system.register_order(o).await.unwrap());
    }
    ids
}

/// Three orders, A active and covering everything, B inactive. A's second call fails with
/// a transient error and succeeds on retry.
#[tokio::test]
async fn test_smart_batch_with_one_transient_failure() {
    let a = Arc::new(
        ScriptedCarrier::new("A")
            .then(ShipStep::Succeed)
            .then(ShipStep::Fail(CarrierError::Network("connection reset".into()))),
    );
    let b = Arc::new(ScriptedCarrier::new("B"));
    let registry = CarrierRegistry::builder()
        .register(CarrierProfile::new("a", "Carrier A"), a.clone())
        .unwrap()
        .register(CarrierProfile::new("b", "Carrier B").inactive(), b.clone())
        .unwrap()
        .build();
    let system = ShipmentSystem::new(fast_config(5), registry);

    let ids = register_all(
        &system,
        vec![order("o-1", "Cairo"), order("o-2", "Giza"), order("o-3", "Aswan")],
    )
    .await;

    let result = system
        .dispatch_bulk(ids.clone(), RoutingMode::Smart)
        .await
        .unwrap();

    assert_eq!(result.total_requested, 3);
    assert_eq!(result.success_count, 3);
    assert_eq!(result.failure_count, 0);
    assert!(!result.cancelled);
    assert_eq!(
        result.routing_summary.as_ref().unwrap().get(&"a".into()).copied(),
        Some(3)
    );
    assert_eq!(a.ship_calls(), 4);
    assert_eq!(b.ship_calls(), 0);
    assert_eq!(result.results.iter().map(|r| r.attempts).sum::<u32>(), 4);

    // Results come back in input order
    let returned: Vec<_> = result.results.iter().map(|r| r.order_id.clone()).collect();
    assert_eq!(returned, ids);

    for id in &ids {
        let stored = system.order_client.get(id.clone()).await.unwrap().unwrap();
        assert!(stored.carrier_tracking_id.is_some());
        assert_eq!(stored.carrier_type, Some("a".into()));
        let timeline = system.get_order_timeline(id).await.unwrap();
        assert_eq!(timeline.events.len(), 1);
    }

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_routing_summary_counts_rejected_orders() {
    let a = Arc::new(
        ScriptedCarrier::new("A").then(ShipStep::Fail(CarrierError::Rejected("no stock".into()))),
    );
    let registry = CarrierRegistry::builder()
        .register(CarrierProfile::new("a", "Carrier A"), a.clone())
        .unwrap()
        .build();
    let system = ShipmentSystem::new(fast_config(1), registry);
    system.register_order(order("o-1", "Cairo")).await.unwrap();

    let result = system
        .dispatch_bulk(vec!["o-1".into()], RoutingMode::Smart)
        .await
        .unwrap();

    assert_eq!(result.failure_count, 1);
    assert_eq!(result.results[0].carrier_type, Some("a".into()));
    let summary = result.routing_summary.as_ref().unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary.get(&"a".into()).copied(), Some(1));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_already_shipped_order_keeps_its_tracking_id() {
    let a = Arc::new(ScriptedCarrier::new("A"));
    let registry = CarrierRegistry::builder()
        .register(CarrierProfile::new("a", "Carrier A"), a.clone())
        .unwrap()
        .build();
    let system = ShipmentSystem::new(fast_config(5), registry);

    let mut shipped = order("o-1", "Cairo");
    shipped.carrier_type = Some("a".into());
    shipped.carrier_tracking_id = Some("X123".into());
    system.register_order(shipped).await.unwrap();

    let result = system
        .dispatch_bulk(vec!["o-1".into()], RoutingMode::Explicit("a".into()))
        .await
        .unwrap();

    let only = &result.results[0];
    assert!(!only.success);
    assert_eq!(only.error_kind, Some(ShipmentErrorKind::AlreadyShipped));
    assert!(only.carrier_tracking_id.is_none());
    assert!(result.routing_summary.is_none());
    assert!(result.retryable_order_ids().is_empty());
    assert_eq!(a.ship_calls(), 0);

    let stored = system.order_client.get("o-1".into()).await.unwrap().unwrap();
    assert_eq!(stored.carrier_tracking_id.as_deref(), Some("X123"));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dispatching_twice_never_issues_a_second_tracking_id() {
    let a = Arc::new(ScriptedCarrier::new("A").with_delay(Duration::from_millis(20)));
    let registry = CarrierRegistry::builder()
        .register(CarrierProfile::new("a", "Carrier A"), a.clone())
        .unwrap()
        .build();
    let system = ShipmentSystem::new(fast_config(4), registry);
    system.register_order(order("o-1", "Cairo")).await.unwrap();

    // The same id twice in one batch races two workers for the claim
    let result = system
        .dispatch_bulk(vec!["o-1".into(), "o-1".into()], RoutingMode::Smart)
        .await
        .unwrap();
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 1);
    assert_eq!(
        result.failures().next().unwrap().error_kind,
        Some(ShipmentErrorKind::AlreadyShipped)
    );

    let again = system
        .dispatch(ShipmentRequest {
            order_id: "o-1".into(),
            carrier_type: None,
        })
        .await
        .unwrap();
    assert_eq!(again.error_kind, Some(ShipmentErrorKind::AlreadyShipped));
    assert_eq!(a.ship_calls(), 1);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_every_order_is_accounted_for() {
    let north = Arc::new(
        ScriptedCarrier::new("N").then(ShipStep::Fail(CarrierError::Rejected(
            "address not found".into(),
        ))),
    );
    let registry = CarrierRegistry::builder()
        .register(
            CarrierProfile::new("north", "North Couriers")
                .with_coverage(Coverage::regions(["Alexandria", "Beheira"]))
                .with_required_fields([OrderField::CodAmount]),
            north.clone(),
        )
        .unwrap()
        .build();
    // One worker keeps the scripted rejection on the first order
    let system = ShipmentSystem::new(fast_config(1), registry);

    let mut prepaid = order("prepaid", "Alexandria");
    prepaid.cod_amount = 0.0;
    register_all(
        &system,
        vec![
            order("rejected", "Alexandria"),
            order("ok-1", "beheira"),
            order("south", "Aswan"),
            prepaid,
            order("ok-2", "ALEXANDRIA"),
        ],
    )
    .await;

    let ids: Vec<OrderId> = ["rejected", "ok-1", "south", "missing", "prepaid", "ok-2"]
        .into_iter()
        .map(OrderId::from)
        .collect();
    let result = system
        .dispatch_bulk(ids.clone(), RoutingMode::Smart)
        .await
        .unwrap();

    assert_eq!(result.results.len(), ids.len());
    assert_eq!(result.success_count + result.failure_count, ids.len());
    let kinds: Vec<_> = result.results.iter().map(|r| r.error_kind).collect();
    assert_eq!(
        kinds,
        vec![
            Some(ShipmentErrorKind::CarrierRejected),
            None,
            Some(ShipmentErrorKind::NoCarrierAvailable),
            Some(ShipmentErrorKind::ValidationError),
            Some(ShipmentErrorKind::ValidationError),
            None,
        ]
    );
    assert_eq!(result.success_count, 2);
    // Rejections and validation failures still count toward the chosen carrier
    assert_eq!(
        result.routing_summary.as_ref().unwrap().get(&"north".into()).copied(),
        Some(4)
    );
    assert_eq!(
        result.retryable_order_ids(),
        vec![
            OrderId::from("rejected"),
            OrderId::from("south"),
            OrderId::from("missing"),
            OrderId::from("prepaid"),
        ]
    );

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrency_never_exceeds_pool_width() {
    let a = Arc::new(ScriptedCarrier::new("A").with_delay(Duration::from_millis(15)));
    let registry = CarrierRegistry::builder()
        .register(CarrierProfile::new("a", "Carrier A"), a.clone())
        .unwrap()
        .build();
    let system = ShipmentSystem::new(fast_config(3), registry);

    let orders = (0..12).map(|i| order(&format!("o-{}", i), "Cairo")).collect();
    let ids = register_all(&system, orders).await;

    let (progress_tx, mut progress_rx) = mpsc::channel(64);
    let result = system
        .dispatch_bulk_with(
            ids,
            RoutingMode::Explicit("a".into()),
            BulkOptions {
                progress: Some(progress_tx),
                cancel: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(result.success_count, 12);
    assert_eq!(a.ship_calls(), 12);
    assert!(a.max_in_flight() <= 3, "max in flight {}", a.max_in_flight());
    assert!(a.max_in_flight() >= 2, "workers did not overlap");

    let mut events = Vec::new();
    while let Some(event) = progress_rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 12);
    assert!(events.windows(2).all(|w| w[0].completed + 1 == w[1].completed));
    let last = events.last().unwrap();
    assert_eq!((last.completed, last.total, last.succeeded, last.failed), (12, 12, 12, 0));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancellation_stops_new_dispatches() {
    let a = Arc::new(ScriptedCarrier::new("A").with_delay(Duration::from_millis(30)));
    let registry = CarrierRegistry::builder()
        .register(CarrierProfile::new("a", "Carrier A"), a.clone())
        .unwrap()
        .build();
    let system = ShipmentSystem::new(fast_config(2), registry);

    let orders = (0..10).map(|i| order(&format!("o-{}", i), "Cairo")).collect();
    let ids = register_all(&system, orders).await;

    let (cancel_handle, cancel_token) = cancellation();
    let (progress_tx, mut progress_rx) = mpsc::channel(16);
    let canceller = tokio::spawn(async move {
        if progress_rx.recv().await.is_some() {
            cancel_handle.cancel();
        }
    });

    let result = system
        .dispatch_bulk_with(
            ids.clone(),
            RoutingMode::Smart,
            BulkOptions {
                progress: Some(progress_tx),
                cancel: Some(cancel_token),
            },
        )
        .await
        .unwrap();
    canceller.await.unwrap();

    assert!(result.cancelled);
    assert_eq!(result.total_requested, 10);
    assert!(!result.results.is_empty());
    assert!(result.results.len() < 10);
    // Everything that reached the carrier finished and was reported
    assert_eq!(a.ship_calls(), result.results.len());
    assert!(result.results.iter().all(|r| r.success));
    assert!(result
        .results
        .iter()
        .zip(ids.iter())
        .all(|(r, id)| &r.order_id == id));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_batch_preconditions() {
    let registry = CarrierRegistry::builder()
        .register(
            CarrierProfile::new("a", "Carrier A").inactive(),
            Arc::new(ScriptedCarrier::new("A")),
        )
        .unwrap()
        .build();
    let system = ShipmentSystem::new(fast_config(2), registry);
    system.register_order(order("o-1", "Cairo")).await.unwrap();

    assert_eq!(
        system.dispatch_bulk(vec![], RoutingMode::Smart).await,
        Err(BulkError::EmptyBatch)
    );
    // With every carrier switched off each order fails on its own
    let inactive = system
        .dispatch_bulk(vec!["o-1".into()], RoutingMode::Smart)
        .await
        .unwrap();
    assert_eq!(inactive.failure_count, 1);
    assert_eq!(
        inactive.results[0].error_kind,
        Some(ShipmentErrorKind::ValidationError)
    );
    assert_eq!(
        system
            .dispatch_bulk(vec!["o-1".into()], "explicit:a".parse().unwrap())
            .await,
        Err(BulkError::CarrierInactive("a".into()))
    );
    assert_eq!(
        system
            .dispatch_bulk(vec!["o-1".into()], "explicit:zzz".parse().unwrap())
            .await,
        Err(BulkError::UnknownCarrier("zzz".into()))
    );
    system.shutdown().await.unwrap();

    let empty = ShipmentSystem::new(fast_config(2), CarrierRegistry::builder().build());
    assert_eq!(
        empty
            .dispatch_bulk(vec!["o-1".into()], RoutingMode::Smart)
            .await,
        Err(BulkError::NoCarriersConfigured)
    );
    empty.shutdown().await.unwrap();
}
