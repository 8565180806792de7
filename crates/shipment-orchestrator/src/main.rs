//! Demo: ships a small batch through two sandbox carriers, then walks one order's
//! timeline to delivery.
//!
//! Configuration is read from the file named by the first argument, if any, and from
//! `SHIPMENT__*` environment variables.

use shipment_orchestrator::bulk::{cancellation, BulkOptions};
use shipment_orchestrator::carrier::SandboxCarrier;
use shipment_orchestrator::config::OrchestratorConfig;
use shipment_orchestrator::lifecycle::tracing::setup_tracing;
use shipment_orchestrator::lifecycle::ShipmentSystem;
use shipment_orchestrator::model::{
    BulkProgress, CarrierProfile, Coverage, Order, OrderField, OrderId, Recipient, RoutingMode,
};
use shipment_orchestrator::registry::CarrierRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, Instrument};

fn recipient(name: &str, city: &str, region: &str) -> Recipient {
    Recipient {
        name: name.to_string(),
        phone: "+20100000000".to_string(),
        address: format!("{} main street", city),
        city: city.to_string(),
        region: region.to_string(),
        postal_code: None,
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = OrchestratorConfig::load(config_path.as_deref()).map_err(|e| e.to_string())?;

    let registry = CarrierRegistry::builder()
        .register(
            CarrierProfile::new("delta", "Delta Express")
                .with_coverage(Coverage::regions(["Cairo", "Giza"]))
                .with_weights(1.0, 2.0)
                .with_required_fields([OrderField::Phone, OrderField::Address]),
            Arc::new(SandboxCarrier::new("DLT")),
        )
        .and_then(|b| {
            b.register(
                CarrierProfile::new("nile", "Nile Post").with_weights(1.5, 1.0),
                Arc::new(SandboxCarrier::new("NIL")),
            )
        })
        .map_err(|e| e.to_string())?
        .build();

    let system = ShipmentSystem::new(config, registry);

    let orders = [
        Order::new("order_1", recipient("Salma", "Cairo", "Cairo"), 320.0),
        Order::new("order_2", recipient("Youssef", "Alexandria", "Alexandria"), 0.0),
        Order::new("order_3", recipient("Hana", "Giza", "Giza"), 145.5),
    ];
    let mut ids: Vec<OrderId> = Vec::new();
    for order in orders {
        ids.push(system.register_order(order).await.map_err(|e| e.to_string())?);
    }

    let (progress_tx, mut progress_rx) = mpsc::channel::<BulkProgress>(16);
    let progress_task = tokio::spawn(async move {
        while let Some(p) = progress_rx.recv().await {
            info!(completed = p.completed, total = p.total, order_id = %p.order_id, "Progress");
        }
    });
    let (_cancel_handle, cancel_token) = cancellation();

    let span = tracing::info_span!("bulk_shipping");
    let batch = system
        .dispatch_bulk_with(
            ids.clone(),
            RoutingMode::Smart,
            BulkOptions {
                progress: Some(progress_tx),
                cancel: Some(cancel_token),
            },
        )
        .instrument(span)
        .await
        .map_err(|e| e.to_string())?;
    let _ = progress_task.await;

    println!(
        "{}",
        serde_json::to_string_pretty(&batch).map_err(|e| e.to_string())?
    );

    // A second run is safe: every order comes back AlreadyShipped
    let rerun = system
        .dispatch_bulk(ids.clone(), RoutingMode::Smart)
        .await
        .map_err(|e| e.to_string())?;
    info!(failed = rerun.failure_count, "Re-run against shipped orders");

    let span = tracing::info_span!("status_sync");
    async {
        let order_id = &ids[0];
        loop {
            match system.sync_order_status(order_id, true).await {
                Ok(outcome) => {
                    info!(
                        status = %outcome.timeline.current_status(),
                        changed = outcome.status_changed,
                        "Synced"
                    );
                    if outcome.timeline.is_terminal() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Sync failed");
                    break;
                }
            }
        }
    }
    .instrument(span)
    .await;

    match system.get_order_timeline(&ids[0]).await {
        Ok(timeline) => println!(
            "{}",
            serde_json::to_string_pretty(&timeline.steps()).map_err(|e| e.to_string())?
        ),
        Err(e) => error!(error = %e, "Timeline unavailable"),
    }

    match system.fetch_order_label(&ids[0]).await {
        Ok(label) => println!("{}", String::from_utf8_lossy(&label)),
        Err(e) => error!(error = %e, "Label unavailable"),
    }

    system.shutdown().await?;
    info!("Demo completed");
    Ok(())
}
