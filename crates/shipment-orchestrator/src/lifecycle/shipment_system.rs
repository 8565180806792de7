use crate::bulk::{BulkError, BulkOptions, BulkOrchestrator};
use crate::clients::{OrderClient, TimelineClient};
use crate::config::OrchestratorConfig;
use crate::dispatcher::{DispatchPolicy, ShipmentDispatcher};
use crate::labels::{LabelError, LabelFetcher};
use crate::model::{
    BulkShipResult, Order, OrderId, OrderTimeline, RoutingMode, ShipmentRequest, ShipmentResult,
};
use crate::order_actor::OrderError;
use crate::registry::CarrierRegistry;
use crate::router::SmartRouter;
use crate::sync::{StatusSyncEngine, SyncError, SyncOutcome};
use std::sync::Arc;
use tracing::{error, info};

/// The running shipment core.
///
/// `ShipmentSystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping the order and timeline stores
/// - **Dependency Wiring**: handing store clients and the registry snapshot to the
///   dispatcher, bulk orchestrator, sync engine and label fetcher
///
/// # Example
///
/// ```rust
/// use shipment_orchestrator::carrier::SandboxCarrier;
/// use shipment_orchestrator::config::OrchestratorConfig;
/// use shipment_orchestrator::lifecycle::ShipmentSystem;
/// use shipment_orchestrator::model::{CarrierProfile, Order, Recipient, RoutingMode};
/// use shipment_orchestrator::registry::CarrierRegistry;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = CarrierRegistry::builder()
///         .register(CarrierProfile::new("sandbox", "Sandbox"), Arc::new(SandboxCarrier::default()))?
///         .build();
///     let system = ShipmentSystem::new(OrchestratorConfig::default(), registry);
///
///     let recipient = Recipient { address: "1 Nile St".into(), ..Recipient::default() };
///     system.register_order(Order::new("o-1", recipient, 0.0)).await?;
///     let result = system.dispatch_bulk(vec!["o-1".into()], RoutingMode::Smart).await?;
///     assert_eq!(result.success_count, 1);
///
///     system.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct ShipmentSystem {
    /// Client for the Order store
    pub order_client: OrderClient,

    /// Client for the Timeline store
    pub timeline_client: TimelineClient,

    registry: Arc<CarrierRegistry>,
    bulk: BulkOrchestrator,
    sync: StatusSyncEngine,
    labels: LabelFetcher,

    /// Task handles for the running stores (used for graceful shutdown)
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl ShipmentSystem {
    /// Spawns both record stores and wires every component to them.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: OrchestratorConfig, registry: Arc<CarrierRegistry>) -> Self {
        let (order_actor, order_client) = crate::order_actor::new(config.actor_buffer_size);
        let (timeline_actor, timeline_client) =
            crate::timeline_actor::new(config.actor_buffer_size);

        let order_handle = tokio::spawn(order_actor.run(()));
        let timeline_handle = tokio::spawn(timeline_actor.run(()));

        let dispatcher = ShipmentDispatcher::new(
            order_client.clone(),
            timeline_client.clone(),
            DispatchPolicy::from_config(&config),
        );
        let bulk = BulkOrchestrator::new(
            registry.clone(),
            SmartRouter::new(&config.router),
            dispatcher,
            order_client.clone(),
            config.worker_pool_size,
        );
        let sync = StatusSyncEngine::new(
            registry.clone(),
            order_client.clone(),
            timeline_client.clone(),
            config.status_timeout(),
        );
        let labels =
            LabelFetcher::new(registry.clone(), order_client.clone(), config.label_timeout());

        info!(
            carriers = registry.len(),
            worker_pool_size = config.worker_pool_size,
            "Shipment system started"
        );

        Self {
            order_client,
            timeline_client,
            registry,
            bulk,
            sync,
            labels,
            handles: vec![order_handle, timeline_handle],
        }
    }

    pub fn registry(&self) -> &Arc<CarrierRegistry> {
        &self.registry
    }

    pub async fn register_order(&self, order: Order) -> Result<OrderId, OrderError> {
        self.order_client.register_order(order).await
    }

    pub async fn dispatch_bulk(
        &self,
        order_ids: Vec<OrderId>,
        mode: RoutingMode,
    ) -> Result<BulkShipResult, BulkError> {
        self.bulk
            .dispatch_bulk(order_ids, mode, BulkOptions::default())
            .await
    }

    /// [`dispatch_bulk`](Self::dispatch_bulk) with a progress observer and/or cancel token.
    pub async fn dispatch_bulk_with(
        &self,
        order_ids: Vec<OrderId>,
        mode: RoutingMode,
        options: BulkOptions,
    ) -> Result<BulkShipResult, BulkError> {
        self.bulk.dispatch_bulk(order_ids, mode, options).await
    }

    pub async fn dispatch(&self, request: ShipmentRequest) -> Result<ShipmentResult, BulkError> {
        self.bulk.ship_one(request).await
    }

    pub async fn sync_order_status(
        &self,
        order_id: &OrderId,
        force_advance: bool,
    ) -> Result<SyncOutcome, SyncError> {
        self.sync.sync_order_status(order_id, force_advance).await
    }

    pub async fn get_order_timeline(&self, order_id: &OrderId) -> Result<OrderTimeline, SyncError> {
        self.sync.get_order_timeline(order_id).await
    }

    pub async fn fetch_order_label(&self, order_id: &OrderId) -> Result<Vec<u8>, LabelError> {
        self.labels.fetch_order_label(order_id).await
    }

    /// Gracefully shuts down both stores.
    ///
    /// Dropping every client closes the store channels; each `ResourceActor` then leaves
    /// its loop. Clients cloned out of the system keep their store alive, so drop them first.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if both stores shut down cleanly
    /// - `Err(String)` if a store task panicked
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down shipment system...");

        drop(self.bulk);
        drop(self.sync);
        drop(self.labels);
        drop(self.order_client);
        drop(self.timeline_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Store task failed: {:?}", e);
                return Err(format!("Store task failed: {:?}", e));
            }
        }

        info!("Shipment system shutdown complete.");
        Ok(())
    }
}
