//! # Bulk Orchestrator
//!
//! Fans a batch of orders out over at most `worker_pool_size` concurrent dispatches.
//!
//! Workers never touch the aggregate. Each one sends `(index, ShipmentResult)` back over a
//! channel and the orchestrator task, the only owner of the counters and result slots,
//! records it. A per-order failure is just another result; only batch-level preconditions
//! fail the call itself.
//!
//! Cancellation stops new workers from starting. Dispatches already running finish, since a
//! shipment the carrier accepted cannot be taken back, and their results are reported.
use crate::clients::OrderClient;
use crate::dispatcher::ShipmentDispatcher;
use crate::model::{
    BulkProgress, BulkShipResult, CarrierType, OrderId, RoutingMode, ShipmentErrorKind,
    ShipmentRequest, ShipmentResult,
};
use crate::registry::{CarrierRegistry, RegisteredCarrier};
use crate::router::SmartRouter;
use record_actor::ActorClient;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Batch-level precondition failures. Per-order problems are reported in the results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BulkError {
    #[error("batch contains no orders")]
    EmptyBatch,

    #[error("no carriers are configured")]
    NoCarriersConfigured,

    #[error("carrier {0} is not registered")]
    UnknownCarrier(CarrierType),

    #[error("carrier {0} is not active")]
    CarrierInactive(CarrierType),
}

/// Creates a linked cancel handle and token.
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if the handle is dropped first.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Optional observers for a bulk job.
#[derive(Debug, Default)]
pub struct BulkOptions {
    /// Receives one event per recorded result. Events are dropped, not awaited, when the
    /// receiver falls behind.
    pub progress: Option<mpsc::Sender<BulkProgress>>,
    pub cancel: Option<CancelToken>,
}

#[derive(Clone)]
pub struct BulkOrchestrator {
    registry: Arc<CarrierRegistry>,
    router: SmartRouter,
    dispatcher: ShipmentDispatcher,
    orders: OrderClient,
    worker_pool_size: usize,
}

/// Everything a worker needs, shared read-only across one batch.
struct BatchContext {
    registry: Arc<CarrierRegistry>,
    router: SmartRouter,
    dispatcher: ShipmentDispatcher,
    orders: OrderClient,
    explicit: Option<RegisteredCarrier>,
}

impl BulkOrchestrator {
    pub fn new(
        registry: Arc<CarrierRegistry>,
        router: SmartRouter,
        dispatcher: ShipmentDispatcher,
        orders: OrderClient,
        worker_pool_size: usize,
    ) -> Self {
        Self {
            registry,
            router,
            dispatcher,
            orders,
            worker_pool_size: worker_pool_size.max(1),
        }
    }

    fn prepare(&self, mode: &RoutingMode) -> Result<Arc<BatchContext>, BulkError> {
        if self.registry.is_empty() {
            return Err(BulkError::NoCarriersConfigured);
        }
        let explicit = match mode {
            RoutingMode::Smart => None,
            RoutingMode::Explicit(carrier_type) => {
                let carrier = self
                    .registry
                    .get(carrier_type)
                    .ok_or_else(|| BulkError::UnknownCarrier(carrier_type.clone()))?;
                if !carrier.profile.is_active {
                    return Err(BulkError::CarrierInactive(carrier_type.clone()));
                }
                Some(carrier.clone())
            }
        };
        Ok(Arc::new(BatchContext {
            registry: self.registry.clone(),
            router: self.router.clone(),
            dispatcher: self.dispatcher.clone(),
            orders: self.orders.clone(),
            explicit,
        }))
    }

    /// Ships one order, routed the same way a batch would route it.
    #[instrument(skip(self))]
    pub async fn ship_one(&self, request: ShipmentRequest) -> Result<ShipmentResult, BulkError> {
        let mode = match request.carrier_type {
            Some(carrier_type) => RoutingMode::Explicit(carrier_type),
            None => RoutingMode::Smart,
        };
        let context = self.prepare(&mode)?;
        Ok(context.process(request.order_id).await)
    }

    /// Ships every order in `order_ids` and returns the full accounting, in input order.
    #[instrument(skip_all, fields(total = order_ids.len(), mode = %mode))]
    pub async fn dispatch_bulk(
        &self,
        order_ids: Vec<OrderId>,
        mode: RoutingMode,
        options: BulkOptions,
    ) -> Result<BulkShipResult, BulkError> {
        if order_ids.is_empty() {
            return Err(BulkError::EmptyBatch);
        }
        let context = self.prepare(&mode)?;

        let total = order_ids.len();
        let width = self.worker_pool_size.min(total);
        info!(width, "Bulk dispatch started");

        let BulkOptions { progress, mut cancel } = options;
        let (result_tx, mut result_rx) = mpsc::channel::<(usize, ShipmentResult)>(width);
        let mut slots: Vec<Option<ShipmentResult>> = vec![None; total];
        let mut queue = order_ids.into_iter().enumerate();
        let mut in_flight = 0usize;
        let mut completed = 0usize;
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut cancelled = cancel.as_ref().is_some_and(|t| t.is_cancelled());

        loop {
            while !cancelled && in_flight < width {
                let Some((index, order_id)) = queue.next() else {
                    break;
                };
                spawn_worker(context.clone(), index, order_id, result_tx.clone());
                in_flight += 1;
            }
            if in_flight == 0 {
                break;
            }

            tokio::select! {
                biased;
                _ = wait_for_cancel(&mut cancel), if !cancelled => {
                    cancelled = true;
                    warn!(in_flight, completed, "Bulk dispatch cancelled, draining");
                }
                Some((index, result)) = result_rx.recv() => {
                    in_flight -= 1;
                    completed += 1;
                    if result.success {
                        succeeded += 1;
                    } else {
                        failed += 1;
                    }
                    if let Some(progress) = &progress {
                        let event = BulkProgress {
                            completed,
                            total,
                            succeeded,
                            failed,
                            order_id: result.order_id.clone(),
                        };
                        if progress.try_send(event).is_err() {
                            debug!(completed, "Progress observer lagging, event dropped");
                        }
                    }
                    slots[index] = Some(result);
                }
                else => break,
            }
        }

        let results: Vec<ShipmentResult> = slots.into_iter().flatten().collect();
        let routing_summary = matches!(mode, RoutingMode::Smart).then(|| {
            results
                .iter()
                .filter(|r| r.error_kind != Some(ShipmentErrorKind::AlreadyShipped))
                .filter_map(|r| r.carrier_type.clone())
                .fold(BTreeMap::new(), |mut summary, carrier| {
                    *summary.entry(carrier).or_insert(0) += 1;
                    summary
                })
        });

        info!(succeeded, failed, cancelled, "Bulk dispatch finished");
        Ok(BulkShipResult {
            total_requested: total,
            success_count: succeeded,
            failure_count: failed,
            results,
            routing_summary,
            cancelled,
        })
    }
}

impl BatchContext {
    async fn process(&self, order_id: OrderId) -> ShipmentResult {
        let order = match self.orders.get(order_id.clone()).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                return ShipmentResult::failed(
                    order_id.clone(),
                    ShipmentErrorKind::ValidationError,
                    format!("order {} not found", order_id),
                )
            }
            Err(e) => {
                return ShipmentResult::failed(order_id, ShipmentErrorKind::Internal, e.to_string())
            }
        };

        let carrier = match &self.explicit {
            Some(carrier) => carrier,
            None if self.registry.active().next().is_none() => {
                return ShipmentResult::failed(
                    order_id,
                    ShipmentErrorKind::ValidationError,
                    "no active carriers are configured",
                )
            }
            None => match self.router.select(&order, &self.registry) {
                Ok(carrier) => carrier,
                Err(e) => {
                    info!(order_id = %order.id, error = %e, "Routing failed");
                    return ShipmentResult::failed(
                        order_id,
                        ShipmentErrorKind::NoCarrierAvailable,
                        e.to_string(),
                    );
                }
            },
        };

        self.dispatcher.dispatch(&order, carrier).await
    }
}

fn spawn_worker(
    context: Arc<BatchContext>,
    index: usize,
    order_id: OrderId,
    results: mpsc::Sender<(usize, ShipmentResult)>,
) {
    tokio::spawn(async move {
        // Run the dispatch in its own task so a panicking adapter still yields a result.
        let id = order_id.clone();
        let result = match tokio::spawn(async move { context.process(id).await }).await {
            Ok(result) => result,
            Err(e) => ShipmentResult::failed(
                order_id,
                ShipmentErrorKind::Internal,
                format!("dispatch task failed: {}", e),
            ),
        };
        let _ = results.send((index, result)).await;
    });
}

async fn wait_for_cancel(token: &mut Option<CancelToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
