//! Scriptable carrier double with call instrumentation.
//!
//! Used by this crate's tests and available to downstream crates that want to exercise
//! dispatch and sync paths without a network.
use super::{CarrierAdapter, CarrierError, CarrierStatusReport, ShipReceipt, StatusTable};
use crate::model::{CanonicalStatus, Order};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of one `ship` call.
#[derive(Debug, Clone)]
pub enum ShipStep {
    Succeed,
    Fail(CarrierError),
    /// Never returns; the caller's timeout has to fire.
    Hang,
}

#[derive(Debug)]
pub struct ScriptedCarrier {
    prefix: String,
    delay: Duration,
    statuses: StatusTable,
    ship_script: Mutex<VecDeque<ShipStep>>,
    status_script: Mutex<VecDeque<Result<CarrierStatusReport, CarrierError>>>,
    last_report: Mutex<Option<CarrierStatusReport>>,
    idempotency_keys: Mutex<Vec<String>>,
    ship_calls: AtomicUsize,
    status_calls: AtomicUsize,
    issued: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedCarrier {
    /// Succeeds on every call, issuing `{prefix}-1`, `{prefix}-2`, …
    ///
    /// Understands the canonical status names (`in_transit`, `delivered`, …) as codes.
    pub fn new(prefix: impl Into<String>) -> Self {
        let statuses = [
            CanonicalStatus::Pending,
            CanonicalStatus::Preparing,
            CanonicalStatus::InTransit,
            CanonicalStatus::OutForDelivery,
            CanonicalStatus::Delivered,
            CanonicalStatus::Returned,
            CanonicalStatus::Failed,
        ]
        .into_iter()
        .fold(StatusTable::new(), |t, s| t.with(s.as_str(), s));

        Self {
            prefix: prefix.into(),
            delay: Duration::ZERO,
            statuses,
            ship_script: Mutex::new(VecDeque::new()),
            status_script: Mutex::new(VecDeque::new()),
            last_report: Mutex::new(None),
            idempotency_keys: Mutex::new(Vec::new()),
            ship_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            issued: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Latency added to every `ship` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues the outcome of the next unscripted `ship` call. Calls past the end of the
    /// script succeed.
    pub fn then(self, step: ShipStep) -> Self {
        lock(&self.ship_script).push_back(step);
        self
    }

    /// Queues a status report. The last report is repeated once the queue runs dry.
    pub fn push_status(&self, report: CarrierStatusReport) {
        lock(&self.status_script).push_back(Ok(report));
    }

    pub fn push_status_error(&self, error: CarrierError) {
        lock(&self.status_script).push_back(Err(error));
    }

    pub fn ship_calls(&self) -> usize {
        self.ship_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `ship` calls observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Keys passed to `ship`, in call order.
    pub fn idempotency_keys(&self) -> Vec<String> {
        lock(&self.idempotency_keys).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CarrierAdapter for ScriptedCarrier {
    async fn ship(
        &self,
        _order: &Order,
        idempotency_key: &str,
    ) -> Result<ShipReceipt, CarrierError> {
        self.ship_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.idempotency_keys).push(idempotency_key.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let step = lock(&self.ship_script)
            .pop_front()
            .unwrap_or(ShipStep::Succeed);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match step {
            ShipStep::Succeed => {
                let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
                let tracking_id = format!("{}-{}", self.prefix, n);
                Ok(ShipReceipt {
                    label_ref: Some(format!("scripted://{}", tracking_id)),
                    tracking_id,
                })
            }
            ShipStep::Fail(error) => Err(error),
            ShipStep::Hang => std::future::pending().await,
        }
    }

    async fn fetch_label(&self, tracking_id: &str) -> Result<Vec<u8>, CarrierError> {
        Ok(format!("label:{}", tracking_id).into_bytes())
    }

    async fn fetch_status(
        &self,
        tracking_id: &str,
        _force_advance: bool,
    ) -> Result<CarrierStatusReport, CarrierError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = lock(&self.status_script).pop_front();
        match next {
            Some(Ok(report)) => {
                *lock(&self.last_report) = Some(report.clone());
                Ok(report)
            }
            Some(Err(error)) => Err(error),
            None => lock(&self.last_report)
                .clone()
                .ok_or_else(|| CarrierError::NotFound(tracking_id.to_string())),
        }
    }

    fn translate_status(&self, code: &str) -> Option<CanonicalStatus> {
        self.statuses.translate(code)
    }
}
