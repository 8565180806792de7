//! In-process "time travel" carrier for demos and sandbox accounts.
//!
//! Shipments start at `created` and move one stage forward each time status is fetched
//! with `force_advance`. Without it the status is stable, like a real carrier between scans.
use super::{
    CarrierAdapter, CarrierError, CarrierStatusReport, RawCarrierEvent, ShipReceipt, StatusTable,
};
use crate::model::{CanonicalStatus, Order};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const STAGES: [(&str, &str); 5] = [
    ("created", "Shipment registered"),
    ("picked_up", "Picked up from merchant"),
    ("in_transit", "Arrived at sorting hub"),
    ("out_for_delivery", "With courier"),
    ("delivered", "Delivered to recipient"),
];

#[derive(Debug)]
struct SandboxShipment {
    label: String,
    stage: usize,
    history: Vec<DateTime<Utc>>,
    /// Same key replays the same receipt.
    idempotency_key: String,
}

#[derive(Debug)]
pub struct SandboxCarrier {
    prefix: String,
    statuses: StatusTable,
    shipments: Mutex<HashMap<String, SandboxShipment>>,
}

impl Default for SandboxCarrier {
    fn default() -> Self {
        Self::new("SBX")
    }
}

impl SandboxCarrier {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            statuses: StatusTable::from([
                ("created", CanonicalStatus::Pending),
                ("picked_up", CanonicalStatus::Preparing),
                ("in_transit", CanonicalStatus::InTransit),
                ("out_for_delivery", CanonicalStatus::OutForDelivery),
                ("delivered", CanonicalStatus::Delivered),
                ("returned_to_sender", CanonicalStatus::Returned),
                ("lost", CanonicalStatus::Failed),
            ]),
            shipments: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SandboxShipment>> {
        // A panic while holding the lock cannot leave a shipment half-written.
        self.shipments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CarrierAdapter for SandboxCarrier {
    async fn ship(
        &self,
        order: &Order,
        idempotency_key: &str,
    ) -> Result<ShipReceipt, CarrierError> {
        if order.recipient.address.trim().is_empty() {
            return Err(CarrierError::Rejected(format!(
                "order {} has no delivery address",
                order.id
            )));
        }

        let mut shipments = self.lock();
        if let Some((tracking_id, _)) = shipments
            .iter()
            .find(|(_, s)| s.idempotency_key == idempotency_key)
        {
            return Ok(ShipReceipt {
                tracking_id: tracking_id.clone(),
                label_ref: Some(format!("sandbox://labels/{}", tracking_id)),
            });
        }

        let simple = Uuid::new_v4().simple().to_string();
        let tracking_id = format!("{}-{}", self.prefix, simple[..12].to_uppercase());
        let label = format!(
            "SANDBOX LABEL\n{}\n{}\n{}, {}\n{}\nCOD {:.2}\n",
            tracking_id,
            order.recipient.name,
            order.recipient.address,
            order.recipient.city,
            order.recipient.region,
            order.cod_amount
        );
        shipments.insert(
            tracking_id.clone(),
            SandboxShipment {
                label,
                stage: 0,
                history: vec![Utc::now()],
                idempotency_key: idempotency_key.to_string(),
            },
        );
        debug!(order_id = %order.id, %tracking_id, "Sandbox shipment created");

        Ok(ShipReceipt {
            label_ref: Some(format!("sandbox://labels/{}", tracking_id)),
            tracking_id,
        })
    }

    async fn fetch_label(&self, tracking_id: &str) -> Result<Vec<u8>, CarrierError> {
        self.lock()
            .get(tracking_id)
            .map(|s| s.label.clone().into_bytes())
            .ok_or_else(|| CarrierError::NotFound(tracking_id.to_string()))
    }

    async fn fetch_status(
        &self,
        tracking_id: &str,
        force_advance: bool,
    ) -> Result<CarrierStatusReport, CarrierError> {
        let mut shipments = self.lock();
        let shipment = shipments
            .get_mut(tracking_id)
            .ok_or_else(|| CarrierError::NotFound(tracking_id.to_string()))?;

        if force_advance && shipment.stage + 1 < STAGES.len() {
            shipment.stage += 1;
            shipment.history.push(Utc::now());
            debug!(%tracking_id, stage = STAGES[shipment.stage].0, "Sandbox advanced");
        }

        let events = shipment
            .history
            .iter()
            .zip(STAGES.iter())
            .map(|(at, (code, note))| RawCarrierEvent {
                status: code.to_string(),
                timestamp: Some(*at),
                location: Some("Sandbox hub".to_string()),
                notes: Some(note.to_string()),
            })
            .collect();

        Ok(CarrierStatusReport {
            status: STAGES[shipment.stage].0.to_string(),
            events,
        })
    }

    fn translate_status(&self, code: &str) -> Option<CanonicalStatus> {
        self.statuses.translate(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Recipient;

    fn order() -> Order {
        Order::new(
            "o-1",
            Recipient {
                name: "Omar".into(),
                phone: "+201000".into(),
                address: "5 Tahrir Sq".into(),
                city: "Cairo".into(),
                region: "Cairo".into(),
                postal_code: None,
            },
            99.5,
        )
    }

    #[tokio::test]
    async fn test_status_only_moves_on_force_advance() {
        let carrier = SandboxCarrier::default();
        let receipt = carrier.ship(&order(), "k1").await.unwrap();
        assert!(receipt.tracking_id.starts_with("SBX-"));

        let still = carrier.fetch_status(&receipt.tracking_id, false).await.unwrap();
        assert_eq!(still.status, "created");

        for expected in ["picked_up", "in_transit", "out_for_delivery", "delivered", "delivered"] {
            let report = carrier.fetch_status(&receipt.tracking_id, true).await.unwrap();
            assert_eq!(report.status, expected);
        }
        assert_eq!(
            carrier.translate_status("DELIVERED"),
            Some(CanonicalStatus::Delivered)
        );
    }

    #[tokio::test]
    async fn test_same_key_replays_receipt() {
        let carrier = SandboxCarrier::new("T");
        let first = carrier.ship(&order(), "k1").await.unwrap();
        let replay = carrier.ship(&order(), "k1").await.unwrap();
        let other = carrier.ship(&order(), "k2").await.unwrap();
        assert_eq!(first, replay);
        assert_ne!(first.tracking_id, other.tracking_id);

        let label = carrier.fetch_label(&first.tracking_id).await.unwrap();
        assert!(String::from_utf8(label).unwrap().contains("5 Tahrir Sq"));
        assert!(matches!(
            carrier.fetch_label("nope").await,
            Err(CarrierError::NotFound(_))
        ));
    }
}
