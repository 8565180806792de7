//! An order as seen by the shipment core.
//!
//! # Record Actor
//! This struct implements the [`ActorEntity`](record_actor::ActorEntity) trait (see
//! [`crate::order_actor`]), so it is owned by a single `ResourceActor` and only changed
//! through [`OrderAction`](crate::order_actor::OrderAction)s. The order-management
//! collaborator registers orders; the core touches shipment fields only.
use crate::model::{CanonicalStatus, CarrierType};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier assigned by the order-management collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery contact and address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postal_code: Option<String>,
}

/// Order fields a carrier can declare as mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    RecipientName,
    Phone,
    Address,
    City,
    Region,
    PostalCode,
    CodAmount,
}

impl Display for OrderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderField::RecipientName => "recipient_name",
            OrderField::Phone => "phone",
            OrderField::Address => "address",
            OrderField::City => "city",
            OrderField::Region => "region",
            OrderField::PostalCode => "postal_code",
            OrderField::CodAmount => "cod_amount",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub recipient: Recipient,
    /// Cash to collect on delivery. Zero means prepaid.
    pub cod_amount: f64,
    pub status: CanonicalStatus,
    pub carrier_type: Option<CarrierType>,
    /// Set once, on the first successful shipment.
    pub carrier_tracking_id: Option<String>,
    pub label_ref: Option<String>,
    /// Idempotency key of the dispatch currently holding the claim.
    #[serde(skip)]
    pub dispatch_claim: Option<String>,
}

impl Order {
    /// Creates an unshipped order in `pending` state.
    pub fn new(id: impl Into<OrderId>, recipient: Recipient, cod_amount: f64) -> Self {
        Self {
            id: id.into(),
            recipient,
            cod_amount,
            status: CanonicalStatus::Pending,
            carrier_type: None,
            carrier_tracking_id: None,
            label_ref: None,
            dispatch_claim: None,
        }
    }

    pub fn is_shipped(&self) -> bool {
        self.carrier_tracking_id.is_some()
    }

    /// The fields in `required` that are blank on this order, in the order given.
    pub fn missing_fields(&self, required: &[OrderField]) -> Vec<OrderField> {
        required
            .iter()
            .copied()
            .filter(|field| !self.has_field(*field))
            .collect()
    }

    fn has_field(&self, field: OrderField) -> bool {
        let r = &self.recipient;
        match field {
            OrderField::RecipientName => !r.name.trim().is_empty(),
            OrderField::Phone => !r.phone.trim().is_empty(),
            OrderField::Address => !r.address.trim().is_empty(),
            OrderField::City => !r.city.trim().is_empty(),
            OrderField::Region => !r.region.trim().is_empty(),
            OrderField::PostalCode => r
                .postal_code
                .as_deref()
                .is_some_and(|code| !code.trim().is_empty()),
            OrderField::CodAmount => self.cod_amount.is_finite() && self.cod_amount > 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> Recipient {
        Recipient {
            name: "Layla".into(),
            phone: "+20100000000".into(),
            address: "12 Nile St".into(),
            city: "Cairo".into(),
            region: "Cairo".into(),
            postal_code: None,
        }
    }

    #[test]
    fn test_missing_fields_reports_blank_values() {
        let mut order = Order::new("o-1", recipient(), 0.0);
        order.recipient.phone = "   ".into();

        let missing = order.missing_fields(&[
            OrderField::RecipientName,
            OrderField::Phone,
            OrderField::PostalCode,
            OrderField::CodAmount,
        ]);
        assert_eq!(
            missing,
            vec![OrderField::Phone, OrderField::PostalCode, OrderField::CodAmount]
        );
    }

    #[test]
    fn test_complete_order_has_no_missing_fields() {
        let mut order = Order::new("o-2", recipient(), 150.0);
        order.recipient.postal_code = Some("11511".into());
        let all = [
            OrderField::RecipientName,
            OrderField::Phone,
            OrderField::Address,
            OrderField::City,
            OrderField::Region,
            OrderField::PostalCode,
            OrderField::CodAmount,
        ];
        assert!(order.missing_fields(&all).is_empty());
        assert!(!order.is_shipped());
    }
}
