//! Carrier configuration as handed to the core by the configuration collaborator.
//!
//! Profiles are read-only here. The registry snapshots them once and the router only ever
//! sees that snapshot.
use crate::model::{Order, OrderField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// Unique key of a carrier integration, e.g. `"sandbox"` or `"bosta"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarrierType(pub String);

impl CarrierType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CarrierType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl Display for CarrierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination regions a carrier accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    All,
    /// Region names, stored lowercased.
    Regions(BTreeSet<String>),
}

impl Coverage {
    pub fn regions<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Coverage::Regions(
            regions
                .into_iter()
                .map(|r| normalize_region(r.as_ref()))
                .collect(),
        )
    }

    /// Case- and whitespace-insensitive region match.
    pub fn includes(&self, region: &str) -> bool {
        match self {
            Coverage::All => true,
            Coverage::Regions(set) => set.contains(&normalize_region(region)),
        }
    }
}

fn normalize_region(region: &str) -> String {
    region.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierProfile {
    pub carrier_type: CarrierType,
    pub display_name: String,
    pub is_active: bool,
    /// Sandbox credentials; shipments are not physical.
    pub test_mode: bool,
    pub required_fields: Vec<OrderField>,
    pub coverage: Coverage,
    /// Relative price. Lower is preferred.
    pub cost_weight: f64,
    /// Relative reliability/capacity. Higher is preferred.
    pub reliability_weight: f64,
}

impl CarrierProfile {
    /// An active, production-mode profile covering every region with neutral weights.
    pub fn new(carrier_type: impl Into<CarrierType>, display_name: impl Into<String>) -> Self {
        Self {
            carrier_type: carrier_type.into(),
            display_name: display_name.into(),
            is_active: true,
            test_mode: false,
            required_fields: Vec::new(),
            coverage: Coverage::All,
            cost_weight: 1.0,
            reliability_weight: 1.0,
        }
    }

    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_weights(mut self, cost_weight: f64, reliability_weight: f64) -> Self {
        self.cost_weight = cost_weight;
        self.reliability_weight = reliability_weight;
        self
    }

    pub fn with_required_fields(mut self, fields: impl IntoIterator<Item = OrderField>) -> Self {
        self.required_fields = fields.into_iter().collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn test_mode(mut self) -> Self {
        self.test_mode = true;
        self
    }

    pub fn covers(&self, order: &Order) -> bool {
        self.coverage.includes(&order.recipient.region)
    }
}
