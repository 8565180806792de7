//! # Carrier Registry
//!
//! The set of configured carriers, frozen once built. A bulk job holds an `Arc` to one
//! snapshot for its whole run, so no carrier can change underneath the router mid-batch.
use crate::carrier::CarrierAdapter;
use crate::model::{CarrierProfile, CarrierType};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("carrier {0} is already registered")]
    DuplicateCarrier(CarrierType),
}

/// A profile and the adapter that serves it.
#[derive(Clone)]
pub struct RegisteredCarrier {
    pub profile: CarrierProfile,
    pub adapter: Arc<dyn CarrierAdapter>,
    /// Registration position; the router's final tie-break.
    pub index: usize,
}

impl std::fmt::Debug for RegisteredCarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCarrier")
            .field("carrier_type", &self.profile.carrier_type)
            .field("is_active", &self.profile.is_active)
            .field("index", &self.index)
            .finish()
    }
}

impl RegisteredCarrier {
    pub fn carrier_type(&self) -> &CarrierType {
        &self.profile.carrier_type
    }

    pub fn display_name(&self) -> &str {
        &self.profile.display_name
    }
}

#[derive(Debug, Default)]
pub struct CarrierRegistryBuilder {
    carriers: Vec<RegisteredCarrier>,
}

impl CarrierRegistryBuilder {
    pub fn register(
        mut self,
        profile: CarrierProfile,
        adapter: Arc<dyn CarrierAdapter>,
    ) -> Result<Self, RegistryError> {
        if self
            .carriers
            .iter()
            .any(|c| c.profile.carrier_type == profile.carrier_type)
        {
            return Err(RegistryError::DuplicateCarrier(profile.carrier_type));
        }
        let index = self.carriers.len();
        self.carriers.push(RegisteredCarrier {
            profile,
            adapter,
            index,
        });
        Ok(self)
    }

    pub fn build(self) -> Arc<CarrierRegistry> {
        info!(
            carriers = self.carriers.len(),
            active = self.carriers.iter().filter(|c| c.profile.is_active).count(),
            "Carrier registry built"
        );
        Arc::new(CarrierRegistry {
            carriers: self.carriers,
        })
    }
}

/// Immutable snapshot of every configured carrier, in registration order.
#[derive(Debug)]
pub struct CarrierRegistry {
    carriers: Vec<RegisteredCarrier>,
}

impl CarrierRegistry {
    pub fn builder() -> CarrierRegistryBuilder {
        CarrierRegistryBuilder::default()
    }

    pub fn get(&self, carrier_type: &CarrierType) -> Option<&RegisteredCarrier> {
        self.carriers
            .iter()
            .find(|c| &c.profile.carrier_type == carrier_type)
    }

    /// Active carriers, in registration order.
    pub fn active(&self) -> impl Iterator<Item = &RegisteredCarrier> {
        self.carriers.iter().filter(|c| c.profile.is_active)
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.carriers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::testing::ScriptedCarrier;

    #[test]
    fn test_duplicate_carrier_is_rejected() {
        let result = CarrierRegistry::builder()
            .register(
                CarrierProfile::new("a", "Carrier A"),
                Arc::new(ScriptedCarrier::new("A")),
            )
            .and_then(|b| {
                b.register(
                    CarrierProfile::new("a", "Carrier A again"),
                    Arc::new(ScriptedCarrier::new("A2")),
                )
            });
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateCarrier("a".into())
        );
    }

    #[test]
    fn test_active_keeps_registration_order() {
        let registry = CarrierRegistry::builder()
            .register(
                CarrierProfile::new("z", "Zed"),
                Arc::new(ScriptedCarrier::new("Z")),
            )
            .unwrap()
            .register(
                CarrierProfile::new("b", "Bee").inactive(),
                Arc::new(ScriptedCarrier::new("B")),
            )
            .unwrap()
            .register(
                CarrierProfile::new("a", "Ay"),
                Arc::new(ScriptedCarrier::new("A")),
            )
            .unwrap()
            .build();

        let active: Vec<_> = registry.active().map(|c| c.carrier_type().as_str()).collect();
        assert_eq!(active, vec!["z", "a"]);
        assert_eq!(registry.get(&"b".into()).unwrap().index, 1);
        assert_eq!(registry.len(), 3);
    }
}
