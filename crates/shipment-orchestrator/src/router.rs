//! # Smart Router
//!
//! Picks one carrier for an order. Selection is a pure function of the order and the
//! registry snapshot: no I/O, no hidden state, and identical inputs always yield the same
//! carrier.
use crate::config::RouterConfig;
use crate::model::{Order, OrderId};
use crate::registry::{CarrierRegistry, RegisteredCarrier};
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no active carrier covers region {region:?} for order {order_id}")]
    NoCarrierAvailable { order_id: OrderId, region: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmartRouter {
    cost_factor: f64,
    reliability_factor: f64,
    exclude_test_mode: bool,
}

impl Default for SmartRouter {
    fn default() -> Self {
        Self::new(&RouterConfig::default())
    }
}

impl SmartRouter {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            cost_factor: config.cost_factor,
            reliability_factor: config.reliability_factor,
            exclude_test_mode: config.exclude_test_mode,
        }
    }

    /// Lower is better.
    pub fn score(&self, carrier: &RegisteredCarrier) -> f64 {
        self.cost_factor * carrier.profile.cost_weight
            - self.reliability_factor * carrier.profile.reliability_weight
    }

    fn eligible(&self, carrier: &RegisteredCarrier, order: &Order) -> bool {
        let profile = &carrier.profile;
        profile.is_active && !(self.exclude_test_mode && profile.test_mode) && profile.covers(order)
    }

    /// Chooses the best eligible carrier for `order`.
    ///
    /// Eligible means active, covering the recipient's region, and not a sandbox carrier
    /// when those are excluded. Among those the lowest score wins and equal scores go to
    /// the earliest registered.
    pub fn select<'r>(
        &self,
        order: &Order,
        registry: &'r CarrierRegistry,
    ) -> Result<&'r RegisteredCarrier, RoutingError> {
        let chosen = registry
            .active()
            .filter(|c| self.eligible(c, order))
            .min_by(|a, b| {
                self.score(a)
                    .total_cmp(&self.score(b))
                    .then_with(|| a.index.cmp(&b.index))
            });

        match chosen {
            Some(carrier) => {
                debug!(
                    order_id = %order.id,
                    carrier = %carrier.carrier_type(),
                    score = self.score(carrier),
                    "Carrier selected"
                );
                Ok(carrier)
            }
            None => Err(RoutingError::NoCarrierAvailable {
                order_id: order.id.clone(),
                region: order.recipient.region.clone(),
            }),
        }
    }

    /// Every eligible carrier, best first.
    pub fn rank<'r>(
        &self,
        order: &Order,
        registry: &'r CarrierRegistry,
    ) -> Vec<&'r RegisteredCarrier> {
        let mut candidates: Vec<_> = registry
            .active()
            .filter(|c| self.eligible(c, order))
            .collect();
        candidates.sort_by(|a, b| match self.score(a).total_cmp(&self.score(b)) {
            Ordering::Equal => a.index.cmp(&b.index),
            other => other,
        });
        candidates
    }
}
