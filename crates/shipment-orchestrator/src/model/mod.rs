//! Pure data structures. [`Order`] and [`OrderTimeline`] are also records owned by
//! [`ResourceActor`](record_actor::ResourceActor)s.

pub mod carrier;
pub mod order;
pub mod shipment;
pub mod timeline;

pub use carrier::*;
pub use order::*;
pub use shipment::*;
pub use timeline::*;
