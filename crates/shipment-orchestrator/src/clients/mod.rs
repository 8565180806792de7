//! Record-specific wrappers around the generic [`ResourceClient`](record_actor::ResourceClient).

pub mod order_client;
pub mod timeline_client;

pub use order_client::OrderClient;
pub use timeline_client::TimelineClient;
