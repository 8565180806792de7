//! # Observability
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by
//! `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=info cargo run     # batch start/finish, shipments, timeline advances
//! RUST_LOG=debug cargo run    # every store request, routing scores, claims
//! RUST_LOG=shipment_orchestrator::sync=debug,info cargo run
//! ```
//!
//! Store logs carry `entity_type` (`Order`, `OrderTimeline`) instead of a module path.
//! Dispatch logs run inside a span with `order_id` and `carrier`, for example:
//!
//! ```text
//! INFO dispatch_bulk:dispatch: Shipped total=3 mode=smart order_id=o-2 carrier=sandbox tracking_id="SBX-1F0C9A2B44D1" attempts=1
//! WARN dispatch_bulk:dispatch: Transient carrier error, retrying ... attempt=1 delay=200ms error=network error: reset
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
