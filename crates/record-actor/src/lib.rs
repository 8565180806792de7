//! # Record Actor
//!
//! Single-owner record stores built on the **Actor Model** with Tokio.
//!
//! Each store is a [`ResourceActor`] running in its own task. It owns a `HashMap` of records
//! and handles requests one at a time, so record-level invariants (a field that may only be
//! set once, a status that may only move forward) are enforced without locks: the check and
//! the write happen inside the same message.
//!
//! ## Architecture Overview
//!
//! 1. **Entity Layer** ([`ActorEntity`]) - the record and the actions that mutate it
//! 2. **Runtime Layer** ([`ResourceActor`]) - message processing and ownership of state
//! 3. **Interface Layer** ([`ResourceClient`], [`ActorClient`]) - type-safe async access
//!
//! ## Operations
//!
//! | Request | Behaviour |
//! |---------|-----------|
//! | `Insert` | Stores a record under [`ActorEntity::id`]; duplicates are rejected |
//! | `Get` | Returns a snapshot clone |
//! | `Action` | Runs [`ActorEntity::handle_action`] inside the owning task |
//!
//! There is no delete: records written through this crate are append-mostly.
//!
//! ## Context Injection
//!
//! Dependencies are injected at `run(context)` time, not at construction time, so stores
//! that reference each other can be created first and wired afterwards.
//!
//! ## Testing
//!
//! [`mock::MockClient`] answers a real `ResourceClient` from scripted expectations.
//!
//! **Further Reading**:
//! - [Actors in Rust](https://ryhl.io/blog/actors-with-tokio/) - Practical guide to implementing actors with Tokio

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

// Re-export core types for convenience
pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
