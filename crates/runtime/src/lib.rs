//! Runtime orchestration for the interaction system.
//!
//! This crate hosts both trust sides of [`interaction_core`] in one process:
//! an authority worker that owns the authoritative world, and one requester
//! worker per locally controlled agent running against a replica. The sides
//! exchange bincode-encoded requests and notifies and never share state.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the handles and errors downstream clients interact with
//! - [`events`] provides the topic-based event bus
//! - [`pool`] recycles pickup entities on the authority
//! - [`replication`] and [`transport`] carry state and messages between sides
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod events;
pub mod pool;
pub mod replication;
pub mod runtime;
pub mod transport;

mod workers;

pub use api::{
    AuthorityHandle, PoolStats, RequesterHandle, RequesterStatus, Result, RuntimeError,
};
pub use events::{Event, EventBus, InteractorEvent, Topic};
pub use pool::{ItemInstance, ItemSink, MemoryItemSink, PoolConfig, WorldItemPool};
pub use replication::ReplicatedWorld;
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use transport::CodecError;
