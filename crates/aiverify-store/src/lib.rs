//! Registry storage for the AI Verify plugin registry.
//!
//! The registry is a set of hash records in a key-value store. This crate
//! defines the [`RegistryStore`] seam with an in-memory and a Redis backend,
//! the record encoding shared by writers and readers, and the notification
//! [`Publisher`] used to tell the test engine about algorithm changes.

mod memory;
mod pubsub;
pub mod record;
mod redis_store;
mod store;

pub use memory::MemoryStore;
pub use pubsub::{AlgoEvent, MemoryPublisher, Notification, Publisher};
pub use redis_store::RedisStore;
pub use store::{BoxFuture, Fields, RegistryStore, StoreBatch, StoreOp, StoreResult};
