//! Append-only event store boundary.
//!
//! Inventories and items are stored as one event stream per aggregate id. Only an
//! in-memory backend ships here; the allocator is the sole component that needs
//! cross-request atomicity on real storage.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
