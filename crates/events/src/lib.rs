//! Event contract shared by the domain crates and the event store.

pub mod event;

pub use event::Event;
