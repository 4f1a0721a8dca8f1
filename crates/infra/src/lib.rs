//! Infrastructure layer: event store, ordinal allocation, config and the
//! inventory application service.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod inventory_service;
pub mod sequence;
