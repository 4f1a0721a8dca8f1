//! `invtrack-core`: building blocks shared by the inventory domain.
//!
//! Identifiers, the aggregate contract and the domain error type. Nothing in
//! here touches storage, clocks or randomness.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::DomainError;
pub use id::{AggregateId, UserId};
pub use value_object::ValueObject;
