//! Command execution pipeline (application-level orchestration).
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply historical events)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events (append-only, optimistic concurrency check)
//! ```
//!
//! This module contains no IO itself; it composes the `EventStore` trait.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use invtrack_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure (stale stream version, duplicate create).
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
    /// Domain validation failure (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Domain invariant failure (deterministic).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// The target aggregate does not exist (or was deleted).
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Failed to deserialize historical event payloads into the aggregate event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    /// Reading from or appending to the event store failed.
    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound(kind) => DispatchError::NotFound(kind),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Events are persisted with `ExpectedVersion::Exact(loaded_version)`, so two
/// commands racing on the same stream cannot both commit; the loser gets
/// `DispatchError::Concurrency` and may retry against fresh state.
///
/// Aggregates used here must be deterministic and side-effect free, and must bump
/// their version once per applied event.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Rehydrate an aggregate from its stream without executing a command.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    /// Dispatch a command through the full pipeline.
    ///
    /// Returns the committed events (empty when the command was a no-op).
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: invtrack_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(aggregate_id, aggregate_type.clone(), Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.store.append(uncommitted, expected)?)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Guard against a backend returning foreign or out-of-order events.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use invtrack_core::{AggregateRoot, UserId};
    use invtrack_inventory::{
        CreateInventory, Inventory, InventoryCommand, InventoryId, RenameInventory,
    };

    use crate::event_store::InMemoryEventStore;

    fn create(inventory_id: InventoryId, title: &str) -> InventoryCommand {
        InventoryCommand::CreateInventory(CreateInventory {
            inventory_id,
            title: title.to_string(),
            created_by: UserId::new(),
            id_format: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn dispatch_persists_and_load_rehydrates() {
        let dispatcher = CommandDispatcher::new(InMemoryEventStore::new());
        let inventory_id = InventoryId::new(AggregateId::new());

        let committed = dispatcher
            .dispatch(inventory_id.0, "inventory", create(inventory_id, "Books"), |id| {
                Inventory::empty(InventoryId::new(id))
            })
            .unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].event_type, "inventory.created");

        let loaded = dispatcher
            .load(inventory_id.0, |id| Inventory::empty(InventoryId::new(id)))
            .unwrap();
        assert!(loaded.is_created());
        assert_eq!(loaded.title(), "Books");
        assert_eq!(loaded.version(), 1);
    }

    #[test]
    fn domain_errors_are_mapped() {
        let dispatcher = CommandDispatcher::new(InMemoryEventStore::new());
        let inventory_id = InventoryId::new(AggregateId::new());

        let err = dispatcher
            .dispatch(
                inventory_id.0,
                "inventory",
                InventoryCommand::RenameInventory(RenameInventory {
                    inventory_id,
                    title: "Nope".to_string(),
                    occurred_at: Utc::now(),
                }),
                |id| Inventory::empty(InventoryId::new(id)),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound("inventory")));

        dispatcher
            .dispatch(inventory_id.0, "inventory", create(inventory_id, "Books"), |id| {
                Inventory::empty(InventoryId::new(id))
            })
            .unwrap();
        let err = dispatcher
            .dispatch(inventory_id.0, "inventory", create(inventory_id, "Books"), |id| {
                Inventory::empty(InventoryId::new(id))
            })
            .unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
    }

    #[test]
    fn no_op_commands_append_nothing() {
        let dispatcher = CommandDispatcher::new(InMemoryEventStore::new());
        let inventory_id = InventoryId::new(AggregateId::new());
        dispatcher
            .dispatch(inventory_id.0, "inventory", create(inventory_id, "Books"), |id| {
                Inventory::empty(InventoryId::new(id))
            })
            .unwrap();

        let committed = dispatcher
            .dispatch(
                inventory_id.0,
                "inventory",
                InventoryCommand::RenameInventory(RenameInventory {
                    inventory_id,
                    title: "Books".to_string(),
                    occurred_at: Utc::now(),
                }),
                |id| Inventory::empty(InventoryId::new(id)),
            )
            .unwrap();
        assert!(committed.is_empty());
        assert_eq!(dispatcher.store().load_stream(inventory_id.0).unwrap().len(), 1);
    }
}
