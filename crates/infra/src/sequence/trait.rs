use std::sync::Arc;

use thiserror::Error;

use invtrack_inventory::InventoryId;

/// Ordinal allocation failure.
///
/// When allocation fails no ordinal has been handed out, and the caller must not
/// create the item.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// The counter store could not be reached or did not answer.
    #[error("sequence counter unavailable: {0}")]
    Unavailable(String),

    /// The counter reached its maximum value.
    #[error("sequence for inventory {0} is exhausted")]
    Exhausted(InventoryId),
}

/// Per-inventory monotonically increasing counter.
///
/// Contract:
/// - `allocate_next` is atomic per inventory: concurrent callers for the same
///   inventory never observe the same ordinal
/// - callers for different inventories do not wait on each other
/// - the first ordinal is 1; counters never go backwards and ordinals are never
///   reused, even after the item that held one is deleted
pub trait SequenceAllocator: Send + Sync {
    /// Create the counter at 0 if it does not exist yet. Idempotent.
    fn initialize(&self, inventory_id: InventoryId) -> Result<(), AllocationError>;

    /// Advance the counter and return the new value.
    ///
    /// An inventory that was never initialized starts from 0.
    fn allocate_next(&self, inventory_id: InventoryId) -> Result<u64, AllocationError>;

    /// Last ordinal handed out (0 when none).
    fn current(&self, inventory_id: InventoryId) -> Result<u64, AllocationError>;
}

impl<S> SequenceAllocator for Arc<S>
where
    S: SequenceAllocator + ?Sized,
{
    fn initialize(&self, inventory_id: InventoryId) -> Result<(), AllocationError> {
        (**self).initialize(inventory_id)
    }

    fn allocate_next(&self, inventory_id: InventoryId) -> Result<u64, AllocationError> {
        (**self).allocate_next(inventory_id)
    }

    fn current(&self, inventory_id: InventoryId) -> Result<u64, AllocationError> {
        (**self).current(inventory_id)
    }
}
