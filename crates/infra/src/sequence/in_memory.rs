use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use invtrack_inventory::InventoryId;

use super::r#trait::{AllocationError, SequenceAllocator};

type Slot = Arc<Mutex<u64>>;

/// In-memory sequence allocator.
///
/// Each inventory has its own `Mutex<u64>` slot. The map lock is only taken for
/// writing when a new inventory appears, so allocations for different inventories
/// share at most a read lock and never serialize on each other.
#[derive(Debug, Default)]
pub struct InMemorySequenceAllocator {
    slots: RwLock<HashMap<InventoryId, Slot>>,
}

impl InMemorySequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise an inventory's counter to at least `last_ordinal` (never lowers it).
    ///
    /// Used when restoring counters from a snapshot of durable state.
    pub fn seed(&self, inventory_id: InventoryId, last_ordinal: u64) -> Result<(), AllocationError> {
        let slot = self.slot(inventory_id)?;
        let mut last = lock_slot(&slot)?;
        *last = (*last).max(last_ordinal);
        Ok(())
    }

    fn slot(&self, inventory_id: InventoryId) -> Result<Slot, AllocationError> {
        {
            let slots = self
                .slots
                .read()
                .map_err(|_| AllocationError::Unavailable("lock poisoned".to_string()))?;
            if let Some(slot) = slots.get(&inventory_id) {
                return Ok(Arc::clone(slot));
            }
        }

        let mut slots = self
            .slots
            .write()
            .map_err(|_| AllocationError::Unavailable("lock poisoned".to_string()))?;
        Ok(Arc::clone(slots.entry(inventory_id).or_default()))
    }
}

fn lock_slot(slot: &Slot) -> Result<std::sync::MutexGuard<'_, u64>, AllocationError> {
    slot.lock()
        .map_err(|_| AllocationError::Unavailable("counter lock poisoned".to_string()))
}

impl SequenceAllocator for InMemorySequenceAllocator {
    fn initialize(&self, inventory_id: InventoryId) -> Result<(), AllocationError> {
        self.slot(inventory_id).map(|_| ())
    }

    fn allocate_next(&self, inventory_id: InventoryId) -> Result<u64, AllocationError> {
        let slot = self.slot(inventory_id)?;
        let mut last = lock_slot(&slot)?;
        let next = last
            .checked_add(1)
            .ok_or(AllocationError::Exhausted(inventory_id))?;
        *last = next;

        tracing::trace!(inventory_id = %inventory_id, ordinal = next, "ordinal allocated");
        Ok(next)
    }

    fn current(&self, inventory_id: InventoryId) -> Result<u64, AllocationError> {
        // Release the map lock before waiting on the slot.
        let slot = {
            let slots = self
                .slots
                .read()
                .map_err(|_| AllocationError::Unavailable("lock poisoned".to_string()))?;
            slots.get(&inventory_id).cloned()
        };
        match slot {
            Some(slot) => Ok(*lock_slot(&slot)?),
            None => Ok(0),
        }
    }
}
