//! Inventory domain module (event-sourced).
//!
//! Two aggregates live here: [`Inventory`], which owns the identifier format, and
//! [`InventoryItem`], which carries the ordinal and rendered identifier it was
//! created with. Both are pure domain logic (no IO, no storage, no clocks).

pub mod inventory;
pub mod item;

pub use inventory::{
    CreateInventory, IdFormatReplaced, Inventory, InventoryCommand, InventoryCreated,
    InventoryEvent, InventoryId, InventoryRenamed, RenameInventory, ReplaceIdFormat,
};
pub use item::{
    CreateItem, DeleteItem, InventoryItem, InventoryItemId, ItemCommand, ItemCreated, ItemDeleted,
    ItemEvent, ItemFieldsUpdated, UpdateItemFields, validate_field_data,
};
