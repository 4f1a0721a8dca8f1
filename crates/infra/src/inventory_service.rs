//! Application service for inventories and their items.
//!
//! ```text
//! add_item
//!   ↓
//! 1. Load inventory (current id format), check field data
//!   ↓
//! 2. allocator.allocate_next(inventory)      ← sole source of ordinals
//!   ↓
//! 3. Render custom id (format, ordinal, clock, rng)
//!   ↓
//! 4. Dispatch CreateItem to the item's own stream
//! ```
//!
//! Items live in their own streams, so concurrent `add_item` calls on one
//! inventory only meet inside the allocator. An ordinal whose item fails to
//! persist after step 2 is skipped, never reused.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::instrument;

use invtrack_core::{AggregateId, UserId};
use invtrack_custom_id::{Clock, FormatDefinition, FormatError, RenderContext, SystemClock};
use invtrack_inventory::{
    CreateInventory, CreateItem, DeleteItem, Inventory, InventoryCommand, InventoryId,
    InventoryItem, InventoryItemId, ItemCommand, RenameInventory, ReplaceIdFormat,
    UpdateItemFields, validate_field_data,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::sequence::{AllocationError, SequenceAllocator};

pub const INVENTORY_AGGREGATE_TYPE: &str = "inventory";
pub const ITEM_AGGREGATE_TYPE: &str = "inventory_item";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid id format: {0}")]
    Format(#[from] FormatError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("inventory {0} not found")]
    InventoryNotFound(InventoryId),

    #[error("item {0} not found")]
    ItemNotFound(InventoryItemId),
}

/// Result of a successful `add_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedItem {
    pub item_id: InventoryItemId,
    pub inventory_id: InventoryId,
    pub ordinal: u64,
    pub custom_id: String,
}

pub struct InventoryService<S, A> {
    dispatcher: CommandDispatcher<S>,
    allocator: A,
    clock: Arc<dyn Clock>,
    default_id_format: FormatDefinition,
}

impl<S, A> InventoryService<S, A> {
    pub fn new(store: S, allocator: A) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store),
            allocator,
            clock: Arc::new(SystemClock),
            default_id_format: FormatDefinition::default_item(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Format stored on inventories created without an explicit one.
    pub fn with_default_id_format(mut self, format: FormatDefinition) -> Self {
        self.default_id_format = format;
        self
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S> {
        &self.dispatcher
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn default_id_format(&self) -> &FormatDefinition {
        &self.default_id_format
    }

    fn render(&self, format: &FormatDefinition, ordinal: u64) -> String {
        let mut rng = rand::rng();
        let mut ctx = RenderContext::from_clock(self.clock.as_ref(), &mut rng);
        format.render(ordinal, &mut ctx)
    }

    /// Render a candidate format for an arbitrary ordinal without touching any
    /// inventory or counter.
    pub fn preview_format(&self, raw_format: &str, ordinal: u64) -> Result<String, ServiceError> {
        let format = invtrack_custom_id::parse(raw_format)?;
        Ok(self.render(&format, ordinal))
    }
}

impl<S, A> InventoryService<S, A>
where
    S: EventStore,
    A: SequenceAllocator,
{
    /// Create an inventory. `raw_format` of `None` stores the default format.
    #[instrument(skip(self, raw_format), fields(title = %title))]
    pub fn create_inventory(
        &self,
        title: &str,
        created_by: UserId,
        raw_format: Option<&str>,
    ) -> Result<InventoryId, ServiceError> {
        let id_format = match raw_format {
            Some(raw) => invtrack_custom_id::parse(raw)?,
            None => self.default_id_format.clone(),
        };

        let inventory_id = InventoryId::new(AggregateId::new());
        self.dispatcher.dispatch(
            inventory_id.0,
            INVENTORY_AGGREGATE_TYPE,
            InventoryCommand::CreateInventory(CreateInventory {
                inventory_id,
                title: title.to_string(),
                created_by,
                id_format: Some(id_format),
                occurred_at: Utc::now(),
            }),
            |id| Inventory::empty(InventoryId::new(id)),
        )?;
        // Only inventories that exist get a counter. `allocate_next` creates a
        // missing one, so a failure here does not undo the inventory.
        if let Err(e) = self.allocator.initialize(inventory_id) {
            tracing::warn!(inventory_id = %inventory_id, error = %e, "counter not initialized");
        }

        tracing::info!(inventory_id = %inventory_id, "inventory created");
        Ok(inventory_id)
    }

    pub fn load_inventory(&self, inventory_id: InventoryId) -> Result<Inventory, ServiceError> {
        let inventory = self
            .dispatcher
            .load(inventory_id.0, |id| Inventory::empty(InventoryId::new(id)))?;
        if !inventory.is_created() {
            return Err(ServiceError::InventoryNotFound(inventory_id));
        }
        Ok(inventory)
    }

    pub fn rename_inventory(
        &self,
        inventory_id: InventoryId,
        title: &str,
    ) -> Result<(), ServiceError> {
        self.dispatcher
            .dispatch(
                inventory_id.0,
                INVENTORY_AGGREGATE_TYPE,
                InventoryCommand::RenameInventory(RenameInventory {
                    inventory_id,
                    title: title.to_string(),
                    occurred_at: Utc::now(),
                }),
                |id| Inventory::empty(InventoryId::new(id)),
            )
            .map_err(|e| inventory_error(inventory_id, e))?;
        Ok(())
    }

    /// Replace the inventory's whole format definition.
    ///
    /// Items that already exist keep the identifiers they were created with.
    #[instrument(skip(self, raw_format), fields(inventory_id = %inventory_id))]
    pub fn replace_id_format(
        &self,
        inventory_id: InventoryId,
        raw_format: &str,
    ) -> Result<FormatDefinition, ServiceError> {
        let id_format = invtrack_custom_id::parse(raw_format)?;

        let committed = self
            .dispatcher
            .dispatch(
                inventory_id.0,
                INVENTORY_AGGREGATE_TYPE,
                InventoryCommand::ReplaceIdFormat(ReplaceIdFormat {
                    inventory_id,
                    id_format: id_format.clone(),
                    occurred_at: Utc::now(),
                }),
                |id| Inventory::empty(InventoryId::new(id)),
            )
            .map_err(|e| inventory_error(inventory_id, e))?;

        if !committed.is_empty() {
            tracing::info!(inventory_id = %inventory_id, "id format replaced");
        }
        Ok(id_format)
    }

    /// Create an item with the next ordinal and a freshly rendered custom id.
    #[instrument(skip(self, field_data), fields(inventory_id = %inventory_id))]
    pub fn add_item(
        &self,
        inventory_id: InventoryId,
        created_by: UserId,
        field_data: JsonValue,
    ) -> Result<CreatedItem, ServiceError> {
        let inventory = self.load_inventory(inventory_id)?;
        let field_data = validate_field_data(&field_data).map_err(DispatchError::from)?;

        let ordinal = self.allocator.allocate_next(inventory_id).map_err(|e| {
            tracing::warn!(inventory_id = %inventory_id, error = %e, "ordinal allocation failed");
            e
        })?;
        let custom_id = self.render(inventory.id_format(), ordinal);

        let item_id = InventoryItemId::new(AggregateId::new());
        self.dispatcher
            .dispatch(
                item_id.0,
                ITEM_AGGREGATE_TYPE,
                ItemCommand::CreateItem(CreateItem {
                    item_id,
                    inventory_id,
                    ordinal,
                    custom_id: custom_id.clone(),
                    created_by,
                    field_data,
                    occurred_at: Utc::now(),
                }),
                |id| InventoryItem::empty(InventoryItemId::new(id)),
            )
            .map_err(|e| {
                tracing::warn!(
                    inventory_id = %inventory_id,
                    ordinal,
                    error = %e,
                    "item not persisted; ordinal left unused"
                );
                e
            })?;

        tracing::info!(
            inventory_id = %inventory_id,
            item_id = %item_id,
            ordinal,
            custom_id = %custom_id,
            "item created"
        );
        Ok(CreatedItem {
            item_id,
            inventory_id,
            ordinal,
            custom_id,
        })
    }

    pub fn load_item(&self, item_id: InventoryItemId) -> Result<InventoryItem, ServiceError> {
        let item = self
            .dispatcher
            .load(item_id.0, |id| InventoryItem::empty(InventoryItemId::new(id)))?;
        if item.inventory_id().is_none() {
            return Err(ServiceError::ItemNotFound(item_id));
        }
        Ok(item)
    }

    /// Replace an item's field data. Its ordinal and custom id never change.
    pub fn update_item_fields(
        &self,
        item_id: InventoryItemId,
        field_data: JsonValue,
    ) -> Result<(), ServiceError> {
        self.dispatcher
            .dispatch(
                item_id.0,
                ITEM_AGGREGATE_TYPE,
                ItemCommand::UpdateItemFields(UpdateItemFields {
                    item_id,
                    field_data,
                    occurred_at: Utc::now(),
                }),
                |id| InventoryItem::empty(InventoryItemId::new(id)),
            )
            .map_err(|e| item_error(item_id, e))?;
        Ok(())
    }

    /// Delete an item. Its ordinal stays consumed.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub fn delete_item(&self, item_id: InventoryItemId) -> Result<(), ServiceError> {
        self.dispatcher
            .dispatch(
                item_id.0,
                ITEM_AGGREGATE_TYPE,
                ItemCommand::DeleteItem(DeleteItem {
                    item_id,
                    occurred_at: Utc::now(),
                }),
                |id| InventoryItem::empty(InventoryItemId::new(id)),
            )
            .map_err(|e| item_error(item_id, e))?;

        tracing::info!(item_id = %item_id, "item deleted");
        Ok(())
    }

    /// Render the identifier the next item would get, without allocating.
    ///
    /// A concurrent `add_item` may take that ordinal first, and random or date
    /// tokens will differ from what is eventually stored.
    pub fn preview_next_id(&self, inventory_id: InventoryId) -> Result<String, ServiceError> {
        let inventory = self.load_inventory(inventory_id)?;
        let next = self
            .allocator
            .current(inventory_id)?
            .checked_add(1)
            .ok_or(AllocationError::Exhausted(inventory_id))?;
        Ok(self.render(inventory.id_format(), next))
    }
}

fn inventory_error(inventory_id: InventoryId, err: DispatchError) -> ServiceError {
    match err {
        DispatchError::NotFound(_) => ServiceError::InventoryNotFound(inventory_id),
        other => ServiceError::Dispatch(other),
    }
}

fn item_error(item_id: InventoryItemId, err: DispatchError) -> ServiceError {
    match err {
        DispatchError::NotFound(_) => ServiceError::ItemNotFound(item_id),
        other => ServiceError::Dispatch(other),
    }
}
