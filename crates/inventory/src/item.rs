use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use invtrack_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use invtrack_events::Event;

use crate::inventory::InventoryId;

/// Inventory item identifier (the internal id, not the human-facing custom id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryItemId(pub AggregateId);

impl InventoryItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: InventoryItem.
///
/// `ordinal` and `custom_id` are fixed at creation; editing an item only touches
/// its field data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: InventoryItemId,
    inventory_id: Option<InventoryId>,
    ordinal: u64,
    custom_id: String,
    created_by: Option<UserId>,
    field_data: JsonValue,
    version: u64,
    created: bool,
    deleted: bool,
}

impl InventoryItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryItemId) -> Self {
        Self {
            id,
            inventory_id: None,
            ordinal: 0,
            custom_id: String::new(),
            created_by: None,
            field_data: JsonValue::Object(Default::default()),
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn inventory_id(&self) -> Option<InventoryId> {
        self.inventory_id
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    pub fn custom_id(&self) -> &str {
        &self.custom_id
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn field_data(&self) -> &JsonValue {
        &self.field_data
    }

    pub fn is_live(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateItem.
///
/// The ordinal comes from the sequence allocator and `custom_id` is the identifier
/// already rendered from it; the aggregate only checks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    pub item_id: InventoryItemId,
    pub inventory_id: InventoryId,
    pub ordinal: u64,
    pub custom_id: String,
    pub created_by: UserId,
    pub field_data: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItemFields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemFields {
    pub item_id: InventoryItemId,
    pub field_data: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteItem {
    pub item_id: InventoryItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCommand {
    CreateItem(CreateItem),
    UpdateItemFields(UpdateItemFields),
    DeleteItem(DeleteItem),
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: InventoryItemId,
    pub inventory_id: InventoryId,
    pub ordinal: u64,
    pub custom_id: String,
    pub created_by: UserId,
    pub field_data: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemFieldsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFieldsUpdated {
    pub item_id: InventoryItemId,
    pub field_data: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemDeleted.
///
/// The item's ordinal stays consumed; it is never handed out again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDeleted {
    pub item_id: InventoryItemId,
    pub inventory_id: InventoryId,
    pub ordinal: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemEvent {
    ItemCreated(ItemCreated),
    ItemFieldsUpdated(ItemFieldsUpdated),
    ItemDeleted(ItemDeleted),
}

impl Event for ItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ItemEvent::ItemCreated(_) => "inventory.item.created",
            ItemEvent::ItemFieldsUpdated(_) => "inventory.item.fields_updated",
            ItemEvent::ItemDeleted(_) => "inventory.item.deleted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ItemEvent::ItemCreated(e) => e.occurred_at,
            ItemEvent::ItemFieldsUpdated(e) => e.occurred_at,
            ItemEvent::ItemDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = ItemCommand;
    type Event = ItemEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ItemEvent::ItemCreated(e) => {
                self.id = e.item_id;
                self.inventory_id = Some(e.inventory_id);
                self.ordinal = e.ordinal;
                self.custom_id = e.custom_id.clone();
                self.created_by = Some(e.created_by);
                self.field_data = e.field_data.clone();
                self.created = true;
            }
            ItemEvent::ItemFieldsUpdated(e) => {
                self.field_data = e.field_data.clone();
            }
            ItemEvent::ItemDeleted(_) => {
                self.deleted = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ItemCommand::CreateItem(cmd) => self.handle_create(cmd),
            ItemCommand::UpdateItemFields(cmd) => self.handle_update(cmd),
            ItemCommand::DeleteItem(cmd) => self.handle_delete(cmd),
        }
    }
}

impl InventoryItem {
    fn ensure_item_id(&self, item_id: InventoryItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found("item"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateItem) -> Result<Vec<ItemEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("item already exists"));
        }
        self.ensure_item_id(cmd.item_id)?;
        if cmd.ordinal == 0 {
            return Err(DomainError::invariant("ordinals start at 1"));
        }
        if cmd.custom_id.is_empty() {
            return Err(DomainError::validation("custom id cannot be empty"));
        }
        let field_data = validate_field_data(&cmd.field_data)?;

        Ok(vec![ItemEvent::ItemCreated(ItemCreated {
            item_id: cmd.item_id,
            inventory_id: cmd.inventory_id,
            ordinal: cmd.ordinal,
            custom_id: cmd.custom_id.clone(),
            created_by: cmd.created_by,
            field_data,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateItemFields) -> Result<Vec<ItemEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_item_id(cmd.item_id)?;

        let field_data = validate_field_data(&cmd.field_data)?;
        if field_data == self.field_data {
            return Ok(vec![]);
        }

        Ok(vec![ItemEvent::ItemFieldsUpdated(ItemFieldsUpdated {
            item_id: cmd.item_id,
            field_data,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteItem) -> Result<Vec<ItemEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_item_id(cmd.item_id)?;

        let inventory_id = self
            .inventory_id
            .ok_or_else(|| DomainError::invariant("created item without inventory"))?;

        Ok(vec![ItemEvent::ItemDeleted(ItemDeleted {
            item_id: cmd.item_id,
            inventory_id,
            ordinal: self.ordinal,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Field data is a flat JSON object (`{"serial": "A1", "pages": 200}`); `null`
/// means "no fields". Returns the normalized value to store.
pub fn validate_field_data(value: &JsonValue) -> Result<JsonValue, DomainError> {
    match value {
        JsonValue::Null => Ok(JsonValue::Object(Default::default())),
        JsonValue::Object(_) => Ok(value.clone()),
        _ => Err(DomainError::validation("field data must be a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_item_id() -> InventoryItemId {
        InventoryItemId::new(AggregateId::new())
    }

    fn test_inventory_id() -> InventoryId {
        InventoryId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(item_id: InventoryItemId, ordinal: u64, custom_id: &str) -> CreateItem {
        CreateItem {
            item_id,
            inventory_id: test_inventory_id(),
            ordinal,
            custom_id: custom_id.to_string(),
            created_by: UserId::new(),
            field_data: json!({"serial": "A1"}),
            occurred_at: test_time(),
        }
    }

    fn created_item(item_id: InventoryItemId) -> InventoryItem {
        let mut item = InventoryItem::empty(item_id);
        let events = item
            .handle(&ItemCommand::CreateItem(create_cmd(item_id, 7, "ITEM-0007")))
            .unwrap();
        for e in &events {
            item.apply(e);
        }
        item
    }

    #[test]
    fn create_records_ordinal_and_custom_id() {
        let item = created_item(test_item_id());
        assert!(item.is_live());
        assert_eq!(item.ordinal(), 7);
        assert_eq!(item.custom_id(), "ITEM-0007");
        assert_eq!(item.field_data(), &json!({"serial": "A1"}));
        assert_eq!(item.version(), 1);
    }

    #[test]
    fn create_rejects_zero_ordinal_and_empty_custom_id() {
        let item_id = test_item_id();
        let item = InventoryItem::empty(item_id);

        let err = item
            .handle(&ItemCommand::CreateItem(create_cmd(item_id, 0, "X")))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = item
            .handle(&ItemCommand::CreateItem(create_cmd(item_id, 1, "")))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_non_object_field_data() {
        let item_id = test_item_id();
        let mut cmd = create_cmd(item_id, 1, "ITEM-0001");
        cmd.field_data = json!([1, 2, 3]);
        let err = InventoryItem::empty(item_id)
            .handle(&ItemCommand::CreateItem(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn null_field_data_becomes_empty_object() {
        let item_id = test_item_id();
        let mut cmd = create_cmd(item_id, 1, "ITEM-0001");
        cmd.field_data = JsonValue::Null;
        let events = InventoryItem::empty(item_id)
            .handle(&ItemCommand::CreateItem(cmd))
            .unwrap();
        match &events[0] {
            ItemEvent::ItemCreated(e) => assert_eq!(e.field_data, json!({})),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn update_changes_fields_but_not_custom_id() {
        let item_id = test_item_id();
        let mut item = created_item(item_id);

        let events = item
            .handle(&ItemCommand::UpdateItemFields(UpdateItemFields {
                item_id,
                field_data: json!({"serial": "B2", "pages": 200}),
                occurred_at: test_time(),
            }))
            .unwrap();
        item.apply(&events[0]);

        assert_eq!(item.field_data(), &json!({"serial": "B2", "pages": 200}));
        assert_eq!(item.custom_id(), "ITEM-0007");
        assert_eq!(item.ordinal(), 7);
    }

    #[test]
    fn delete_keeps_ordinal_and_blocks_further_commands() {
        let item_id = test_item_id();
        let mut item = created_item(item_id);

        let events = item
            .handle(&ItemCommand::DeleteItem(DeleteItem {
                item_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        match &events[0] {
            ItemEvent::ItemDeleted(e) => assert_eq!(e.ordinal, 7),
            other => panic!("unexpected event: {other:?}"),
        }
        item.apply(&events[0]);
        assert!(item.is_deleted());

        let err = item
            .handle(&ItemCommand::DeleteItem(DeleteItem {
                item_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound("item"));

        let err = item
            .handle(&ItemCommand::UpdateItemFields(UpdateItemFields {
                item_id,
                field_data: json!({}),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound("item"));
    }

    #[test]
    fn delete_missing_item_is_not_found() {
        let item_id = test_item_id();
        let err = InventoryItem::empty(item_id)
            .handle(&ItemCommand::DeleteItem(DeleteItem {
                item_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound("item"));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: handle never mutates state, and the same events rebuild the
            /// same item.
            #[test]
            fn handle_is_pure_and_apply_is_deterministic(
                ordinal in 1u64..1_000_000,
                custom_id in "[A-Z]{1,6}-[0-9]{1,8}",
            ) {
                let item_id = test_item_id();
                let item = InventoryItem::empty(item_id);
                let before = item.clone();

                let cmd = ItemCommand::CreateItem(create_cmd(item_id, ordinal, &custom_id));
                let events1 = item.handle(&cmd).unwrap();
                let events2 = item.handle(&cmd).unwrap();
                prop_assert_eq!(&item, &before);
                prop_assert_eq!(&events1, &events2);

                let mut a = InventoryItem::empty(item_id);
                let mut b = InventoryItem::empty(item_id);
                for e in &events1 {
                    a.apply(e);
                    b.apply(e);
                }
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(a.ordinal(), ordinal);
                prop_assert_eq!(a.custom_id(), custom_id.as_str());
            }
        }
    }
}
