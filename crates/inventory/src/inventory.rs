use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invtrack_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use invtrack_custom_id::FormatDefinition;
use invtrack_events::Event;

/// Inventory identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryId(pub AggregateId);

impl InventoryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Inventory.
///
/// Owns exactly one identifier format. The per-inventory ordinal counter is not
/// kept here: it lives with the sequence allocator so that concurrent item
/// creations never contend on this stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    id: InventoryId,
    title: String,
    created_by: Option<UserId>,
    id_format: FormatDefinition,
    version: u64,
    created: bool,
}

impl Inventory {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryId) -> Self {
        Self {
            id,
            title: String::new(),
            created_by: None,
            id_format: FormatDefinition::default_item(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InventoryId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn id_format(&self) -> &FormatDefinition {
        &self.id_format
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Inventory {
    type Id = InventoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInventory.
///
/// `id_format: None` stores the default `ITEM-` + four-digit sequence format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInventory {
    pub inventory_id: InventoryId,
    pub title: String,
    pub created_by: UserId,
    pub id_format: Option<FormatDefinition>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RenameInventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameInventory {
    pub inventory_id: InventoryId,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReplaceIdFormat (whole-definition replacement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceIdFormat {
    pub inventory_id: InventoryId,
    pub id_format: FormatDefinition,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    CreateInventory(CreateInventory),
    RenameInventory(RenameInventory),
    ReplaceIdFormat(ReplaceIdFormat),
}

/// Event: InventoryCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCreated {
    pub inventory_id: InventoryId,
    pub title: String,
    pub created_by: UserId,
    pub id_format: FormatDefinition,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InventoryRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRenamed {
    pub inventory_id: InventoryId,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: IdFormatReplaced.
///
/// Affects items created afterwards only; existing identifiers are never re-rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdFormatReplaced {
    pub inventory_id: InventoryId,
    pub id_format: FormatDefinition,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    InventoryCreated(InventoryCreated),
    InventoryRenamed(InventoryRenamed),
    IdFormatReplaced(IdFormatReplaced),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::InventoryCreated(_) => "inventory.created",
            InventoryEvent::InventoryRenamed(_) => "inventory.renamed",
            InventoryEvent::IdFormatReplaced(_) => "inventory.id_format_replaced",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::InventoryCreated(e) => e.occurred_at,
            InventoryEvent::InventoryRenamed(e) => e.occurred_at,
            InventoryEvent::IdFormatReplaced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Inventory {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::InventoryCreated(e) => {
                self.id = e.inventory_id;
                self.title = e.title.clone();
                self.created_by = Some(e.created_by);
                self.id_format = e.id_format.clone();
                self.created = true;
            }
            InventoryEvent::InventoryRenamed(e) => {
                self.title = e.title.clone();
            }
            InventoryEvent::IdFormatReplaced(e) => {
                self.id_format = e.id_format.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::CreateInventory(cmd) => self.handle_create(cmd),
            InventoryCommand::RenameInventory(cmd) => self.handle_rename(cmd),
            InventoryCommand::ReplaceIdFormat(cmd) => self.handle_replace_format(cmd),
        }
    }
}

impl Inventory {
    fn ensure_inventory_id(&self, inventory_id: InventoryId) -> Result<(), DomainError> {
        if self.id != inventory_id {
            return Err(DomainError::invariant("inventory_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInventory) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("inventory already exists"));
        }
        self.ensure_inventory_id(cmd.inventory_id)?;
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        let id_format = cmd
            .id_format
            .clone()
            .unwrap_or_else(FormatDefinition::default_item);

        Ok(vec![InventoryEvent::InventoryCreated(InventoryCreated {
            inventory_id: cmd.inventory_id,
            title: cmd.title.trim().to_string(),
            created_by: cmd.created_by,
            id_format,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rename(&self, cmd: &RenameInventory) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("inventory"));
        }
        self.ensure_inventory_id(cmd.inventory_id)?;

        let title = cmd.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if title == self.title {
            return Ok(vec![]);
        }

        Ok(vec![InventoryEvent::InventoryRenamed(InventoryRenamed {
            inventory_id: cmd.inventory_id,
            title: title.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace_format(
        &self,
        cmd: &ReplaceIdFormat,
    ) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("inventory"));
        }
        self.ensure_inventory_id(cmd.inventory_id)?;

        // Re-submitting the current format is a no-op.
        if cmd.id_format == self.id_format {
            return Ok(vec![]);
        }

        Ok(vec![InventoryEvent::IdFormatReplaced(IdFormatReplaced {
            inventory_id: cmd.inventory_id,
            id_format: cmd.id_format.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
