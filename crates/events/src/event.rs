use chrono::{DateTime, Utc};

/// A fact recorded in an aggregate stream.
///
/// `event_type` names are dotted and prefixed by the owning aggregate
/// (`inventory.renamed`, `inventory.item.created`). Once a name has been
/// written to a store it must keep deserializing into the same shape; a changed
/// shape gets a bumped `version`.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32 {
        1
    }

    /// Business time at which the command was accepted.
    fn occurred_at(&self) -> DateTime<Utc>;
}
