//! Event-sourced aggregate contract.

/// Identity and revision of an aggregate.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far. Equals the sequence number of the last
    /// event in the aggregate's stream.
    fn version(&self) -> u64;
}

/// Stream revision a writer expects to find when appending.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Append regardless of the current revision.
    Any,
    /// Append only if the stream is exactly at this revision (0 = stream is new).
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

/// Pure decision/evolution pair.
///
/// `handle` inspects state and returns the events a command produces (an empty
/// list means the command changes nothing). `apply` folds one event into state
/// and must bump the version by one.
///
/// Aggregates never perform IO. Ordinals, rendered identifiers and timestamps
/// arrive already resolved inside the command.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
