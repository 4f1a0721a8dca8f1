//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To "modify"
/// one, build a new value and replace the old one wholesale (format definitions are
/// the main example in this workspace).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
