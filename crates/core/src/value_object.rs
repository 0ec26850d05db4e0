//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// A cost sheet line or a money amount has no identity of its own; two lines with
/// the same attributes are interchangeable. Value objects are cloned rather than
/// shared and are replaced wholesale instead of being mutated in place.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
