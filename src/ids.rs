use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque 128-bit identifier for an aggregate instance.
///
/// `AggregateId`s are compared and hashed by value; their textual form (via `Display`/
/// `FromStr`) is the convention [`PartitionKey`] defaults to when a caller doesn't choose
/// its own routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateId(Uuid);

impl AggregateId {
    /// Generates a new random aggregate id.
    pub fn new() -> Self {
        AggregateId(Uuid::new_v4())
    }

    /// Wraps an existing `Uuid` as an `AggregateId`.
    pub fn from_uuid(id: Uuid) -> Self {
        AggregateId(id)
    }

    /// Returns the underlying `Uuid`.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AggregateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AggregateId(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for AggregateId {
    fn from(id: Uuid) -> Self {
        AggregateId(id)
    }
}

/// A non-empty string that routes an aggregate to a storage partition.
///
/// By convention a `PartitionKey` equals the textual form of the owning [`AggregateId`]
/// unless the caller chooses otherwise. It is immutable for the aggregate's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Creates a `PartitionKey` from a non-empty string, returning `None` for an empty one.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() {
            None
        } else {
            Some(PartitionKey(key))
        }
    }

    /// Builds the conventional partition key equal to the textual form of `aggregate_id`.
    pub fn from_aggregate_id(aggregate_id: AggregateId) -> Self {
        PartitionKey(aggregate_id.to_string())
    }

    /// Returns the partition key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
