use crate::ids::{AggregateId, PartitionKey};

/// A point-in-time memento of an aggregate, captured to bound rehydration cost.
///
/// A snapshot at `last_sequence_number` records that folding the memento already
/// accounts for every event up to and including that sequence number; rehydration only
/// needs to replay events strictly after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<M> {
    /// The aggregate this snapshot was captured from.
    pub aggregate_id: AggregateId,
    /// The storage partition this aggregate is routed to.
    pub partition_key: PartitionKey,
    /// The event sequence number this memento already reflects.
    pub last_sequence_number: i64,
    /// The commit sequence number this memento already reflects.
    pub commit_sequence_number: i64,
    /// The memento value itself.
    pub memento: M,
    /// Milliseconds since the Unix epoch at which this snapshot was captured.
    pub timestamp_ms: i64,
}

impl<M> Snapshot<M> {
    /// Builds a new snapshot from its constituent parts.
    pub fn new(
        aggregate_id: AggregateId,
        partition_key: PartitionKey,
        last_sequence_number: i64,
        commit_sequence_number: i64,
        memento: M,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            aggregate_id,
            partition_key,
            last_sequence_number,
            commit_sequence_number,
            memento,
            timestamp_ms,
        }
    }
}

/// The serialized form of a [`Snapshot`] as stored and retrieved by a
/// [`crate::SnapshotWriter`]/[`crate::SnapshotReader`].
///
/// Deliberately a tagged union rather than an `Option<SerializedSnapshot>` with a
/// sentinel field: "no snapshot exists yet" and "a snapshot exists" are structurally
/// different enough (the former carries no sequence number, no bytes, no timestamp) that
/// collapsing them into one struct with nullable fields would let a caller construct a
/// `Present` with impossible field combinations.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializedSnapshot {
    /// No snapshot has ever been stored for this aggregate.
    Empty,
    /// A snapshot exists.
    Present {
        /// The aggregate this snapshot was captured from.
        aggregate_id: AggregateId,
        /// The storage partition this aggregate is routed to.
        partition_key: PartitionKey,
        /// The event sequence number this memento already reflects.
        last_sequence_number: i64,
        /// The commit sequence number this memento already reflects.
        commit_sequence_number: i64,
        /// The opaque, codec-produced serialized memento.
        memento_bytes: Vec<u8>,
        /// Milliseconds since the Unix epoch at which this snapshot was captured.
        timestamp_ms: i64,
    },
}

impl SerializedSnapshot {
    /// Builds a `Present` snapshot from its constituent parts.
    pub fn present(
        aggregate_id: AggregateId,
        partition_key: PartitionKey,
        last_sequence_number: i64,
        commit_sequence_number: i64,
        memento_bytes: Vec<u8>,
        timestamp_ms: i64,
    ) -> Self {
        SerializedSnapshot::Present {
            aggregate_id,
            partition_key,
            last_sequence_number,
            commit_sequence_number,
            memento_bytes,
            timestamp_ms,
        }
    }

    /// The sequence number this snapshot reflects, or `None` if [`SerializedSnapshot::Empty`].
    pub fn last_sequence_number(&self) -> Option<i64> {
        match self {
            SerializedSnapshot::Empty => None,
            SerializedSnapshot::Present {
                last_sequence_number,
                ..
            } => Some(*last_sequence_number),
        }
    }

    /// The commit sequence number this snapshot reflects, or `None` if
    /// [`SerializedSnapshot::Empty`].
    pub fn commit_sequence_number(&self) -> Option<i64> {
        match self {
            SerializedSnapshot::Empty => None,
            SerializedSnapshot::Present {
                commit_sequence_number,
                ..
            } => Some(*commit_sequence_number),
        }
    }

    /// `true` if this is [`SerializedSnapshot::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, SerializedSnapshot::Empty)
    }
}
