//! The pluggable storage-provider contract: an append-only event log and a snapshot store,
//! each split into a read half and a write half so a provider can implement only the sides
//! it needs (e.g. a read replica implementing only [`EventReader`]).

use async_trait::async_trait;

use crate::commit::Commit;
use crate::error::CoreError;
use crate::event::SerializedEvent;
use crate::ids::{AggregateId, PartitionKey};
use crate::snapshot::SerializedSnapshot;

/// An opaque cursor into an [`EventReader`]'s paged results.
///
/// Callers must treat this as opaque: construct it only from an [`EventPage`] returned by
/// the same provider, and pass it back unmodified to continue reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wraps a raw provider-defined cursor string.
    pub fn new(token: impl Into<String>) -> Self {
        ContinuationToken(token.into())
    }

    /// Returns the cursor as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An event as stored, tagged with the commit it was written as part of.
///
/// The event log is append-only at commit granularity, not event granularity; a reader
/// that needs to reconstruct `commit_seq` (e.g. [`crate::reader::AggregateReader`]) needs
/// to know which commit each returned event belongs to, since a single page can span
/// several commits.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedEvent {
    /// The event itself.
    pub event: SerializedEvent,
    /// The sequence number of the commit this event was written as part of.
    pub commit_sequence_number: i64,
}

/// One page of events returned by [`EventReader::read_events`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    /// The events in this page, ordered by ascending sequence number.
    pub events: Vec<PersistedEvent>,
    /// A cursor to fetch the next page, or `None` if this was the last page.
    pub continuation_token: Option<ContinuationToken>,
}

/// Appends commits to an aggregate's event log, enforcing optimistic concurrency.
#[async_trait]
pub trait EventWriter: Send + Sync {
    /// Durably appends `commit` to the log.
    ///
    /// Must fail with [`CoreError::Concurrency`] if another commit has already been
    /// written at `commit.sequence_number` for `(partition_key, aggregate_id)`; the write
    /// must be atomic (all events in the commit become visible together, or none do).
    async fn append(
        &self,
        partition_key: &PartitionKey,
        aggregate_id: AggregateId,
        commit: Commit,
    ) -> Result<(), CoreError>;
}

/// Reads an aggregate's event log back, in pages.
#[async_trait]
pub trait EventReader: Send + Sync {
    /// Reads events for `(partition_key, aggregate_id)` with `sequence_number` strictly
    /// greater than `after_sequence`, up to `max_items_per_batch` events, continuing from
    /// `continuation_token` if supplied.
    ///
    /// Returned events must be ordered by ascending `sequence_number` with no gaps.
    async fn read_events(
        &self,
        partition_key: &PartitionKey,
        aggregate_id: AggregateId,
        after_sequence: i64,
        max_items_per_batch: usize,
        continuation_token: Option<ContinuationToken>,
    ) -> Result<EventPage, CoreError>;
}

/// Persists snapshots for an aggregate.
#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    /// Stores `snapshot` as the current snapshot for `(partition_key, aggregate_id)`,
    /// replacing any previous one.
    async fn write_snapshot(
        &self,
        partition_key: &PartitionKey,
        aggregate_id: AggregateId,
        snapshot: SerializedSnapshot,
    ) -> Result<(), CoreError>;
}

/// Reads an aggregate's most recent snapshot back.
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// Returns the current snapshot for `(partition_key, aggregate_id)`, or
    /// [`SerializedSnapshot::Empty`] if none has ever been stored.
    ///
    /// If `up_to_sequence` is `Some`, a stored snapshot whose `last_sequence_number`
    /// exceeds it must be treated as though it did not exist: a bounded read can never be
    /// seeded from a memento that already reflects events past the requested bound.
    async fn read_snapshot(
        &self,
        partition_key: &PartitionKey,
        aggregate_id: AggregateId,
        up_to_sequence: Option<i64>,
    ) -> Result<SerializedSnapshot, CoreError>;
}
