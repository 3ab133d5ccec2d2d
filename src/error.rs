use crate::ids::AggregateId;

/// The error taxonomy surfaced by the core.
///
/// The core never swallows an error from a provider or codec; it wraps the original cause
/// in whichever variant below is semantically meaningful and returns it to the caller. No
/// partial mutation of an [`Aggregate`](crate::Aggregate) is ever observable: every
/// operation either returns a new aggregate reflecting the change, or fails and the caller
/// retains the prior value.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// `apply_event` received an event whose sequence number did not equal
    /// `event_seq + 1`, or a provider returned a gap in the event stream. Not retryable;
    /// indicates a caller logic error.
    #[error("sequence mismatch for aggregate {aggregate_id}: expected {expected}, found {found}")]
    SequenceMismatch {
        /// The aggregate the mismatched event or commit was addressed to.
        aggregate_id: AggregateId,
        /// The sequence number that was required.
        expected: i64,
        /// The sequence number that was actually supplied.
        found: i64,
    },

    /// An event or commit carried a different `aggregate_id` than the aggregate it was
    /// applied to. Not retryable; indicates a caller logic error.
    #[error("aggregate mismatch: expected {expected}, found {found}")]
    AggregateMismatch {
        /// The aggregate id the operation was performed against.
        expected: AggregateId,
        /// The aggregate id actually carried by the event or commit.
        found: AggregateId,
    },

    /// Commit-stream validation failed during rehydration: the history read back from a
    /// provider is not internally consistent. Requires operator intervention; not
    /// retryable.
    #[error("corrupted history for aggregate {aggregate_id}: {reason}")]
    CorruptedHistory {
        /// The aggregate whose history failed validation.
        aggregate_id: AggregateId,
        /// A human-readable description of which invariant was violated.
        reason: String,
    },

    /// An optimistic concurrency conflict: another writer already committed at the
    /// attempted `sequence_number`. The caller should reload the aggregate, re-apply its
    /// intent against the new state, and retry.
    #[error(
        "concurrency conflict committing aggregate {aggregate_id} at sequence {attempted_sequence}"
    )]
    Concurrency {
        /// The aggregate the conflicting commit was addressed to.
        aggregate_id: AggregateId,
        /// The commit sequence number that lost the race.
        attempted_sequence: i64,
    },

    /// A transport or backend failure reported by a storage provider. Retryable at the
    /// caller's discretion (e.g. with backoff).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The configured codec could not encode or decode a payload. Not retryable; indicates
    /// a schema problem that needs investigation.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl CoreError {
    /// Wraps an arbitrary provider-side error as [`CoreError::StorageUnavailable`].
    pub fn storage_unavailable<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::StorageUnavailable(Box::new(err))
    }

    /// Wraps a codec failure as [`CoreError::SerializationFailed`].
    pub fn serialization_failed<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::SerializationFailed(Box::new(err))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationFailed(Box::new(err))
    }
}
