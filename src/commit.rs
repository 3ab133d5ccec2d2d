use crate::error::CoreError;
use crate::event::SerializedEvent;
use crate::ids::{AggregateId, PartitionKey};

/// An atomic unit of persistence: a non-empty, contiguous batch of [`SerializedEvent`]s
/// written to an [`crate::EventWriter`] in a single durable operation.
///
/// `Commit::new` enforces the invariants from the data model: `events` must be
/// non-empty, strictly contiguous, and must continue on from `previous_event_sequence`.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// The aggregate this commit belongs to.
    pub aggregate_id: AggregateId,
    /// The storage partition this aggregate is routed to.
    pub partition_key: PartitionKey,
    /// This commit's position among all commits for the aggregate (the aggregate's
    /// `commit_seq` after this commit is durable).
    pub sequence_number: i64,
    /// Milliseconds since the Unix epoch at which this commit was constructed.
    pub timestamp_ms: i64,
    /// The ordered events this commit carries, non-empty and strictly contiguous.
    pub events: Vec<SerializedEvent>,
}

impl Commit {
    /// Builds a new `Commit`, validating the ordering invariants from the data model.
    ///
    /// `previous_commit_sequence` and `previous_event_sequence` are the aggregate's
    /// `commit_seq`/`event_seq` *before* this commit (`-1` for a fresh aggregate).
    pub fn new(
        aggregate_id: AggregateId,
        partition_key: PartitionKey,
        previous_commit_sequence: i64,
        previous_event_sequence: i64,
        timestamp_ms: i64,
        events: Vec<SerializedEvent>,
    ) -> Result<Self, CoreError> {
        let Some(first) = events.first() else {
            return Err(CoreError::SequenceMismatch {
                aggregate_id,
                expected: previous_event_sequence + 1,
                found: previous_event_sequence,
            });
        };

        if first.aggregate_id != aggregate_id {
            return Err(CoreError::AggregateMismatch {
                expected: aggregate_id,
                found: first.aggregate_id,
            });
        }

        let expected_first = previous_event_sequence + 1;
        if first.sequence_number != expected_first {
            return Err(CoreError::SequenceMismatch {
                aggregate_id,
                expected: expected_first,
                found: first.sequence_number,
            });
        }

        for pair in events.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.aggregate_id != aggregate_id {
                return Err(CoreError::AggregateMismatch {
                    expected: aggregate_id,
                    found: next.aggregate_id,
                });
            }
            if next.sequence_number != prev.sequence_number + 1 {
                return Err(CoreError::SequenceMismatch {
                    aggregate_id,
                    expected: prev.sequence_number + 1,
                    found: next.sequence_number,
                });
            }
        }

        Ok(Commit {
            aggregate_id,
            partition_key,
            sequence_number: previous_commit_sequence + 1,
            timestamp_ms,
            events,
        })
    }

    /// The sequence number of this commit's last event, i.e. the aggregate's `event_seq`
    /// immediately after this commit.
    pub fn last_event_sequence(&self) -> i64 {
        // `Commit::new` guarantees `events` is non-empty.
        self.events
            .last()
            .expect("Commit::events is non-empty by construction")
            .sequence_number
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn event(aggregate_id: AggregateId, sequence_number: i64) -> SerializedEvent {
        SerializedEvent::new(
            aggregate_id,
            sequence_number,
            "Tested",
            b"{}".to_vec(),
            None,
            HashMap::new(),
        )
    }

    #[test]
    fn rejects_empty_events() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let err = Commit::new(id, key, -1, -1, 0, vec![]).unwrap_err();
        assert!(matches!(err, CoreError::SequenceMismatch { .. }));
    }

    #[test]
    fn first_commit_starts_at_sequence_zero() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let commit = Commit::new(id, key, -1, -1, 0, vec![event(id, 0)]).unwrap();
        assert_eq!(commit.sequence_number, 0);
        assert_eq!(commit.last_event_sequence(), 0);
    }

    #[test]
    fn rejects_non_contiguous_events() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let err = Commit::new(id, key, -1, -1, 0, vec![event(id, 0), event(id, 2)]).unwrap_err();
        assert!(matches!(err, CoreError::SequenceMismatch { .. }));
    }

    #[test]
    fn rejects_events_not_following_previous_sequence() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        // previous_event_sequence = 0, so the first new event must be sequence 1.
        let err = Commit::new(id, key, 0, 0, 0, vec![event(id, 2)]).unwrap_err();
        assert!(matches!(err, CoreError::SequenceMismatch { .. }));
    }

    #[test]
    fn rejects_foreign_aggregate_events() {
        let id = AggregateId::new();
        let other = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let err = Commit::new(id, key, -1, -1, 0, vec![event(other, 0)]).unwrap_err();
        assert!(matches!(err, CoreError::AggregateMismatch { .. }));
    }

    #[test]
    fn multi_event_commit_preserves_order() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let commit =
            Commit::new(id, key, 0, 0, 0, vec![event(id, 1), event(id, 2)]).unwrap();
        assert_eq!(commit.sequence_number, 1);
        assert_eq!(commit.last_event_sequence(), 2);
        assert_eq!(commit.events.len(), 2);
    }
}
