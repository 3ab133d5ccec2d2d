//! The aggregate kernel: a persistent, immutable value type threading an in-memory
//! memento through the append protocol.

use tracing::{debug, trace, warn};

use crate::commit::Commit;
use crate::error::CoreError;
use crate::event::SerializedEvent;
use crate::ids::{AggregateId, PartitionKey};
use crate::provider::EventWriter;
use crate::snapshot::SerializedSnapshot;

/// A persistent, in-memory handle on a single aggregate instance.
///
/// Every operation (`apply_event`, `apply_commits`, `commit`, `store_snapshot`) consumes
/// `self` by value and returns a new `Aggregate` reflecting the change; on failure the
/// original value is unaffected because it was moved into the call and the caller never
/// observes a partially-mutated aggregate. Use `Aggregate<()>` for a purely structural
/// handle that tracks sequence numbers without folding a memento (see the stateless
/// Open Question decision recorded in `DESIGN.md`).
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<M> {
    aggregate_id: AggregateId,
    partition_key: PartitionKey,
    commit_seq: i64,
    event_seq: i64,
    uncommitted: Vec<SerializedEvent>,
    memento: M,
}

impl<M> Aggregate<M> {
    /// Creates a fresh aggregate with no history, carrying `memento` as its initial
    /// in-memory state.
    pub fn new(aggregate_id: AggregateId, partition_key: PartitionKey, memento: M) -> Self {
        Aggregate {
            aggregate_id,
            partition_key,
            commit_seq: -1,
            event_seq: -1,
            uncommitted: Vec::new(),
            memento,
        }
    }

    /// Reconstructs an aggregate at a known position in its history, e.g. from a
    /// snapshot or after a prior rehydration. `commit_seq` and `event_seq` are the
    /// sequence numbers of the last commit/event already reflected in `memento`.
    pub fn at(
        aggregate_id: AggregateId,
        partition_key: PartitionKey,
        commit_seq: i64,
        event_seq: i64,
        memento: M,
    ) -> Self {
        Aggregate {
            aggregate_id,
            partition_key,
            commit_seq,
            event_seq,
            uncommitted: Vec::new(),
            memento,
        }
    }

    /// This aggregate's identifier.
    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    /// This aggregate's storage partition.
    pub fn partition_key(&self) -> &PartitionKey {
        &self.partition_key
    }

    /// The sequence number of the last commit reflected in this aggregate's state
    /// (`-1` if none yet).
    pub fn commit_seq(&self) -> i64 {
        self.commit_seq
    }

    /// The sequence number of the last event reflected in this aggregate's state
    /// (`-1` if none yet).
    pub fn event_seq(&self) -> i64 {
        self.event_seq
    }

    /// Events applied since the last successful `commit`, awaiting persistence.
    pub fn uncommitted_events(&self) -> &[SerializedEvent] {
        &self.uncommitted
    }

    /// The current in-memory memento.
    pub fn memento(&self) -> &M {
        &self.memento
    }

    /// Unwraps this aggregate into its memento, discarding identity and position.
    pub fn into_memento(self) -> M {
        self.memento
    }

    /// Applies a single serialized event to this aggregate, folding it into the memento
    /// via `fold` and advancing `event_seq`.
    ///
    /// `event.sequence_number` must equal `self.event_seq() + 1`; any other value is a
    /// caller logic error and returns [`CoreError::SequenceMismatch`] without mutating
    /// anything (the original `self` was already moved, so nothing is observable either
    /// way).
    pub fn apply_event(
        mut self,
        event: SerializedEvent,
        fold: impl FnOnce(M, &SerializedEvent) -> M,
    ) -> Result<Self, CoreError> {
        if event.aggregate_id != self.aggregate_id {
            return Err(CoreError::AggregateMismatch {
                expected: self.aggregate_id,
                found: event.aggregate_id,
            });
        }
        let expected = self.event_seq + 1;
        if event.sequence_number != expected {
            return Err(CoreError::SequenceMismatch {
                aggregate_id: self.aggregate_id,
                expected,
                found: event.sequence_number,
            });
        }
        trace!(
            aggregate_id = %self.aggregate_id,
            sequence_number = event.sequence_number,
            payload_type = %event.payload_type,
            "applying event"
        );
        self.memento = fold(self.memento, &event);
        self.event_seq = event.sequence_number;
        self.uncommitted.push(event);
        Ok(self)
    }

    /// Folds a batch of already-durable [`Commit`]s into this aggregate, as during
    /// rehydration.
    ///
    /// Validates the commit stream per the commit-stream validation contract: every
    /// commit's `aggregate_id` must match, commit sequence numbers must continue on from
    /// `self.commit_seq` with no gaps, and the combined event stream must continue on
    /// from `self.event_seq` with no gaps. Any violation fails with
    /// [`CoreError::CorruptedHistory`] and leaves nothing observable (the original value
    /// was moved into the call). On success, `commit_seq` advances by the number of
    /// commits and `event_seq` by the total event count; `uncommitted` is untouched,
    /// since rehydration never injects uncommitted state.
    pub fn apply_commits(
        mut self,
        commits: Vec<Commit>,
        mut fold: impl FnMut(M, &SerializedEvent) -> M,
    ) -> Result<Self, CoreError> {
        if commits.is_empty() {
            return Ok(self);
        }

        let mut expected_commit_seq = self.commit_seq + 1;
        for commit in &commits {
            if commit.aggregate_id != self.aggregate_id {
                return Err(CoreError::AggregateMismatch {
                    expected: self.aggregate_id,
                    found: commit.aggregate_id,
                });
            }
            if commit.sequence_number != expected_commit_seq {
                return Err(CoreError::CorruptedHistory {
                    aggregate_id: self.aggregate_id,
                    reason: format!(
                        "expected commit sequence {expected_commit_seq}, found {}",
                        commit.sequence_number
                    ),
                });
            }
            expected_commit_seq += 1;
        }
        let last_commit_seq = expected_commit_seq - 1;

        let events: Vec<SerializedEvent> = commits.into_iter().flat_map(|c| c.events).collect();
        crate::validation::validate_commit_stream(self.aggregate_id, self.event_seq, &events)?;

        for event in &events {
            self.memento = fold(self.memento, event);
            self.event_seq = event.sequence_number;
        }
        self.commit_seq = last_commit_seq;
        Ok(self)
    }

    /// Builds a [`Commit`] from the events applied since the last commit, without
    /// persisting it. Returns `None` if there is nothing uncommitted.
    fn pending_commit(&self, timestamp_ms: i64) -> Result<Option<Commit>, CoreError> {
        if self.uncommitted.is_empty() {
            return Ok(None);
        }
        let first_sequence = self.uncommitted[0].sequence_number;
        let previous_event_sequence = first_sequence - 1;
        let commit = Commit::new(
            self.aggregate_id,
            self.partition_key.clone(),
            self.commit_seq,
            previous_event_sequence,
            timestamp_ms,
            self.uncommitted.clone(),
        )?;
        Ok(Some(commit))
    }

    /// Persists the events applied since the last commit through `writer`, advancing
    /// `commit_seq` and clearing the uncommitted buffer on success.
    ///
    /// A no-op (returns `self` unchanged) if nothing has been applied since the last
    /// commit. On an optimistic-concurrency rejection from `writer`, the uncommitted
    /// events remain buffered so the caller can reload and retry.
    pub async fn commit(
        mut self,
        writer: &(dyn EventWriter),
        timestamp_ms: i64,
    ) -> Result<Self, CoreError> {
        let Some(commit) = self.pending_commit(timestamp_ms)? else {
            return Ok(self);
        };
        debug!(
            aggregate_id = %self.aggregate_id,
            sequence_number = commit.sequence_number,
            event_count = commit.events.len(),
            "sending commit"
        );
        match writer
            .append(&self.partition_key, self.aggregate_id, commit.clone())
            .await
        {
            Ok(()) => {
                debug!(
                    aggregate_id = %self.aggregate_id,
                    sequence_number = commit.sequence_number,
                    "commit succeeded"
                );
                self.commit_seq = commit.sequence_number;
                self.uncommitted.clear();
                Ok(self)
            }
            Err(err @ CoreError::Concurrency { .. }) => {
                warn!(
                    aggregate_id = %self.aggregate_id,
                    sequence_number = commit.sequence_number,
                    "commit rejected by concurrency check"
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

impl<M> Aggregate<M>
where
    M: Clone,
{
    /// Captures a [`crate::Snapshot`] of the current memento at the current `event_seq`.
    pub fn snapshot(&self, timestamp_ms: i64) -> crate::snapshot::Snapshot<M> {
        crate::snapshot::Snapshot::new(
            self.aggregate_id,
            self.partition_key.clone(),
            self.event_seq,
            self.commit_seq,
            self.memento.clone(),
            timestamp_ms,
        )
    }
}

/// Stores `snapshot` through `writer`. A free function (rather than a method requiring a
/// codec bound on `M`) since serialization is the caller's concern, not the kernel's.
pub async fn store_snapshot(
    writer: &(dyn crate::provider::SnapshotWriter),
    partition_key: &PartitionKey,
    aggregate_id: AggregateId,
    snapshot: SerializedSnapshot,
) -> Result<(), CoreError> {
    writer
        .write_snapshot(partition_key, aggregate_id, snapshot)
        .await
}

#[cfg(test)]
mod test {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn event(aggregate_id: AggregateId, sequence_number: i64) -> SerializedEvent {
        SerializedEvent::new(
            aggregate_id,
            sequence_number,
            "Tested",
            b"1".to_vec(),
            None,
            HashMap::new(),
        )
    }

    fn fold_sum(memento: i64, event: &SerializedEvent) -> i64 {
        memento + event.payload_bytes.len() as i64
    }

    #[test]
    fn apply_event_advances_sequence_and_folds_memento() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key, 0i64);
        let aggregate = aggregate.apply_event(event(id, 0), fold_sum).unwrap();
        assert_eq!(aggregate.event_seq(), 0);
        assert_eq!(*aggregate.memento(), 1);
        assert_eq!(aggregate.uncommitted_events().len(), 1);
    }

    #[test]
    fn apply_event_rejects_out_of_order_sequence() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key, 0i64);
        let err = aggregate.apply_event(event(id, 5), fold_sum).unwrap_err();
        assert!(matches!(err, CoreError::SequenceMismatch { .. }));
    }

    #[test]
    fn apply_commits_folds_a_contiguous_batch_and_advances_commit_seq() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key.clone(), 0i64);
        let commit = Commit::new(id, key, -1, -1, 0, vec![event(id, 0), event(id, 1)]).unwrap();
        let aggregate = aggregate.apply_commits(vec![commit], fold_sum).unwrap();
        assert_eq!(aggregate.event_seq(), 1);
        assert_eq!(aggregate.commit_seq(), 0);
        assert_eq!(*aggregate.memento(), 2);
        assert!(aggregate.uncommitted_events().is_empty());
    }

    #[test]
    fn apply_commits_is_a_no_op_on_an_empty_batch() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key, 0i64);
        let aggregate = aggregate.apply_commits(vec![], fold_sum).unwrap();
        assert_eq!(aggregate.commit_seq(), -1);
        assert_eq!(aggregate.event_seq(), -1);
    }

    #[test]
    fn apply_commits_rejects_a_gap_in_the_commit_sequence() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key.clone(), 0i64);
        let first = Commit::new(id, key.clone(), -1, -1, 0, vec![event(id, 0)]).unwrap();
        let mut skipped = first.clone();
        skipped.sequence_number = 1;
        skipped.events = vec![event(id, 1)];
        let err = aggregate.apply_commits(vec![skipped], fold_sum).unwrap_err();
        assert!(matches!(err, CoreError::CorruptedHistory { .. }));
    }

    #[test]
    fn apply_commits_rejects_a_gap_in_the_event_sequence() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key.clone(), 0i64);
        let mut commit = Commit::new(id, key, -1, -1, 0, vec![event(id, 0)]).unwrap();
        commit.events = vec![event(id, 5)];
        let err = aggregate.apply_commits(vec![commit], fold_sum).unwrap_err();
        assert!(matches!(err, CoreError::CorruptedHistory { .. }));
    }

    struct RecordingWriter {
        rejected: AtomicBool,
    }

    #[async_trait]
    impl EventWriter for RecordingWriter {
        async fn append(
            &self,
            _partition_key: &PartitionKey,
            _aggregate_id: AggregateId,
            _commit: Commit,
        ) -> Result<(), CoreError> {
            if self.rejected.load(Ordering::SeqCst) {
                Err(CoreError::Concurrency {
                    aggregate_id: AggregateId::new(),
                    attempted_sequence: 0,
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn commit_clears_uncommitted_events_on_success() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key, 0i64)
            .apply_event(event(id, 0), fold_sum)
            .unwrap();
        let writer = RecordingWriter {
            rejected: AtomicBool::new(false),
        };
        let aggregate = aggregate.commit(&writer, 0).await.unwrap();
        assert_eq!(aggregate.commit_seq(), 0);
        assert!(aggregate.uncommitted_events().is_empty());
    }

    #[tokio::test]
    async fn commit_is_a_no_op_with_nothing_uncommitted() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key, 0i64);
        let writer = RecordingWriter {
            rejected: AtomicBool::new(false),
        };
        let aggregate = aggregate.commit(&writer, 0).await.unwrap();
        assert_eq!(aggregate.commit_seq(), -1);
    }

    #[tokio::test]
    async fn commit_keeps_uncommitted_events_buffered_on_concurrency_rejection() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key, 0i64)
            .apply_event(event(id, 0), fold_sum)
            .unwrap();
        let writer = RecordingWriter {
            rejected: AtomicBool::new(true),
        };
        let err = aggregate.clone().commit(&writer, 0).await.unwrap_err();
        assert!(matches!(err, CoreError::Concurrency { .. }));
        assert_eq!(aggregate.uncommitted_events().len(), 1);
    }

    #[test]
    fn snapshot_captures_memento_at_current_sequence() {
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let aggregate = Aggregate::new(id, key, 0i64)
            .apply_event(event(id, 0), fold_sum)
            .unwrap();
        let snapshot = aggregate.snapshot(0);
        assert_eq!(snapshot.last_sequence_number, 0);
        assert_eq!(snapshot.commit_sequence_number, -1);
        assert_eq!(snapshot.memento, 1);
    }
}
