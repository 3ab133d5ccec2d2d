//! An in-memory reference implementation of the storage-provider contract.
//!
//! Not a production backend: state is lost on process exit and is `RwLock`-guarded rather
//! than distributed. Used by this crate's own tests and as a worked example of how the
//! four provider traits fit together.
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::commit::Commit;
use crate::error::CoreError;
use crate::event::SerializedEvent;
use crate::ids::{AggregateId, PartitionKey};
use crate::provider::{
    ContinuationToken, EventPage, EventReader, EventWriter, PersistedEvent, SnapshotReader,
    SnapshotWriter,
};
use crate::snapshot::SerializedSnapshot;

type AggregateKey = (String, AggregateId);

#[derive(Default)]
struct Store {
    events: HashMap<AggregateKey, Vec<PersistedEvent>>,
    snapshots: HashMap<AggregateKey, SerializedSnapshot>,
}

/// An in-memory event log and snapshot store keyed on `(partition_key, aggregate_id)`.
///
/// Implements all four provider traits, so it can stand in wherever the core's contract
/// calls for an `EventWriter + EventReader + SnapshotWriter + SnapshotReader`.
#[derive(Default)]
pub struct InMemoryProvider {
    store: RwLock<Store>,
}

impl InMemoryProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(partition_key: &PartitionKey, aggregate_id: AggregateId) -> AggregateKey {
        (partition_key.as_str().to_string(), aggregate_id)
    }
}

#[async_trait]
impl EventWriter for InMemoryProvider {
    async fn append(
        &self,
        partition_key: &PartitionKey,
        aggregate_id: AggregateId,
        commit: Commit,
    ) -> Result<(), CoreError> {
        let key = Self::key(partition_key, aggregate_id);
        let mut store = self.store.write().expect("lock poisoned");
        let existing = store.events.entry(key).or_default();

        let expected_first = existing.last().map_or(0, |e| e.event.sequence_number + 1);
        let actual_first = commit
            .events
            .first()
            .map(|e| e.sequence_number)
            .unwrap_or(expected_first);
        if actual_first != expected_first {
            return Err(CoreError::Concurrency {
                aggregate_id,
                attempted_sequence: commit.sequence_number,
            });
        }

        let commit_sequence_number = commit.sequence_number;
        existing.extend(commit.events.into_iter().map(|event| PersistedEvent {
            event,
            commit_sequence_number,
        }));
        Ok(())
    }
}

#[async_trait]
impl EventReader for InMemoryProvider {
    async fn read_events(
        &self,
        partition_key: &PartitionKey,
        aggregate_id: AggregateId,
        after_sequence: i64,
        max_items_per_batch: usize,
        continuation_token: Option<ContinuationToken>,
    ) -> Result<EventPage, CoreError> {
        let key = Self::key(partition_key, aggregate_id);
        let store = self.store.read().expect("lock poisoned");
        let all_events = store.events.get(&key).cloned().unwrap_or_default();

        let skip_from_token = continuation_token
            .as_ref()
            .and_then(|token| token.as_str().parse::<usize>().ok())
            .unwrap_or(0);

        let candidates: Vec<PersistedEvent> = all_events
            .into_iter()
            .filter(|e| e.event.sequence_number > after_sequence)
            .skip(skip_from_token)
            .collect();

        let page: Vec<PersistedEvent> = candidates
            .iter()
            .take(max_items_per_batch)
            .cloned()
            .collect();
        let returned = page.len();

        let continuation_token = if returned == max_items_per_batch && candidates.len() > returned
        {
            Some(ContinuationToken::new((skip_from_token + returned).to_string()))
        } else {
            None
        };

        Ok(EventPage {
            events: page,
            continuation_token,
        })
    }
}

#[async_trait]
impl SnapshotWriter for InMemoryProvider {
    async fn write_snapshot(
        &self,
        partition_key: &PartitionKey,
        aggregate_id: AggregateId,
        snapshot: SerializedSnapshot,
    ) -> Result<(), CoreError> {
        let key = Self::key(partition_key, aggregate_id);
        let mut store = self.store.write().expect("lock poisoned");

        let stale = match (store.snapshots.get(&key), snapshot.last_sequence_number()) {
            (Some(existing), Some(incoming)) => {
                existing.last_sequence_number().is_some_and(|current| incoming <= current)
            }
            _ => false,
        };
        if stale {
            return Ok(());
        }

        store.snapshots.insert(key, snapshot);
        Ok(())
    }
}

#[async_trait]
impl SnapshotReader for InMemoryProvider {
    async fn read_snapshot(
        &self,
        partition_key: &PartitionKey,
        aggregate_id: AggregateId,
        up_to_sequence: Option<i64>,
    ) -> Result<SerializedSnapshot, CoreError> {
        let key = Self::key(partition_key, aggregate_id);
        let store = self.store.read().expect("lock poisoned");
        let snapshot = store
            .snapshots
            .get(&key)
            .cloned()
            .unwrap_or(SerializedSnapshot::Empty);

        let too_new = match (up_to_sequence, snapshot.last_sequence_number()) {
            (Some(bound), Some(sequence)) => sequence > bound,
            _ => false,
        };
        if too_new {
            return Ok(SerializedSnapshot::Empty);
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap as Map;

    fn event(aggregate_id: AggregateId, sequence_number: i64) -> SerializedEvent {
        SerializedEvent::new(
            aggregate_id,
            sequence_number,
            "Tested",
            b"{}".to_vec(),
            None,
            Map::new(),
        )
    }

    #[tokio::test]
    async fn append_then_read_round_trips_events() {
        let provider = InMemoryProvider::new();
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let commit = Commit::new(id, key.clone(), -1, -1, 0, vec![event(id, 0), event(id, 1)]).unwrap();
        provider.append(&key, id, commit).await.unwrap();

        let page = provider
            .read_events(&key, id, -1, 10, None)
            .await
            .unwrap();
        assert_eq!(page.events.len(), 2);
        assert!(page.events.iter().all(|e| e.commit_sequence_number == 0));
        assert!(page.continuation_token.is_none());
    }

    #[tokio::test]
    async fn append_rejects_concurrent_writers() {
        let provider = InMemoryProvider::new();
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let first = Commit::new(id, key.clone(), -1, -1, 0, vec![event(id, 0)]).unwrap();
        provider.append(&key, id, first).await.unwrap();

        // A second writer builds its commit against the same stale previous_event_sequence.
        let stale = Commit::new(id, key.clone(), -1, -1, 0, vec![event(id, 0)]).unwrap();
        let err = provider.append(&key, id, stale).await.unwrap_err();
        assert!(matches!(err, CoreError::Concurrency { .. }));
    }

    #[tokio::test]
    async fn read_events_pages_with_a_continuation_token() {
        let provider = InMemoryProvider::new();
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        let commit = Commit::new(
            id,
            key.clone(),
            -1,
            -1,
            0,
            vec![event(id, 0), event(id, 1), event(id, 2)],
        )
        .unwrap();
        provider.append(&key, id, commit).await.unwrap();

        let first_page = provider.read_events(&key, id, -1, 2, None).await.unwrap();
        assert_eq!(first_page.events.len(), 2);
        assert!(first_page.continuation_token.is_some());

        let second_page = provider
            .read_events(&key, id, -1, 2, first_page.continuation_token)
            .await
            .unwrap();
        assert_eq!(second_page.events.len(), 1);
        assert!(second_page.continuation_token.is_none());
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let provider = InMemoryProvider::new();
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);
        assert_eq!(
            provider.read_snapshot(&key, id, None).await.unwrap(),
            SerializedSnapshot::Empty
        );

        let snapshot = SerializedSnapshot::present(id, key.clone(), 3, 1, b"{}".to_vec(), 0);
        provider
            .write_snapshot(&key, id, snapshot.clone())
            .await
            .unwrap();
        assert_eq!(
            provider.read_snapshot(&key, id, None).await.unwrap(),
            snapshot
        );
    }

    #[tokio::test]
    async fn write_snapshot_ignores_a_stale_snapshot() {
        let provider = InMemoryProvider::new();
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);

        let newer = SerializedSnapshot::present(id, key.clone(), 5, 2, b"{}".to_vec(), 0);
        provider
            .write_snapshot(&key, id, newer.clone())
            .await
            .unwrap();

        let older = SerializedSnapshot::present(id, key.clone(), 3, 1, b"{}".to_vec(), 0);
        provider.write_snapshot(&key, id, older).await.unwrap();

        assert_eq!(
            provider.read_snapshot(&key, id, None).await.unwrap(),
            newer
        );
    }

    #[tokio::test]
    async fn read_snapshot_ignores_a_snapshot_past_the_requested_bound() {
        let provider = InMemoryProvider::new();
        let id = AggregateId::new();
        let key = PartitionKey::from_aggregate_id(id);

        let snapshot = SerializedSnapshot::present(id, key.clone(), 5, 2, b"{}".to_vec(), 0);
        provider
            .write_snapshot(&key, id, snapshot.clone())
            .await
            .unwrap();

        assert_eq!(
            provider.read_snapshot(&key, id, Some(3)).await.unwrap(),
            SerializedSnapshot::Empty
        );
        assert_eq!(
            provider.read_snapshot(&key, id, Some(5)).await.unwrap(),
            snapshot
        );
    }
}
