//! Rehydrating an [`Aggregate`] from a snapshot plus the suffix of its event log.

use tracing::trace;

use crate::aggregate::Aggregate;
use crate::error::CoreError;
use crate::ids::{AggregateId, PartitionKey};
use crate::provider::{ContinuationToken, EventReader, SnapshotReader};
use crate::snapshot::SerializedSnapshot;
use crate::validation::validate_commit_stream;

/// Tunables for [`AggregateReader::read`].
///
/// Grounded on the per-call tuning knobs storage providers in this lineage expose as
/// builder methods (table names, streaming channel size): here they're collected into one
/// plain, `Clone + Default` struct rather than threaded individually through every call.
#[derive(Debug, Clone)]
pub struct AggregateReaderConfig {
    max_items_per_batch: usize,
    up_to_sequence: Option<i64>,
}

impl Default for AggregateReaderConfig {
    fn default() -> Self {
        AggregateReaderConfig {
            max_items_per_batch: 500,
            up_to_sequence: None,
        }
    }
}

impl AggregateReaderConfig {
    /// Creates a config with default tunables (unbounded read, 500 events per page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of events requested per [`EventReader::read_events`] call.
    #[must_use]
    pub fn with_max_items_per_batch(mut self, max_items_per_batch: usize) -> Self {
        self.max_items_per_batch = max_items_per_batch;
        self
    }

    /// Bounds the read to events at or before `up_to_sequence`, for reconstructing an
    /// aggregate's state as of a point in its history.
    #[must_use]
    pub fn with_up_to_sequence(mut self, up_to_sequence: i64) -> Self {
        self.up_to_sequence = Some(up_to_sequence);
        self
    }
}

/// Rehydrates aggregates by combining a provider's snapshot with the event-log suffix
/// that followed it.
pub struct AggregateReader<'a> {
    snapshots: &'a (dyn SnapshotReader),
    events: &'a (dyn EventReader),
    config: AggregateReaderConfig,
}

impl<'a> AggregateReader<'a> {
    /// Creates a reader over the given snapshot and event providers.
    pub fn new(
        snapshots: &'a (dyn SnapshotReader),
        events: &'a (dyn EventReader),
        config: AggregateReaderConfig,
    ) -> Self {
        AggregateReader {
            snapshots,
            events,
            config,
        }
    }

    /// Rehydrates an aggregate: reads the current snapshot (if any), decodes it via
    /// `decode_memento`, then pages through the event log from that point forward,
    /// folding each page's events into the memento via `fold` and validating contiguity
    /// as it goes.
    ///
    /// `decode_memento` is handed `None` when no snapshot exists (in which case it must
    /// produce the aggregate's initial memento) and `Some(memento_bytes)` otherwise; it is
    /// the caller's codec, not the core, that knows how to decode a memento's bytes.
    pub async fn read<M>(
        &self,
        aggregate_id: AggregateId,
        partition_key: &PartitionKey,
        decode_memento: impl FnOnce(Option<&[u8]>) -> Result<M, CoreError>,
        mut fold: impl FnMut(M, &crate::event::SerializedEvent) -> M,
    ) -> Result<Aggregate<M>, CoreError> {
        let snapshot = self
            .snapshots
            .read_snapshot(partition_key, aggregate_id, self.config.up_to_sequence)
            .await?;

        let (mut memento, mut after_sequence, mut commit_seq) = match snapshot {
            SerializedSnapshot::Empty => (decode_memento(None)?, -1, -1),
            SerializedSnapshot::Present {
                last_sequence_number,
                commit_sequence_number,
                ref memento_bytes,
                ..
            } => {
                trace!(
                    aggregate_id = %aggregate_id,
                    last_sequence_number,
                    commit_sequence_number,
                    "found snapshot, decoding and replaying the suffix"
                );
                (
                    decode_memento(Some(memento_bytes))?,
                    last_sequence_number,
                    commit_sequence_number,
                )
            }
        };

        let mut continuation_token: Option<ContinuationToken> = None;
        loop {
            let page = self
                .events
                .read_events(
                    partition_key,
                    aggregate_id,
                    after_sequence,
                    self.config.max_items_per_batch,
                    continuation_token.clone(),
                )
                .await?;

            let persisted = match self.config.up_to_sequence {
                Some(limit) => page
                    .events
                    .into_iter()
                    .take_while(|persisted| persisted.event.sequence_number <= limit)
                    .collect::<Vec<_>>(),
                None => page.events,
            };

            let events: Vec<crate::event::SerializedEvent> =
                persisted.iter().map(|p| p.event.clone()).collect();
            validate_commit_stream(aggregate_id, after_sequence, &events)?;

            for persisted in &persisted {
                memento = fold(memento, &persisted.event);
                after_sequence = persisted.event.sequence_number;
                commit_seq = persisted.commit_sequence_number;
            }

            let reached_limit = self
                .config
                .up_to_sequence
                .is_some_and(|limit| after_sequence >= limit);
            if reached_limit || page.continuation_token.is_none() {
                break;
            }
            continuation_token = page.continuation_token;
        }

        Ok(Aggregate::at(
            aggregate_id,
            partition_key.clone(),
            commit_seq,
            after_sequence,
            memento,
        ))
    }
}
