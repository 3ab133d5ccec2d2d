//! A worked example used only by this crate's own rustdoc, not part of the public API.
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::codec::json::JsonCodec;
use crate::codec::{EventSerializer, SnapshotSerializer};
use crate::mem::InMemoryProvider;
use crate::{Aggregate, AggregateId, AggregateReader, AggregateReaderConfig, PartitionKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TodoEvent {
    ItemAdded { description: String },
    ItemCompleted { description: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub open: Vec<String>,
    pub completed: Vec<String>,
}

fn fold(mut list: TodoList, event: &crate::SerializedEvent) -> TodoList {
    let codec = JsonCodec::<TodoEvent>::new();
    let decoded = codec
        .deserialize(&event.payload_type, &event.payload_bytes)
        .expect("doc example events always decode");
    match decoded {
        TodoEvent::ItemAdded { description } => list.open.push(description),
        TodoEvent::ItemCompleted { description } => {
            list.open.retain(|item| item != &description);
            list.completed.push(description);
        }
    }
    list
}

/// ```ignore
/// let provider = InMemoryProvider::new();
/// let aggregate_id = AggregateId::new();
/// let partition_key = PartitionKey::from_aggregate_id(aggregate_id);
///
/// let aggregate = Aggregate::new(aggregate_id, partition_key.clone(), TodoList::default());
/// // ... apply events, then `aggregate.commit(&provider, timestamp_ms).await?`.
/// let reader = AggregateReader::new(&provider, &provider, AggregateReaderConfig::new());
/// let rehydrated = reader
///     .read(aggregate_id, &partition_key, |_| Ok(TodoList::default()), fold)
///     .await?;
/// ```
#[allow(dead_code)]
fn _doctest_anchor() {}
