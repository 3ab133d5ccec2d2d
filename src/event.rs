use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ids::AggregateId;

/// A logical event about to be (or having been) applied to an aggregate.
///
/// The name of an event's payload should always be in the past tense, e.g.
/// `ItemAdded`, `EmailAddressChanged`, `DependencyRemoved`. Payloads are committed to
/// `Serialize + DeserializeOwned` so the configured codec (see [`crate::codec`]) can turn
/// them into a [`SerializedEvent`].
///
/// Invariant: at the moment of application, `sequence_number` must equal the aggregate's
/// current `event_seq + 1` (see [`crate::Aggregate::apply_event`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Event<P> {
    /// The aggregate instance this event belongs to.
    pub aggregate_id: AggregateId,
    /// The position of this event within the aggregate's full event history.
    pub sequence_number: i64,
    /// The event payload carrying the business information.
    pub payload: P,
    /// A discriminant identifying the payload's schema, used by domain code to dispatch
    /// on deserialization. Uniquely determines how `payload_bytes` should be decoded.
    pub payload_type: String,
    /// Milliseconds since the Unix epoch, if the caller chose to stamp one.
    pub timestamp_ms: Option<i64>,
    /// Additional metadata for auditing, logging or debugging purposes (e.g. the user or
    /// request that caused this event). The core never inspects its contents.
    pub metadata: HashMap<String, String>,
}

impl<P> Event<P> {
    /// Builds a new event with no metadata and no explicit timestamp.
    pub fn new(
        aggregate_id: AggregateId,
        sequence_number: i64,
        payload: P,
        payload_type: impl Into<String>,
    ) -> Self {
        Self {
            aggregate_id,
            sequence_number,
            payload,
            payload_type: payload_type.into(),
            timestamp_ms: None,
            metadata: HashMap::new(),
        }
    }

    /// Attaches metadata to this event, replacing any previously set.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A serialized event with metadata, produced by an [`crate::codec::EventSerializer`] and
/// stored by an [`crate::EventWriter`]/read back by an [`crate::EventReader`].
///
/// An event is unique within a system based on its `aggregate_id` and `sequence_number`.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedEvent {
    /// The aggregate instance this event belongs to.
    pub aggregate_id: AggregateId,
    /// The position of this event within the aggregate's full event history.
    pub sequence_number: i64,
    /// A discriminant identifying the payload's schema.
    pub payload_type: String,
    /// The opaque, codec-produced serialized payload.
    pub payload_bytes: Vec<u8>,
    /// Milliseconds since the Unix epoch, if the caller chose to stamp one.
    pub timestamp_ms: Option<i64>,
    /// Serialized metadata, carried opaquely alongside the payload.
    pub metadata: HashMap<String, String>,
}

impl SerializedEvent {
    /// Builds a new `SerializedEvent` from its constituent parts.
    pub fn new(
        aggregate_id: AggregateId,
        sequence_number: i64,
        payload_type: impl Into<String>,
        payload_bytes: Vec<u8>,
        timestamp_ms: Option<i64>,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            aggregate_id,
            sequence_number,
            payload_type: payload_type.into(),
            payload_bytes,
            timestamp_ms,
            metadata,
        }
    }
}

/// Marker bound satisfied by any event payload usable with the default JSON codec
/// (see [`crate::codec::json`]). The core itself never requires this bound directly —
/// only the reference codec does.
pub trait JsonPayload: Serialize + DeserializeOwned + Clone + PartialEq + std::fmt::Debug {}

impl<P> JsonPayload for P where P: Serialize + DeserializeOwned + Clone + PartialEq + std::fmt::Debug
{}
