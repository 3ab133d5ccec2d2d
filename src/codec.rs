//! Pluggable serialization of event and snapshot payloads into the opaque byte buffers
//! the core and storage providers actually traffic in.

use crate::error::CoreError;

/// Encodes and decodes event payloads of type `P` to and from the opaque byte buffers
/// carried by [`crate::SerializedEvent`].
pub trait EventSerializer<P> {
    /// Serializes a payload to bytes, returning the `payload_type` discriminant alongside.
    fn serialize(&self, payload: &P) -> Result<(String, Vec<u8>), CoreError>;

    /// Deserializes a payload given its `payload_type` discriminant and raw bytes.
    fn deserialize(&self, payload_type: &str, bytes: &[u8]) -> Result<P, CoreError>;
}

/// Encodes and decodes snapshot mementos of type `M` to and from the opaque byte buffers
/// carried by [`crate::SerializedSnapshot`].
pub trait SnapshotSerializer<M> {
    /// Serializes a memento to bytes.
    fn serialize(&self, memento: &M) -> Result<Vec<u8>, CoreError>;

    /// Deserializes a memento from bytes.
    fn deserialize(&self, bytes: &[u8]) -> Result<M, CoreError>;
}

/// A `serde_json`-backed reference implementation of [`EventSerializer`] and
/// [`SnapshotSerializer`]. Not a recommended wire format for production use, only test
/// tooling: a real deployment should pick a serialization format deliberately.
pub mod json {
    use std::marker::PhantomData;

    use serde::de::DeserializeOwned;
    use serde::Serialize;

    use super::{CoreError, EventSerializer, SnapshotSerializer};

    /// A JSON codec for a specific payload type `P`, identifying the payload's schema by
    /// `payload_type` (the Rust type name of `P`, via [`std::any::type_name`]).
    #[derive(Debug, Clone, Copy)]
    pub struct JsonCodec<P> {
        _marker: PhantomData<fn() -> P>,
    }

    impl<P> Default for JsonCodec<P> {
        fn default() -> Self {
            JsonCodec {
                _marker: PhantomData,
            }
        }
    }

    impl<P> JsonCodec<P> {
        /// Creates a new JSON codec.
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl<P> EventSerializer<P> for JsonCodec<P>
    where
        P: Serialize + DeserializeOwned,
    {
        fn serialize(&self, payload: &P) -> Result<(String, Vec<u8>), CoreError> {
            let bytes = serde_json::to_vec(payload)?;
            Ok((std::any::type_name::<P>().to_string(), bytes))
        }

        fn deserialize(&self, _payload_type: &str, bytes: &[u8]) -> Result<P, CoreError> {
            Ok(serde_json::from_slice(bytes)?)
        }
    }

    impl<M> SnapshotSerializer<M> for JsonCodec<M>
    where
        M: Serialize + DeserializeOwned,
    {
        fn serialize(&self, memento: &M) -> Result<Vec<u8>, CoreError> {
            Ok(serde_json::to_vec(memento)?)
        }

        fn deserialize(&self, bytes: &[u8]) -> Result<M, CoreError> {
            Ok(serde_json::from_slice(bytes)?)
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;
        use serde::Deserialize;

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Payload {
            value: u32,
        }

        #[test]
        fn round_trips_a_payload() {
            let codec = JsonCodec::<Payload>::new();
            let payload = Payload { value: 42 };
            let (payload_type, bytes) =
                EventSerializer::serialize(&codec, &payload).unwrap();
            let decoded: Payload = codec.deserialize(&payload_type, &bytes).unwrap();
            assert_eq!(decoded, payload);
        }

        #[test]
        fn rejects_malformed_bytes() {
            let codec = JsonCodec::<Payload>::new();
            let err: Result<Payload, _> = codec.deserialize("Payload", b"not json");
            assert!(matches!(err, Err(CoreError::SerializationFailed(_))));
        }
    }
}
