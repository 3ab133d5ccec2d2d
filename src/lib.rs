#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(rust_2018_idioms)]

//! # aggregate-es
//!
//! **The core of an event-sourced aggregate persistence engine.**
//!
//! This crate stores the state of long-lived domain entities ("aggregates") as an
//! ordered, append-only log of events, and reconstructs those entities on demand by
//! combining a snapshot with a suffix of the log.
//!
//! It specifies, and provides a faithful implementation of:
//! - the data model ([`Event`], [`Commit`], [`Snapshot`], their serialized forms, and
//!   sequence numbering);
//! - the append protocol ([`Aggregate::apply_event`], [`Aggregate::commit`], optimistic
//!   concurrency via [`EventWriter`]);
//! - the read/rehydrate protocol ([`AggregateReader`], snapshot + event-suffix replay
//!   with paging);
//! - the pluggable storage-provider contract ([`EventWriter`], [`EventReader`],
//!   [`SnapshotWriter`], [`SnapshotReader`]).
//!
//! Concrete storage backends, wire serialization formats, hosting, and projection/
//! read-model building are intentionally not part of this crate; see [`mem`] and
//! [`codec::json`] for reference implementations used only in this crate's own tests.

mod aggregate;
pub mod codec;
mod commit;
mod error;
mod event;
mod ids;
pub mod mem;
mod provider;
mod reader;
mod snapshot;
mod validation;

#[doc(hidden)]
pub mod doc;

pub use aggregate::{store_snapshot, Aggregate};
pub use commit::Commit;
pub use error::CoreError;
pub use event::{Event, SerializedEvent};
pub use ids::{AggregateId, PartitionKey};
pub use provider::{
    ContinuationToken, EventPage, EventReader, EventWriter, PersistedEvent, SnapshotReader,
    SnapshotWriter,
};
pub use reader::{AggregateReader, AggregateReaderConfig};
pub use snapshot::{Snapshot, SerializedSnapshot};
pub use validation::validate_commit_stream;
