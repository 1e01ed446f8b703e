use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use sourcefold_core::{AggregateId, ExpectedVersion};
use sourcefold_events::EventData;
use std::sync::Arc;

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers are assigned by the event store during append and are:
/// - **1-based and contiguous** within a stream: the n-th event has sequence number n
/// - **Immutable**: once assigned, sequence numbers never change
///
/// The stream version is therefore the sequence number of the last event, which is what
/// callers pass back as `ExpectedVersion::Exact` when appending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub aggregate_id: AggregateId,

    /// Position in the aggregate stream.
    pub sequence_number: u64,

    pub data: EventData<JsonValue>,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }
}

/// Event store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to domain errors.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Append-only event store.
///
/// Events are organized into **streams**, one per aggregate instance, keyed by
/// [`AggregateId`].
///
/// ## Append Semantics
///
/// `append()`:
/// - Checks optimistic concurrency (stream version must match `expected_version`)
/// - Assigns sequence numbers (starting at current_version + 1)
/// - Persists events atomically (all or nothing)
///
/// ## Load Semantics
///
/// `load_stream()`:
/// - Returns all events for the aggregate in sequence number order, without duplicates
/// - Returns an empty vector if the stream doesn't exist (aggregate not yet created)
pub trait EventStore: Send + Sync {
    /// Append events to an aggregate stream, returning them with their assigned positions.
    fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: ExpectedVersion,
        events: Vec<EventData<JsonValue>>,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load the full stream for an aggregate.
    fn load_stream(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: ExpectedVersion,
        events: Vec<EventData<JsonValue>>,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(aggregate_id, expected_version, events)
    }

    fn load_stream(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(aggregate_id)
    }
}
