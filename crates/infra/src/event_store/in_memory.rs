use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use sourcefold_core::{AggregateId, ExpectedVersion};
use sourcefold_events::EventData;

use super::r#trait::{EventStore, EventStoreError, StoredEvent};

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: ExpectedVersion,
        events: Vec<EventData<JsonValue>>,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        let stream = streams.entry(aggregate_id.clone()).or_default();
        let current = Self::current_version(stream);

        let mut incoming = HashSet::with_capacity(events.len());
        if let Some(dup) = events.iter().find(|e| !incoming.insert(e.event_id())) {
            return Err(EventStoreError::InvalidAppend(format!(
                "stream {aggregate_id}: event {} appears twice in one batch",
                dup.event_id()
            )));
        }

        if let Some(dup) = stream.iter().find(|s| incoming.contains(&s.data.event_id())) {
            return Err(EventStoreError::InvalidAppend(format!(
                "stream {aggregate_id}: event {} already appended",
                dup.data.event_id()
            )));
        }

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "stream {aggregate_id}: expected {expected_version:?}, found {current}"
            )));
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(data, sequence_number)| StoredEvent {
                aggregate_id: aggregate_id.clone(),
                sequence_number,
                data,
            })
            .collect();

        stream.extend(committed.iter().cloned());
        tracing::debug!(
            aggregate_id = %aggregate_id,
            appended = committed.len(),
            version = current + committed.len() as u64,
            "appended events"
        );

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(streams.get(aggregate_id).cloned().unwrap_or_default())
    }
}
