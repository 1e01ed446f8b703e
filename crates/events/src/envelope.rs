use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Event;

/// String key/value metadata attached to an envelope (correlation ids, user, source, ...).
pub type Metadata = BTreeMap<String, String>;

/// Envelope for a single domain event, as handed to (or read back from) an event log.
///
/// This is the unit you serialize and append to an aggregate stream.
///
/// Notes:
/// - **Immutable**: every field is fixed at construction; accessors only hand out
///   shared references.
/// - `metadata` is optional, and `None` is distinct from an empty map.
/// - `event_id` is expected to be unique per logical event occurrence. It is used by
///   stores and consumers for de-duplication; nothing here enforces it.
/// - No validation is performed on the type, id or payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData<T> {
    event_type: String,
    event_id: Uuid,
    metadata: Option<Metadata>,
    payload: T,
}

impl<T> EventData<T> {
    pub fn new(
        event_type: impl Into<String>,
        event_id: Uuid,
        metadata: Option<Metadata>,
        payload: T,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            event_id,
            metadata,
            payload,
        }
    }

    /// Create an envelope with a fresh UUIDv7 id and no metadata.
    pub fn new_v7(event_type: impl Into<String>, payload: T) -> Self {
        Self::new(event_type, Uuid::now_v7(), None, payload)
    }

    /// Add a metadata entry, creating the map if the envelope had none.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Split the envelope into `(event_type, event_id, metadata, payload)`.
    pub fn into_parts(self) -> (String, Uuid, Option<Metadata>, T) {
        (self.event_type, self.event_id, self.metadata, self.payload)
    }

    /// Replace the payload, keeping type, id and metadata.
    pub fn map_payload<U>(self, f: impl FnOnce(T) -> U) -> EventData<U> {
        EventData {
            event_type: self.event_type,
            event_id: self.event_id,
            metadata: self.metadata,
            payload: f(self.payload),
        }
    }
}

impl<E: Event> EventData<E> {
    /// Wrap a typed domain event, using its `event_type()` as the discriminator.
    pub fn from_event(event: E, metadata: Option<Metadata>) -> Self {
        Self::new(event.event_type(), Uuid::now_v7(), metadata, event)
    }
}

impl<T: core::fmt::Debug> core::fmt::Display for EventData<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "EventData{{eventType='{}', eventId={}, metadata={:?}, payload={:?}}}",
            self.event_type, self.event_id, self.metadata, self.payload
        )
    }
}
