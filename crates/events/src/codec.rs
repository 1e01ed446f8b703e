//! JSON payload conversion at the serialization boundary.
//!
//! Stores and transports carry envelopes with `serde_json::Value` payloads; domain code works
//! with typed events. Decoding never substitutes a default for a payload that does not fit the
//! target type: that is corrupt history, reported as [`CodecError`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use crate::EventData;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode payload of {event_type} event {event_id}: {source}")]
    Encode {
        event_type: String,
        event_id: Uuid,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode payload of {event_type} event {event_id}: {source}")]
    Decode {
        event_type: String,
        event_id: Uuid,
        #[source]
        source: serde_json::Error,
    },
}

impl<T: Serialize> EventData<T> {
    /// Serialize the payload, keeping type, id and metadata.
    pub fn encode(&self) -> Result<EventData<JsonValue>, CodecError> {
        let payload = serde_json::to_value(self.payload()).map_err(|source| CodecError::Encode {
            event_type: self.event_type().to_string(),
            event_id: self.event_id(),
            source,
        })?;

        Ok(EventData::new(
            self.event_type(),
            self.event_id(),
            self.metadata().cloned(),
            payload,
        ))
    }
}

impl EventData<JsonValue> {
    /// Deserialize the payload into a typed event, keeping type, id and metadata.
    pub fn decode<T: DeserializeOwned>(self) -> Result<EventData<T>, CodecError> {
        let (event_type, event_id, metadata, payload) = self.into_parts();
        match serde_json::from_value(payload) {
            Ok(payload) => Ok(EventData::new(event_type, event_id, metadata, payload)),
            Err(source) => Err(CodecError::Decode {
                event_type,
                event_id,
                source,
            }),
        }
    }
}
