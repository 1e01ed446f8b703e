//! Load → apply → persist orchestration for event-sourced aggregates.
//!
//! ```text
//! load_stream(id)
//!   ↓
//! decode payloads, fold from an absent state into the baseline
//!   ↓
//! ImmutableAggregateState (baseline, no applied events) + stream version
//!   ↓
//! decide(&state) -> events      (the only place a command can be rejected)
//!   ↓
//! apply events, append them with ExpectedVersion::Exact(version)
//! ```
//!
//! Conflict detection belongs to the store; this module only decides whether to retry.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use sourcefold_core::{AggregateId, DomainError, DomainResult, ExpectedVersion};
use sourcefold_events::{
    AggregateProjection, AggregateState, CodecError, Event, EventData, ImmutableAggregateState,
    Metadata,
};

use crate::config::RepositoryConfig;
use crate::event_store::{EventStore, EventStoreError, StoredEvent};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The command was rejected by domain logic; nothing was appended.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Optimistic concurrency failure that outlived the configured retries.
    #[error("optimistic concurrency conflict: {0}")]
    Concurrency(String),

    /// A stored payload did not decode into the aggregate's event type,
    /// or a new one failed to encode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The store returned a stream that is not 1-based and contiguous.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for RepositoryError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => RepositoryError::Concurrency(msg),
            other => RepositoryError::Store(other),
        }
    }
}

/// A freshly rebuilt aggregate and the stream version it was rebuilt from.
///
/// `version` is the concurrency token for the eventual append.
pub struct LoadedAggregate<P: AggregateProjection> {
    pub aggregate: ImmutableAggregateState<P>,
    pub version: u64,
}

impl<P: AggregateProjection> LoadedAggregate<P> {
    pub fn expected_version(&self) -> ExpectedVersion {
        ExpectedVersion::Exact(self.version)
    }
}

impl<P> core::fmt::Debug for LoadedAggregate<P>
where
    P: AggregateProjection,
    P::State: core::fmt::Debug,
    P::Event: Clone + core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoadedAggregate")
            .field("aggregate", &self.aggregate)
            .field("version", &self.version)
            .finish()
    }
}

/// Result of a successful [`AggregateRepository::execute`].
pub struct Committed<P: AggregateProjection> {
    /// The lineage after applying the decided events (they are now persisted).
    pub aggregate: ImmutableAggregateState<P>,
    pub events: Vec<StoredEvent>,
    /// Stream version after the append.
    pub version: u64,
}

impl<P> core::fmt::Debug for Committed<P>
where
    P: AggregateProjection,
    P::State: core::fmt::Debug,
    P::Event: Clone + core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Committed")
            .field("aggregate", &self.aggregate)
            .field("events", &self.events)
            .field("version", &self.version)
            .finish()
    }
}

/// Repository for one kind of aggregate, defined by its projection.
pub struct AggregateRepository<P, S> {
    projection: Arc<P>,
    store: S,
    config: RepositoryConfig,
}

impl<P, S> AggregateRepository<P, S> {
    pub fn new(projection: P, store: S) -> Self {
        Self::with_config(projection, store, RepositoryConfig::default())
    }

    pub fn with_config(projection: P, store: S, config: RepositoryConfig) -> Self {
        Self {
            projection: Arc::new(projection),
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> RepositoryConfig {
        self.config
    }
}

impl<P, S> AggregateRepository<P, S>
where
    P: AggregateProjection,
    P::Event: Event + Serialize + DeserializeOwned,
    S: EventStore,
{
    /// Rebuild the aggregate's baseline from its stream.
    ///
    /// An aggregate without events loads with an absent baseline and version 0.
    pub fn load(&self, id: &AggregateId) -> Result<LoadedAggregate<P>, RepositoryError> {
        let stream = self.store.load_stream(id)?;
        validate_stream(id, &stream)?;
        let version = stream_version(&stream);

        let history = stream
            .into_iter()
            .map(|stored| {
                stored
                    .data
                    .decode::<P::Event>()
                    .map(EventData::into_payload)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let original = self.projection.apply_all(id, None, &history);
        tracing::debug!(
            aggregate_id = %id,
            version,
            exists = original.is_some(),
            "loaded aggregate"
        );

        let projection = Arc::clone(&self.projection);
        Ok(LoadedAggregate {
            aggregate: ImmutableAggregateState::new(projection, id.clone(), original),
            version,
        })
    }

    /// Append the events applied since the baseline, checking the stream is still at `version`.
    ///
    /// Saving an aggregate with no applied events appends nothing. Every call wraps the events in
    /// envelopes with freshly generated ids, so re-running `save` after an ambiguous store failure
    /// cannot be recognised as a repeat. Callers that retry such failures should build the
    /// envelopes once with [`Self::envelopes`] and hand the same batch to [`Self::save_envelopes`].
    pub fn save<A>(
        &self,
        version: u64,
        aggregate: &A,
        metadata: Option<&Metadata>,
    ) -> Result<Vec<StoredEvent>, RepositoryError>
    where
        A: AggregateState<Event = P::Event>,
    {
        let envelopes = self.envelopes(aggregate, metadata);
        self.save_envelopes(aggregate.id(), version, &envelopes)
    }

    /// Wrap the aggregate's applied events, each under a new UUIDv7 event id.
    pub fn envelopes<A>(
        &self,
        aggregate: &A,
        metadata: Option<&Metadata>,
    ) -> Vec<EventData<P::Event>>
    where
        A: AggregateState<Event = P::Event>,
    {
        aggregate
            .applied_events()
            .map(|event| {
                EventData::new(event.event_type(), Uuid::now_v7(), metadata.cloned(), event.clone())
            })
            .collect()
    }

    /// Append already enveloped events at `version`.
    ///
    /// Event ids are kept as given, so a store that has already committed the batch rejects the
    /// repeat instead of storing it twice.
    pub fn save_envelopes(
        &self,
        id: &AggregateId,
        version: u64,
        envelopes: &[EventData<P::Event>],
    ) -> Result<Vec<StoredEvent>, RepositoryError> {
        if envelopes.is_empty() {
            return Ok(vec![]);
        }

        let pending = envelopes
            .iter()
            .map(EventData::encode)
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(id, ExpectedVersion::Exact(version), pending)?;

        tracing::info!(
            aggregate_id = %id,
            appended = committed.len(),
            version = version + committed.len() as u64,
            "saved aggregate"
        );
        Ok(committed)
    }

    /// Run a command against the aggregate: load, decide, apply, save.
    ///
    /// `decide` sees the freshly loaded state and returns the events that should happen, or a
    /// `DomainError` to reject the command. On a concurrency conflict the whole cycle is re-run
    /// against the reloaded state, up to `max_conflict_retries` times.
    pub fn execute<F>(
        &self,
        id: &AggregateId,
        metadata: Option<&Metadata>,
        mut decide: F,
    ) -> Result<Committed<P>, RepositoryError>
    where
        F: FnMut(&ImmutableAggregateState<P>) -> DomainResult<Vec<P::Event>>,
    {
        let mut retries = 0u32;
        loop {
            let loaded = self.load(id)?;
            let decided = decide(&loaded.aggregate)?;
            let aggregate = loaded.aggregate.apply_all(decided);

            match self.save(loaded.version, &aggregate, metadata) {
                Ok(events) => {
                    let version = loaded.version + events.len() as u64;
                    return Ok(Committed {
                        aggregate,
                        events,
                        version,
                    });
                }
                Err(RepositoryError::Concurrency(msg))
                    if retries < self.config.max_conflict_retries =>
                {
                    retries += 1;
                    tracing::warn!(
                        aggregate_id = %id,
                        retry = retries,
                        max_retries = self.config.max_conflict_retries,
                        error = %msg,
                        "concurrency conflict, retrying command"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_stream(id: &AggregateId, stream: &[StoredEvent]) -> Result<(), RepositoryError> {
    for (idx, stored) in stream.iter().enumerate() {
        if &stored.aggregate_id != id {
            return Err(RepositoryError::CorruptStream(format!(
                "stream {id} contains an event of {} at index {idx}",
                stored.aggregate_id
            )));
        }
        let expected = idx as u64 + 1;
        if stored.sequence_number != expected {
            return Err(RepositoryError::CorruptStream(format!(
                "stream {id}: expected sequence_number {expected} at index {idx}, found {}",
                stored.sequence_number
            )));
        }
    }
    Ok(())
}
