//! Infrastructure layer: event store boundary, aggregate repository, config.

pub mod config;
pub mod event_store;
pub mod repository;


pub use config::RepositoryConfig;
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent};
pub use repository::{AggregateRepository, Committed, LoadedAggregate, RepositoryError};
