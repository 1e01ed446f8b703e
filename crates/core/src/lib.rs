//! `sourcefold-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! aggregate identity, the domain error model and optimistic concurrency
//! expectations shared by the event and infrastructure layers.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::ExpectedVersion;
pub use error::{DomainError, DomainResult};
pub use id::AggregateId;
