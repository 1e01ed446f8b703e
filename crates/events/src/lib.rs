//! Event envelopes, projections and aggregate state.
//!
//! This is the data-reconstruction layer of event sourcing: a projection folds events onto a
//! state, and the aggregate-state containers track a baseline, the current state and the events
//! applied since the baseline so a repository can append them atomically. Nothing here performs
//! IO, logs, or rejects an event.

pub mod codec;
pub mod envelope;
pub mod event;
pub mod immutable_state;
pub mod mutable_state;
pub mod projection;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use codec::CodecError;
pub use envelope::{EventData, Metadata};
pub use event::Event;
pub use immutable_state::ImmutableAggregateState;
pub use mutable_state::MutableAggregateState;
pub use projection::AggregateProjection;
pub use state::AggregateState;
