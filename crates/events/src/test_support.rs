//! Counter aggregate shared by the unit tests in this crate.

use sourcefold_core::AggregateId;

use crate::{AggregateProjection, Event};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
    pub count: i64,
    /// Events folded into this state, including ones that left `count` unchanged.
    pub applied: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterEvent {
    Created,
    Incremented,
    Adjusted(i64),
    Reset,
}

impl Event for CounterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CounterEvent::Created => "counter.created",
            CounterEvent::Incremented => "counter.incremented",
            CounterEvent::Adjusted(_) => "counter.adjusted",
            CounterEvent::Reset => "counter.reset",
        }
    }
}

pub struct CounterProjection;

impl AggregateProjection for CounterProjection {
    type State = Counter;
    type Event = CounterEvent;

    fn apply(&self, _id: &AggregateId, state: Option<&Counter>, event: &CounterEvent) -> Counter {
        let mut next = state.cloned().unwrap_or_default();
        next.applied += 1;
        match event {
            CounterEvent::Created => {}
            CounterEvent::Incremented => next.count += 1,
            CounterEvent::Adjusted(delta) => next.count += delta,
            CounterEvent::Reset => next.count = 0,
        }
        next
    }
}

pub fn test_id() -> AggregateId {
    AggregateId::new("counter-1").expect("static id is non-empty")
}
