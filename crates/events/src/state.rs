//! Read contract shared by the aggregate-state containers.

use std::sync::Arc;

use sourcefold_core::AggregateId;

use crate::AggregateProjection;

/// Read-only view of an aggregate's state within one logical session.
///
/// An aggregate state carries:
/// - the aggregate `id`
/// - the **original** (baseline) state the session started from, which never changes across
///   `apply` calls and is what the event store checks concurrency against
/// - the **current** state, the baseline with every applied event folded in
/// - the events applied since the baseline, in application order
///
/// Both [`crate::ImmutableAggregateState`] and [`crate::MutableAggregateState`] implement this;
/// code that only needs to read (e.g. to persist pending events) should be generic over it.
pub trait AggregateState {
    type State;
    type Event;

    fn id(&self) -> &AggregateId;

    /// Baseline state at construction time; `None` if the aggregate did not exist.
    fn original_state(&self) -> Option<&Self::State>;

    /// Current state.
    ///
    /// Equal to [`AggregateState::original_state`] until the first event is applied, so it is
    /// `None` only for an aggregate that never existed and has had nothing applied yet.
    fn state(&self) -> Option<&Self::State>;

    /// Events applied since the baseline, oldest first.
    fn applied_events(&self) -> impl Iterator<Item = &Self::Event>;

    /// Number of events applied since the baseline.
    fn applied_count(&self) -> usize;

    /// Whether the aggregate has a current state.
    fn exists(&self) -> bool {
        self.state().is_some()
    }

    /// Whether any events are waiting to be persisted.
    fn has_pending_events(&self) -> bool {
        self.applied_count() > 0
    }
}

/// Fold `events` onto `state`, the one routine both containers apply events through.
///
/// The first event goes through the single-event `apply` (it may start from an absent state);
/// the rest go through the projection's fold, so a projection that overrides `apply_all` still
/// batches the tail.
pub(crate) fn fold_events<P>(
    projection: &P,
    id: &AggregateId,
    state: Option<Arc<P::State>>,
    events: &[P::Event],
) -> Option<Arc<P::State>>
where
    P: AggregateProjection,
{
    let Some((first, rest)) = events.split_first() else {
        return state;
    };

    let head = projection.apply(id, state.as_deref(), first);
    projection.apply_all(id, Some(head), rest).map(Arc::new)
}
