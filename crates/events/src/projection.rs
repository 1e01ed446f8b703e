use sourcefold_core::AggregateId;

/// A projection is a function that, given an aggregate's state and an event, returns a new
/// state representing the aggregate with the event applied.
///
/// ## Purity
///
/// `apply` must be a pure function: no externally visible side effects and no dependence on
/// mutable external state. Given the same (or semantically equivalent) id, state and event it
/// must return a semantically equivalent state. Projections hold no state of their own; one
/// instance is shared by every aggregate it folds, across threads.
///
/// ## No rejection
///
/// Unlike commands, events cannot be rejected: they describe things that already happened.
/// A projection must cope with every event it may ever be handed, including older event shapes,
/// substituting sane defaults for values that later versions of an event introduced.
///
/// There is no error channel. A payload the projection cannot make sense of means the history is
/// corrupt or the projection has a bug; panic rather than invent a state.
///
/// ## Absent state
///
/// `state` is `None` for an aggregate that has never existed. The projection must then start
/// from its initial/default state and apply the event to that.
pub trait AggregateProjection: Send + Sync {
    type State;
    type Event;

    /// Apply a single event, returning the new state.
    fn apply(&self, id: &AggregateId, state: Option<&Self::State>, event: &Self::Event)
    -> Self::State;

    /// Apply a sequence of events, left to right.
    ///
    /// Must be semantically equivalent to calling [`AggregateProjection::apply`] once per event
    /// in iteration order, threading the state through. Override only to batch work; the result
    /// must not differ. With no events, `state` is returned as is (including `None`).
    fn apply_all<'a, I>(
        &self,
        id: &AggregateId,
        state: Option<Self::State>,
        events: I,
    ) -> Option<Self::State>
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        events
            .into_iter()
            .fold(state, |state, event| Some(self.apply(id, state.as_ref(), event)))
    }
}

impl<P> AggregateProjection for std::sync::Arc<P>
where
    P: AggregateProjection,
{
    type State = P::State;
    type Event = P::Event;

    fn apply(
        &self,
        id: &AggregateId,
        state: Option<&Self::State>,
        event: &Self::Event,
    ) -> Self::State {
        (**self).apply(id, state, event)
    }

    fn apply_all<'a, I>(
        &self,
        id: &AggregateId,
        state: Option<Self::State>,
        events: I,
    ) -> Option<Self::State>
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        (**self).apply_all(id, state, events)
    }
}
