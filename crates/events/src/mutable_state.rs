use std::sync::Arc;

use sourcefold_core::AggregateId;

use crate::state::fold_events;
use crate::{AggregateProjection, AggregateState, ImmutableAggregateState};

/// In-place counterpart of [`ImmutableAggregateState`].
///
/// Same read contract and fold semantics, but `apply` updates `self` instead of returning a new
/// wrapper. Applying needs `&mut self`, which keeps an instance confined to the one logical
/// operation (typically one command against one aggregate) that owns it.
pub struct MutableAggregateState<P: AggregateProjection> {
    projection: Arc<P>,
    id: AggregateId,
    original_state: Option<Arc<P::State>>,
    state: Option<Arc<P::State>>,
    events: Vec<P::Event>,
}

impl<P: AggregateProjection> MutableAggregateState<P> {
    /// Start from a freshly loaded baseline, with no applied events.
    pub fn new(
        projection: impl Into<Arc<P>>,
        id: AggregateId,
        original_state: Option<P::State>,
    ) -> Self {
        let original_state = original_state.map(Arc::new);
        Self {
            projection: projection.into(),
            id,
            state: original_state.clone(),
            original_state,
            events: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        projection: Arc<P>,
        id: AggregateId,
        original_state: Option<Arc<P::State>>,
        state: Option<Arc<P::State>>,
        events: Vec<P::Event>,
    ) -> Self {
        Self {
            projection,
            id,
            original_state,
            state,
            events,
        }
    }

    pub fn id(&self) -> &AggregateId {
        &self.id
    }

    pub fn original_state(&self) -> Option<&P::State> {
        self.original_state.as_deref()
    }

    pub fn state(&self) -> Option<&P::State> {
        self.state.as_deref()
    }

    pub fn events(&self) -> &[P::Event] {
        &self.events
    }

    pub fn apply(&mut self, event: P::Event) -> &mut Self {
        self.state = fold_events(
            &*self.projection,
            &self.id,
            self.state.take(),
            std::slice::from_ref(&event),
        );
        self.events.push(event);
        self
    }

    /// Apply events in order. An empty sequence leaves `self` unchanged.
    pub fn apply_all(&mut self, events: impl IntoIterator<Item = P::Event>) -> &mut Self {
        let batch: Vec<P::Event> = events.into_iter().collect();
        if batch.is_empty() {
            return self;
        }

        self.state = fold_events(&*self.projection, &self.id, self.state.take(), &batch);
        self.events.extend(batch);
        self
    }
}

impl<P> MutableAggregateState<P>
where
    P: AggregateProjection,
    P::Event: Clone,
{
    /// Snapshot the current contents into an immutable lineage.
    pub fn to_immutable(&self) -> ImmutableAggregateState<P> {
        ImmutableAggregateState::from_parts(
            Arc::clone(&self.projection),
            self.id.clone(),
            self.original_state.clone(),
            self.state.clone(),
            self.events.iter().cloned().collect(),
        )
    }

    pub fn into_immutable(self) -> ImmutableAggregateState<P> {
        ImmutableAggregateState::from_parts(
            self.projection,
            self.id,
            self.original_state,
            self.state,
            self.events.into_iter().collect(),
        )
    }
}

impl<P> From<MutableAggregateState<P>> for ImmutableAggregateState<P>
where
    P: AggregateProjection,
    P::Event: Clone,
{
    fn from(value: MutableAggregateState<P>) -> Self {
        value.into_immutable()
    }
}

impl<P> From<ImmutableAggregateState<P>> for MutableAggregateState<P>
where
    P: AggregateProjection,
    P::Event: Clone,
{
    fn from(value: ImmutableAggregateState<P>) -> Self {
        value.to_mutable()
    }
}

impl<P: AggregateProjection> AggregateState for MutableAggregateState<P> {
    type State = P::State;
    type Event = P::Event;

    fn id(&self) -> &AggregateId {
        &self.id
    }

    fn original_state(&self) -> Option<&P::State> {
        self.original_state.as_deref()
    }

    fn state(&self) -> Option<&P::State> {
        self.state.as_deref()
    }

    fn applied_events(&self) -> impl Iterator<Item = &P::Event> {
        self.events.iter()
    }

    fn applied_count(&self) -> usize {
        self.events.len()
    }
}

impl<P> core::fmt::Debug for MutableAggregateState<P>
where
    P: AggregateProjection,
    P::State: core::fmt::Debug,
    P::Event: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MutableAggregateState")
            .field("id", &self.id)
            .field("original_state", &self.original_state)
            .field("state", &self.state)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::test_support::{Counter, CounterEvent, CounterProjection, test_id};

    fn fresh(original: Option<Counter>) -> MutableAggregateState<CounterProjection> {
        MutableAggregateState::new(CounterProjection, test_id(), original)
    }

    #[test]
    fn apply_mutates_in_place_and_chains() {
        let mut agg = fresh(None);
        agg.apply(CounterEvent::Created)
            .apply(CounterEvent::Incremented)
            .apply(CounterEvent::Incremented);

        assert_eq!(agg.state().map(|c| c.count), Some(2));
        assert_eq!(agg.events().len(), 3);
        assert_eq!(agg.original_state(), None);
    }

    #[test]
    fn original_state_survives_every_apply() {
        let baseline = Counter { count: 7, applied: 7 };
        let mut agg = fresh(Some(baseline.clone()));

        agg.apply(CounterEvent::Reset);
        agg.apply_all([CounterEvent::Adjusted(3), CounterEvent::Incremented]);

        assert_eq!(agg.original_state(), Some(&baseline));
        assert_eq!(agg.state(), Some(&Counter { count: 4, applied: 10 }));
    }

    #[test]
    fn empty_apply_performs_no_mutation() {
        let mut agg = fresh(Some(Counter::default()));
        agg.apply(CounterEvent::Incremented);

        agg.apply_all(std::iter::empty());

        assert_eq!(agg.events(), &[CounterEvent::Incremented]);
        assert_eq!(agg.state().map(|c| c.count), Some(1));
    }

    #[test]
    fn round_trip_through_immutable() {
        let mut agg = fresh(None);
        agg.apply_all([CounterEvent::Created, CounterEvent::Adjusted(-2)]);

        let snapshot = agg.to_immutable();
        agg.apply(CounterEvent::Incremented);

        assert_eq!(snapshot.events().len(), 2);
        assert_eq!(snapshot.state().map(|c| c.count), Some(-2));

        let back: ImmutableAggregateState<CounterProjection> = agg.into();
        assert_eq!(back.events().len(), 3);
        assert_eq!(back.state().map(|c| c.count), Some(-1));
    }

    fn event_strategy() -> impl Strategy<Value = CounterEvent> {
        prop_oneof![
            Just(CounterEvent::Created),
            Just(CounterEvent::Incremented),
            (-50i64..50).prop_map(CounterEvent::Adjusted),
            Just(CounterEvent::Reset),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying the same events to an immutable lineage and to its mutable copy
        /// (one at a time or batched) ends in equal lineages.
        #[test]
        fn mutable_and_immutable_agree(
            prefix in prop::collection::vec(event_strategy(), 0..8),
            events in prop::collection::vec(event_strategy(), 0..24),
            batched in any::<bool>()
        ) {
            let start: ImmutableAggregateState<CounterProjection> =
                ImmutableAggregateState::new(CounterProjection, test_id(), None).apply_all(prefix);

            let mut mutable = start.to_mutable();
            if batched {
                mutable.apply_all(events.clone());
            } else {
                for event in events.iter().cloned() {
                    mutable.apply(event);
                }
            }

            let immutable = events.into_iter().fold(start.clone(), |agg, e| agg.apply(e));

            prop_assert_eq!(mutable.to_immutable(), immutable);
            prop_assert_eq!(start.to_mutable().into_immutable(), start);
        }
    }
}
