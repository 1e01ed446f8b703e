use std::sync::Arc;

use im::Vector;
use sourcefold_core::AggregateId;

use crate::state::fold_events;
use crate::{AggregateProjection, AggregateState, MutableAggregateState};

/// Persistent (copy-on-write) aggregate state.
///
/// Every `apply` returns a **new** instance and leaves `self` untouched, so any instance can
/// be kept around as a snapshot of the lineage at that point. Instances share structure:
/// the projection and the states sit behind `Arc`, and the applied events live in an
/// [`im::Vector`], whose clones are O(1) and whose appends copy only a path of the tree.
///
/// Sharing an instance across threads is safe when the projection, state and event types are
/// `Send + Sync`; nothing reachable from an instance is ever mutated.
pub struct ImmutableAggregateState<P: AggregateProjection> {
    projection: Arc<P>,
    id: AggregateId,
    original_state: Option<Arc<P::State>>,
    state: Option<Arc<P::State>>,
    events: Vector<P::Event>,
}

impl<P> ImmutableAggregateState<P>
where
    P: AggregateProjection,
    P::Event: Clone,
{
    /// Start a new lineage from a freshly loaded baseline, with no applied events.
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
            events: Vector::new(),
        }
    }

    pub(crate) fn from_parts(
        projection: Arc<P>,
        id: AggregateId,
        original_state: Option<Arc<P::State>>,
        state: Option<Arc<P::State>>,
        events: Vector<P::Event>,
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

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn original_state(&self) -> Option<&P::State> {
        self.original_state.as_deref()
    }

    pub fn state(&self) -> Option<&P::State> {
        self.state.as_deref()
    }

    pub fn events(&self) -> &Vector<P::Event> {
        &self.events
    }

    /// Apply one event, returning the extended lineage.
    pub fn apply(&self, event: P::Event) -> Self {
        let state = fold_events(
            &*self.projection,
            &self.id,
            self.state.clone(),
            std::slice::from_ref(&event),
        );

        let mut events = self.events.clone();
        events.push_back(event);
        self.extend_with(state, events)
    }

    /// Apply events in order, returning the extended lineage.
    ///
    /// Equivalent to chaining [`ImmutableAggregateState::apply`] once per event. An empty
    /// sequence returns an instance equal to `self`.
    pub fn apply_all(&self, events: impl IntoIterator<Item = P::Event>) -> Self {
        let batch: Vec<P::Event> = events.into_iter().collect();
        if batch.is_empty() {
            return self.clone();
        }

        let state = fold_events(&*self.projection, &self.id, self.state.clone(), &batch);

        let mut events = self.events.clone();
        events.extend(batch);
        self.extend_with(state, events)
    }

    /// Copy this snapshot into a mutable container.
    ///
    /// The two are independent afterwards: mutating the result never shows through `self`.
    pub fn to_mutable(&self) -> MutableAggregateState<P> {
        MutableAggregateState::from_parts(
            Arc::clone(&self.projection),
            self.id.clone(),
            self.original_state.clone(),
            self.state.clone(),
            self.events.iter().cloned().collect(),
        )
    }

    fn extend_with(&self, state: Option<Arc<P::State>>, events: Vector<P::Event>) -> Self {
        Self::from_parts(
            Arc::clone(&self.projection),
            self.id.clone(),
            self.original_state.clone(),
            state,
            events,
        )
    }
}

impl<P> AggregateState for ImmutableAggregateState<P>
where
    P: AggregateProjection,
    P::Event: Clone,
{
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

impl<P> Clone for ImmutableAggregateState<P>
where
    P: AggregateProjection,
    P::Event: Clone,
{
    fn clone(&self) -> Self {
        Self {
            projection: Arc::clone(&self.projection),
            id: self.id.clone(),
            original_state: self.original_state.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
        }
    }
}

/// Equality ignores the projection: two lineages are equal when they carry the same id,
/// baseline, current state and applied events.
impl<P> PartialEq for ImmutableAggregateState<P>
where
    P: AggregateProjection,
    P::State: PartialEq,
    P::Event: Clone + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.original_state == other.original_state
            && self.state == other.state
            && self.events == other.events
    }
}

impl<P> core::fmt::Debug for ImmutableAggregateState<P>
where
    P: AggregateProjection,
    P::State: core::fmt::Debug,
    P::Event: Clone + core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImmutableAggregateState")
            .field("id", &self.id)
            .field("original_state", &self.original_state)
            .field("state", &self.state)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Counter, CounterEvent, CounterProjection, test_id};

    fn fresh(original: Option<Counter>) -> ImmutableAggregateState<CounterProjection> {
        ImmutableAggregateState::new(CounterProjection, test_id(), original)
    }

    #[test]
    fn new_lineage_has_no_events_and_current_equals_original() {
        let baseline = Counter { count: 4, applied: 2 };
        let agg = fresh(Some(baseline.clone()));

        assert_eq!(agg.id(), &test_id());
        assert_eq!(agg.original_state(), Some(&baseline));
        assert_eq!(agg.state(), Some(&baseline));
        assert!(agg.events().is_empty());
        assert!(!agg.has_pending_events());
    }

    #[test]
    fn never_existed_aggregate_has_no_state() {
        let agg = fresh(None);
        assert_eq!(agg.original_state(), None);
        assert_eq!(agg.state(), None);
        assert!(!agg.exists());
    }

    #[test]
    fn absent_baseline_creation() {
        let agg = fresh(None).apply_all([CounterEvent::Created, CounterEvent::Incremented]);

        assert_eq!(agg.state().map(|c| c.count), Some(1));
        assert_eq!(
            agg.events().iter().cloned().collect::<Vec<_>>(),
            vec![CounterEvent::Created, CounterEvent::Incremented]
        );
        assert_eq!(agg.original_state(), None);
        assert!(agg.exists());
    }

    #[test]
    fn apply_leaves_predecessor_untouched() {
        let a1 = fresh(Some(Counter::default())).apply(CounterEvent::Incremented);
        let a2 = a1.apply(CounterEvent::Adjusted(10));

        assert_eq!(a1.state().map(|c| c.count), Some(1));
        assert_eq!(a1.events().len(), 1);

        assert_eq!(a2.state().map(|c| c.count), Some(11));
        assert_eq!(a2.original_state(), a1.original_state());
        assert_eq!(a2.events().len(), 2);
        assert_eq!(a2.events().last(), Some(&CounterEvent::Adjusted(10)));
        assert_eq!(&a2.events().take(1), a1.events());
    }

    #[test]
    fn lineages_branch_independently() {
        let base = fresh(None).apply(CounterEvent::Created);
        let left = base.apply(CounterEvent::Incremented);
        let right = base.apply(CounterEvent::Reset);

        assert_eq!(left.state().map(|c| c.count), Some(1));
        assert_eq!(right.state().map(|c| c.count), Some(0));
        assert_eq!(base.events().len(), 1);
    }

    #[test]
    fn first_apply_folds_over_the_baseline() {
        let agg = fresh(Some(Counter { count: 9, applied: 9 })).apply(CounterEvent::Incremented);
        assert_eq!(agg.state(), Some(&Counter { count: 10, applied: 10 }));
    }

    #[test]
    fn batch_apply_equals_chained_apply() {
        let events = vec![
            CounterEvent::Created,
            CounterEvent::Adjusted(5),
            CounterEvent::Incremented,
            CounterEvent::Reset,
            CounterEvent::Incremented,
        ];

        let batched = fresh(None).apply_all(events.clone());
        let chained = events
            .into_iter()
            .fold(fresh(None), |agg, event| agg.apply(event));

        assert_eq!(batched, chained);
    }

    #[test]
    fn empty_apply_is_a_no_op() {
        let agg = fresh(Some(Counter::default())).apply(CounterEvent::Incremented);
        let same = agg.apply_all(Vec::new());
        assert_eq!(same, agg);
    }

    #[test]
    fn to_mutable_is_detached_snapshot() {
        let agg = fresh(None).apply(CounterEvent::Created);
        let mut mutable = agg.to_mutable();
        mutable.apply(CounterEvent::Incremented);

        assert_eq!(agg.events().len(), 1);
        assert_eq!(agg.state().map(|c| c.count), Some(0));
        assert_eq!(mutable.applied_count(), 2);
        assert_eq!(mutable.state().map(|c| c.count), Some(1));
    }

    #[test]
    fn snapshots_can_be_read_from_other_threads() {
        let agg = fresh(None).apply_all([CounterEvent::Created, CounterEvent::Incremented]);
        let shared = agg.clone();

        let handle = std::thread::spawn(move || shared.state().map(|c| c.count));
        assert_eq!(handle.join().unwrap(), Some(1));
        assert_eq!(agg.state().map(|c| c.count), Some(1));
    }

    struct Tally(u32);

    #[derive(Debug, Clone)]
    struct Tick;

    struct TallyProjection;

    impl AggregateProjection for TallyProjection {
        type State = Tally;
        type Event = Tick;

        fn apply(&self, _id: &AggregateId, state: Option<&Tally>, _event: &Tick) -> Tally {
            Tally(state.map_or(0, |t| t.0) + 1)
        }
    }

    #[test]
    fn clone_shares_state_that_is_not_itself_clone() {
        let agg: ImmutableAggregateState<TallyProjection> =
            ImmutableAggregateState::new(TallyProjection, test_id(), None);
        let agg = agg.apply_all([Tick, Tick]);

        let copy = agg.clone();
        let advanced = copy.apply(Tick);

        assert_eq!(copy.events().len(), 2);
        assert_eq!(copy.state().map(|t| t.0), Some(2));
        assert_eq!(advanced.state().map(|t| t.0), Some(3));
        assert_eq!(agg.state().map(|t| t.0), Some(2));
    }
}
