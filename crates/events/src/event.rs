/// A domain event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **never rejected** once they exist (validation happens at command time)
/// - designed to be **append-only**
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "counter.incremented").
    fn event_type(&self) -> &'static str;
}
