//! Shared multi-field object: typed field access plus change notification

use crate::config::{ObjectConfig, ViolationPolicy};
use crate::error::ObjectResult;
use crate::fields::{FieldAt, FieldStore, FieldTuple};
use crate::tracker::{ChangeTracker, ChangedFields, CounterSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Reference-counted handle shared by producer and consumer threads.
pub type SharedObject<R> = Arc<ThreadsafeObject<R>>;

/// A fixed set of independently locked fields with change notification.
///
/// Producers call [`set`](Self::set); consumers call [`get`](Self::get) or
/// block in one of the wait operations. `set` writes the value, releases the
/// field lock, and only then publishes to the notification gate, so a waiter
/// woken by a publish always reads that value or a newer one.
///
/// [`wait_for_any_update`](Self::wait_for_any_update) assumes writes to
/// different fields are serialized by the caller. Consumers of objects with
/// several independent producers should use
/// [`wait_for_any_updates_since`](Self::wait_for_any_updates_since).
///
/// ```rust
/// use tso_object::ThreadsafeObject;
///
/// const POSITION: usize = 0;
/// const CURRENT: usize = 1;
///
/// let object = ThreadsafeObject::new((0.0_f64, 0.0_f64));
/// object.set::<POSITION>(1.0);
/// assert_eq!(object.get::<POSITION>(), 1.0);
/// assert_eq!(object.modification_count(CURRENT), Some(0));
/// ```
pub struct ThreadsafeObject<R: FieldTuple> {
    store: FieldStore<R>,
    tracker: ChangeTracker,
    policy: ViolationPolicy,
}

impl<R: FieldTuple> ThreadsafeObject<R> {
    /// Create an object holding `initial`, reporting violations as errors.
    pub fn new(initial: R) -> Self {
        Self::with_config(initial, &ObjectConfig::default())
    }

    /// Create an object holding `initial` with explicit settings.
    pub fn with_config(initial: R, config: &ObjectConfig) -> Self {
        debug!(
            fields = R::SIZE,
            policy = ?config.violation_policy,
            "creating threadsafe object"
        );
        Self {
            store: FieldStore::new(initial),
            tracker: ChangeTracker::with_size(R::SIZE),
            policy: config.violation_policy,
        }
    }

    /// Wrap in an [`Arc`] for sharing across threads.
    pub fn into_shared(self) -> SharedObject<R> {
        Arc::new(self)
    }

    /// Number of fields.
    pub const fn field_count(&self) -> usize {
        R::SIZE
    }

    /// Violation handling in effect.
    pub fn violation_policy(&self) -> ViolationPolicy {
        self.policy
    }

    /// Copy of field `I`. Holds only that field's lock.
    #[inline]
    pub fn get<const I: usize>(&self) -> <R as FieldAt<I>>::Value
    where
        R: FieldAt<I>,
    {
        self.store.read::<I>()
    }

    /// Overwrite field `I` and wake every waiter.
    #[inline]
    pub fn set<const I: usize>(&self, value: <R as FieldAt<I>>::Value)
    where
        R: FieldAt<I>,
    {
        self.store.write::<I>(value);
        self.tracker.bump(I);
    }

    /// Block until the next `set` of field `I`.
    pub fn wait_for_update<const I: usize>(&self) -> ObjectResult<()>
    where
        R: FieldAt<I>,
    {
        self.enforce(self.tracker.wait_for_update(I))
    }

    /// [`wait_for_update`](Self::wait_for_update) bounded by `timeout`.
    pub fn wait_for_update_timeout<const I: usize>(&self, timeout: Duration) -> ObjectResult<()>
    where
        R: FieldAt<I>,
    {
        self.enforce(self.tracker.wait_for_update_timeout(I, timeout))
    }

    /// Block until field `I` moves past `baseline`, one publish at a time.
    pub fn wait_for_update_since<const I: usize>(
        &self,
        baseline: u64,
        timeout: Option<Duration>,
    ) -> ObjectResult<()>
    where
        R: FieldAt<I>,
    {
        self.enforce(self.tracker.wait_for_update_since(I, baseline, timeout))
    }

    /// Block until the next `set` of any field; returns the field index.
    pub fn wait_for_any_update(&self) -> ObjectResult<usize> {
        self.enforce(self.tracker.wait_for_any_update())
    }

    /// [`wait_for_any_update`](Self::wait_for_any_update) bounded by `timeout`.
    pub fn wait_for_any_update_timeout(&self, timeout: Duration) -> ObjectResult<usize> {
        self.enforce(self.tracker.wait_for_any_update_timeout(timeout))
    }

    /// Block until any field moves past `baseline`; exactly one field must
    /// have changed, by exactly one.
    pub fn wait_for_any_update_since(
        &self,
        baseline: &CounterSnapshot,
        timeout: Option<Duration>,
    ) -> ObjectResult<usize> {
        self.enforce(self.tracker.wait_for_any_update_since(baseline, timeout))
    }

    /// Block until any field moves past `baseline`; returns every change.
    ///
    /// Never reports a violation, so it is safe with concurrent producers.
    pub fn wait_for_any_updates_since(
        &self,
        baseline: &CounterSnapshot,
        timeout: Option<Duration>,
    ) -> ObjectResult<ChangedFields> {
        self.tracker.wait_for_any_updates_since(baseline, timeout)
    }

    /// Current modification counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        self.tracker.snapshot()
    }

    /// Number of `set` calls on field `index` so far.
    pub fn modification_count(&self, index: usize) -> Option<u64> {
        self.tracker.modification_count(index).ok()
    }

    /// Number of `set` calls on any field so far.
    pub fn total_modification_count(&self) -> u64 {
        self.tracker.total_modification_count()
    }

    fn enforce<T>(&self, result: ObjectResult<T>) -> ObjectResult<T> {
        match result {
            Err(err) if err.is_violation() && self.policy == ViolationPolicy::Abort => {
                error!(error = %err, "threadsafe object contract violated, aborting");
                std::process::abort();
            }
            other => other,
        }
    }
}

impl<R: FieldTuple + Default> Default for ThreadsafeObject<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

impl<R: FieldTuple> std::fmt::Debug for ThreadsafeObject<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadsafeObject")
            .field("fields", &R::SIZE)
            .field("tracker", &self.tracker)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObjectError;
    use std::thread;

    const POSITION: usize = 0;
    const CURRENT: usize = 1;

    #[test]
    fn test_get_after_set() {
        let object = ThreadsafeObject::new((0.0_f64, 0_u32, false));
        object.set::<0>(3.5);
        assert_eq!(object.get::<0>(), 3.5);
        object.set::<1>(9);
        assert_eq!(object.get::<1>(), 9);
        object.set::<2>(true);
        assert!(object.get::<2>());
    }

    #[test]
    fn test_counts_follow_sets() {
        let object: ThreadsafeObject<(f64, f64)> = ThreadsafeObject::default();
        object.set::<POSITION>(1.0);
        object.set::<CURRENT>(2.0);
        object.set::<CURRENT>(3.0);

        assert_eq!(object.modification_count(POSITION), Some(1));
        assert_eq!(object.modification_count(CURRENT), Some(2));
        assert_eq!(object.modification_count(7), None);
        assert_eq!(object.total_modification_count(), 3);
    }

    #[test]
    fn test_wait_for_update_sees_value() {
        let object = ThreadsafeObject::new((0.0_f64, 0.0_f64)).into_shared();
        let baseline = object.snapshot();

        let consumer = Arc::clone(&object);
        let handle = thread::spawn(move || {
            consumer
                .wait_for_update_since::<CURRENT>(baseline.field(CURRENT).unwrap_or(0), None)
                .map(|()| consumer.get::<CURRENT>())
        });

        object.set::<CURRENT>(2.0);
        assert_eq!(handle.join().unwrap(), Ok(2.0));
    }

    #[test]
    fn test_single_field_any_update() {
        let object = ThreadsafeObject::new((0_u64,));
        for value in 1..=5 {
            let baseline = object.snapshot();
            object.set::<0>(value);
            assert_eq!(object.wait_for_any_update_since(&baseline, None), Ok(0));
        }
    }

    #[test]
    fn test_report_policy_returns_violation() {
        let object = ThreadsafeObject::new((0_u8, 0_u8));
        let baseline = object.snapshot();
        object.set::<0>(1);
        object.set::<1>(1);

        let result = object.wait_for_any_update_since(&baseline, None);
        assert!(matches!(
            result,
            Err(ObjectError::MultipleFieldsChanged { first: 0, second: 1 })
        ));

        let changed = object.wait_for_any_updates_since(&baseline, None).unwrap();
        assert_eq!(changed.mask(), 0b11);
    }

    #[test]
    fn test_timeout_variant() {
        let object = ThreadsafeObject::new((0_i32, 0_i32));
        let timeout = Duration::from_millis(20);
        assert_eq!(
            object.wait_for_update_timeout::<POSITION>(timeout),
            Err(ObjectError::Timeout { timeout })
        );
        assert_eq!(
            object.wait_for_any_update_timeout(timeout),
            Err(ObjectError::Timeout { timeout })
        );
    }

    #[test]
    fn test_config_sets_policy() {
        let config = ObjectConfig {
            violation_policy: ViolationPolicy::Abort,
        };
        let object = ThreadsafeObject::with_config((0_u8,), &config);
        assert_eq!(object.violation_policy(), ViolationPolicy::Abort);
        assert_eq!(object.field_count(), 1);
    }

    #[test]
    fn test_abort_policy_returns_baseline_errors() {
        let config = ObjectConfig {
            violation_policy: ViolationPolicy::Abort,
        };
        let object = ThreadsafeObject::with_config((0_u8, 0_u8), &config);
        let other = ThreadsafeObject::new((0_u8, 0_u8));
        other.set::<POSITION>(1);
        other.set::<POSITION>(2);

        assert_eq!(
            object.wait_for_update_since::<POSITION>(2, Some(Duration::from_millis(20))),
            Err(ObjectError::BaselineAhead {
                field: POSITION,
                baseline: 2,
                current: 0
            })
        );
        assert!(matches!(
            object.wait_for_any_update_since(&other.snapshot(), None),
            Err(ObjectError::BaselineAhead { field: POSITION, .. })
        ));
        assert!(matches!(
            object.wait_for_any_updates_since(&other.snapshot(), None),
            Err(ObjectError::BaselineAhead { field: POSITION, .. })
        ));
    }
}
