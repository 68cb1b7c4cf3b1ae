//! Modification counters and the shared notification gate
//!
//! One mutex guards every counter, and one condition variable is broadcast
//! on every publish regardless of which field changed. Waiters re-check
//! their own predicate after each wakeup, so wakeups for unrelated fields
//! and spurious wakeups are harmless.
//!
//! Each waiter compares the counters it wakes up to against a baseline.
//! A delta other than exactly one means the waiter slept across a publish
//! it never observed, which is reported as a contract violation.

use crate::error::{ObjectError, ObjectResult};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{error, trace};
use tso::consts::MAX_FIELDS;

static_assertions::const_assert!(MAX_FIELDS <= u64::BITS as usize);

/// Copy of every modification counter, taken atomically under the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    fields: heapless::Vec<u64, MAX_FIELDS>,
    total: u64,
}

impl CounterSnapshot {
    fn zeroed(size: usize) -> Self {
        Self {
            fields: std::iter::repeat_n(0, size.min(MAX_FIELDS)).collect(),
            total: 0,
        }
    }

    /// Per-field modification counts, in field order.
    pub fn fields(&self) -> &[u64] {
        &self.fields
    }

    /// Modification count of one field.
    pub fn field(&self, index: usize) -> Option<u64> {
        self.fields.get(index).copied()
    }

    /// Global modification count.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of fields covered.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the snapshot covers no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One field's counter movement between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldChange {
    /// Field index.
    pub field: usize,
    /// Number of publishes to the field since the baseline.
    pub delta: u64,
}

/// Every field that changed between a baseline and a wakeup.
///
/// Returned by the multi-producer wait, which does not require changes to
/// arrive one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFields {
    changes: heapless::Vec<FieldChange, MAX_FIELDS>,
    current: CounterSnapshot,
}

impl ChangedFields {
    /// Changed fields in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = FieldChange> + '_ {
        self.changes.iter().copied()
    }

    /// Whether `field` changed.
    pub fn contains(&self, field: usize) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }

    /// Bit `i` set when field `i` changed.
    pub fn mask(&self) -> u64 {
        self.changes.iter().fold(0, |mask, c| mask | (1 << c.field))
    }

    /// Number of changed fields.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Sum of all deltas.
    pub fn total_delta(&self) -> u64 {
        self.changes.iter().map(|c| c.delta).sum()
    }

    /// Counters at wakeup. Pass back in as the next baseline to keep
    /// observing without gaps.
    pub fn current(&self) -> &CounterSnapshot {
        &self.current
    }
}

/// Bound on a wait: absolute deadline plus the requested duration for
/// error reporting.
#[derive(Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    fn from_timeout(timeout: Option<Duration>) -> Option<Self> {
        timeout.map(|timeout| Self {
            at: Instant::now() + timeout,
            timeout,
        })
    }
}

/// Per-field and global modification counters behind one notification gate.
pub struct ChangeTracker {
    counters: Mutex<CounterSnapshot>,
    condition: Condvar,
    size: usize,
}

impl ChangeTracker {
    /// Create a tracker for `size` fields, all counters at zero.
    pub fn new(size: usize) -> ObjectResult<Self> {
        if size == 0 || size > MAX_FIELDS {
            return Err(ObjectError::InvalidFieldCount {
                count: size,
                max: MAX_FIELDS,
            });
        }
        Ok(Self::with_size(size))
    }

    /// Caller guarantees `1 <= size <= MAX_FIELDS`.
    pub(crate) fn with_size(size: usize) -> Self {
        Self {
            counters: Mutex::new(CounterSnapshot::zeroed(size)),
            condition: Condvar::new(),
            size,
        }
    }

    /// Number of tracked fields.
    pub fn field_count(&self) -> usize {
        self.size
    }

    /// Record one update of `index` and wake every waiter.
    ///
    /// Must be called after the field's value write has completed and its
    /// lock has been released.
    pub fn publish(&self, index: usize) -> ObjectResult<()> {
        self.check_index(index)?;
        self.bump(index);
        Ok(())
    }

    /// Caller guarantees `index < size`.
    pub(crate) fn bump(&self, index: usize) {
        let count = {
            let mut counters = self.counters.lock();
            counters.fields[index] += 1;
            counters.total += 1;
            self.condition.notify_all();
            counters.fields[index]
        };
        trace!(field = index, count, "published");
    }

    /// Current counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        self.counters.lock().clone()
    }

    /// Modification count of `index`.
    pub fn modification_count(&self, index: usize) -> ObjectResult<u64> {
        self.check_index(index)?;
        Ok(self.counters.lock().fields[index])
    }

    /// Global modification count.
    pub fn total_modification_count(&self) -> u64 {
        self.counters.lock().total
    }

    /// Block until the next publish of `index`.
    pub fn wait_for_update(&self, index: usize) -> ObjectResult<()> {
        self.wait_field(index, None, None)
    }

    /// [`wait_for_update`](Self::wait_for_update) with an upper bound.
    pub fn wait_for_update_timeout(&self, index: usize, timeout: Duration) -> ObjectResult<()> {
        self.wait_field(index, None, Some(timeout))
    }

    /// Block until the count of `index` moves past `baseline`.
    ///
    /// Returns immediately if it already has. The new count must be exactly
    /// `baseline + 1`.
    pub fn wait_for_update_since(
        &self,
        index: usize,
        baseline: u64,
        timeout: Option<Duration>,
    ) -> ObjectResult<()> {
        self.wait_field(index, Some(baseline), timeout)
    }

    /// Block until the next publish of any field; returns its index.
    pub fn wait_for_any_update(&self) -> ObjectResult<usize> {
        let mut counters = self.counters.lock();
        let baseline = counters.clone();
        self.wait_any(&mut counters, &baseline, None)
    }

    /// [`wait_for_any_update`](Self::wait_for_any_update) with an upper bound.
    pub fn wait_for_any_update_timeout(&self, timeout: Duration) -> ObjectResult<usize> {
        let mut counters = self.counters.lock();
        let baseline = counters.clone();
        self.wait_any(&mut counters, &baseline, Deadline::from_timeout(Some(timeout)))
    }

    /// Block until the global count moves past `baseline.total()`; returns
    /// the single field that changed.
    pub fn wait_for_any_update_since(
        &self,
        baseline: &CounterSnapshot,
        timeout: Option<Duration>,
    ) -> ObjectResult<usize> {
        self.check_snapshot(baseline)?;
        let mut counters = self.counters.lock();
        check_baseline(&counters, baseline)?;
        self.wait_any(&mut counters, baseline, Deadline::from_timeout(timeout))
    }

    /// Block until the global count moves past `baseline.total()`; returns
    /// every field that changed, however many and by however much.
    pub fn wait_for_any_updates_since(
        &self,
        baseline: &CounterSnapshot,
        timeout: Option<Duration>,
    ) -> ObjectResult<ChangedFields> {
        self.check_snapshot(baseline)?;
        let mut counters = self.counters.lock();
        check_baseline(&counters, baseline)?;
        self.wait_while(&mut counters, Deadline::from_timeout(timeout), |c| {
            c.total == baseline.total
        })?;

        let changes = counters
            .fields
            .iter()
            .zip(baseline.fields.iter())
            .enumerate()
            .filter_map(|(field, (now, then))| {
                let delta = now.saturating_sub(*then);
                (delta > 0).then_some(FieldChange { field, delta })
            })
            .collect();

        Ok(ChangedFields {
            changes,
            current: counters.clone(),
        })
    }

    fn wait_field(
        &self,
        index: usize,
        baseline: Option<u64>,
        timeout: Option<Duration>,
    ) -> ObjectResult<()> {
        self.check_index(index)?;
        let deadline = Deadline::from_timeout(timeout);

        let mut counters = self.counters.lock();
        let current = counters.fields[index];
        let baseline = match baseline {
            Some(baseline) if baseline > current => {
                return Err(ObjectError::BaselineAhead {
                    field: index,
                    baseline,
                    current,
                });
            }
            Some(baseline) => baseline,
            None => current,
        };
        self.wait_while(&mut counters, deadline, |c| c.fields[index] == baseline)?;

        let observed = counters.fields[index];
        let expected = baseline.saturating_add(1);
        if observed != expected {
            error!(field = index, expected, observed, "missed update");
            return Err(ObjectError::MissedUpdate {
                field: index,
                expected,
                observed,
            });
        }
        Ok(())
    }

    fn wait_any(
        &self,
        counters: &mut MutexGuard<'_, CounterSnapshot>,
        baseline: &CounterSnapshot,
        deadline: Option<Deadline>,
    ) -> ObjectResult<usize> {
        self.wait_while(counters, deadline, |c| c.total == baseline.total)?;

        let mut modified = None;
        for (field, (now, then)) in counters.fields.iter().zip(baseline.fields.iter()).enumerate() {
            match now.saturating_sub(*then) {
                0 => {}
                1 => {
                    if let Some(first) = modified {
                        error!(first, second = field, "multiple fields changed");
                        return Err(ObjectError::MultipleFieldsChanged {
                            first,
                            second: field,
                        });
                    }
                    modified = Some(field);
                }
                delta => {
                    error!(field, delta, "field skipped an update");
                    return Err(ObjectError::FieldSkipped { field, delta });
                }
            }
        }

        let expected = baseline.total.saturating_add(1);
        if counters.total != expected {
            error!(expected, observed = counters.total, "missed updates");
            return Err(ObjectError::MissedUpdates {
                expected,
                observed: counters.total,
            });
        }

        modified.ok_or_else(|| {
            error!("total advanced without a field change");
            ObjectError::NoFieldChanged
        })
    }

    /// Park on the gate while `pending` holds.
    fn wait_while<F>(
        &self,
        counters: &mut MutexGuard<'_, CounterSnapshot>,
        deadline: Option<Deadline>,
        mut pending: F,
    ) -> ObjectResult<()>
    where
        F: FnMut(&CounterSnapshot) -> bool,
    {
        while pending(&**counters) {
            match deadline {
                None => self.condition.wait(counters),
                Some(deadline) => {
                    if self.condition.wait_until(counters, deadline.at).timed_out()
                        && pending(&**counters)
                    {
                        return Err(ObjectError::Timeout {
                            timeout: deadline.timeout,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> ObjectResult<()> {
        if index >= self.size {
            return Err(ObjectError::InvalidField {
                index,
                size: self.size,
            });
        }
        Ok(())
    }

    fn check_snapshot(&self, snapshot: &CounterSnapshot) -> ObjectResult<()> {
        if snapshot.len() != self.size {
            return Err(ObjectError::SnapshotMismatch {
                snapshot_len: snapshot.len(),
                size: self.size,
            });
        }
        Ok(())
    }
}

/// A baseline can only trail the counters it was taken from.
fn check_baseline(current: &CounterSnapshot, baseline: &CounterSnapshot) -> ObjectResult<()> {
    let ahead = current
        .fields
        .iter()
        .zip(baseline.fields.iter())
        .position(|(now, then)| then > now);
    if let Some(field) = ahead {
        return Err(ObjectError::BaselineAhead {
            field,
            baseline: baseline.fields[field],
            current: current.fields[field],
        });
    }
    if baseline.total > current.total {
        return Err(ObjectError::TotalBaselineAhead {
            baseline: baseline.total,
            current: current.total,
        });
    }
    Ok(())
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("counters", &*self.counters.lock())
            .finish()
    }
}
