//! Single-cell signed counter.
//!
//! This module provides [`AtomicCounter`], the value cell every window is
//! built from: one bucket of the ring, the running total and the running
//! maximum are all `AtomicCounter`s.

use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicI64, Ordering};

use crossbeam_utils::CachePadded;

use crate::counters::{CounterValue, Observable};

/// A signed 64-bit counter with lock-free updates.
///
/// The cell is wrapped in [`CachePadded`] so that neighbouring buckets of a
/// window, which are updated by different threads at different times, never
/// share a cache line.
///
/// All operations use `Ordering::Relaxed`: a counter is a statistic and does
/// not publish other memory. Windows that need a stronger hand-off add their
/// own fences.
///
/// # Examples
///
/// ```rust
/// use finestre::counters::atomic::AtomicCounter;
///
/// let counter = AtomicCounter::new();
/// counter.add(10);
/// counter.add(-15);
/// assert_eq!(counter.value(), -5);
///
/// counter.reset();
/// assert_eq!(counter.value(), 0);
/// ```
pub struct AtomicCounter {
    value: CachePadded<AtomicI64>,
}

impl AtomicCounter {
    /// Creates a new counter initialized to zero.
    pub const fn new() -> Self {
        AtomicCounter {
            value: CachePadded::new(AtomicI64::new(0)),
        }
    }

    /// Adds `delta` to the counter (can be negative).
    #[inline]
    pub fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    /// Adds `delta` and returns the updated value.
    #[inline]
    pub(crate) fn add_and_get(&self, delta: i64) -> i64 {
        self.value
            .fetch_add(delta, Ordering::Relaxed)
            .wrapping_add(delta)
    }

    /// Returns the current value.
    #[inline]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Sets the counter back to zero.
    #[inline]
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }

    /// Returns the current value and sets the counter to zero in one step.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use finestre::counters::atomic::AtomicCounter;
    ///
    /// let counter = AtomicCounter::new();
    /// counter.add(7);
    /// assert_eq!(counter.value_and_reset(), 7);
    /// assert_eq!(counter.value(), 0);
    /// ```
    #[inline]
    pub fn value_and_reset(&self) -> i64 {
        self.value.swap(0, Ordering::Relaxed)
    }

    /// Raises the counter to `candidate` if `candidate` is greater.
    ///
    /// Uses a compare-and-swap loop that gives up as soon as the stored value
    /// is already at least `candidate`, so the common case is a single load.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use finestre::counters::atomic::AtomicCounter;
    ///
    /// let peak = AtomicCounter::new();
    /// peak.observe_max(100);
    /// peak.observe_max(150);
    /// peak.observe_max(75);
    /// assert_eq!(peak.value(), 150);
    /// ```
    #[inline]
    pub fn observe_max(&self, candidate: i64) {
        let mut current = self.value.load(Ordering::Relaxed);
        while candidate > current {
            match self.value.compare_exchange_weak(
                current,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Observable for AtomicCounter {
    #[inline]
    fn name(&self) -> &str {
        ""
    }

    #[inline]
    fn value(&self) -> CounterValue {
        CounterValue::Signed(AtomicCounter::value(self))
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for AtomicCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomicCounter({})", self.value())
    }
}

impl Display for AtomicCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
