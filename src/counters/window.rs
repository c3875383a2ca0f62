//! Sliding-window rate counter.
//!
//! This module provides [`WindowCounter`], which answers "how much weight was
//! added in the last `interval`?" without remembering individual events.
//!
//! # Design
//!
//! The interval is split into `resolution` buckets of `interval / resolution`
//! each. Increments land in the current bucket and in a running total. While
//! the total is non-zero a decay task wakes once per bucket length, moves
//! `current` forward and subtracts whatever the bucket it lands on still
//! holds, which is what was added one full interval earlier.
//!
//! Background work is therefore bounded by `resolution` wake-ups per interval
//! no matter how many events arrive, and drops to nothing once the window
//! empties: the task stops itself and the next increment starts a new one.
//!
//! Higher resolutions decay more smoothly. With `resolution == 1` everything
//! added during an interval disappears in one step at its end.
//!
//! # Examples
//!
//! ```rust
//! use finestre::counters::window::WindowCounter;
//! use std::time::Duration;
//!
//! let counter = WindowCounter::new(Duration::from_secs(60)).with_name("requests");
//!
//! counter.increment(1);
//! counter.increment(3);
//! assert_eq!(counter.rate(), 4);
//! assert_eq!(counter.max_rate(), 4);
//! assert_eq!(counter.to_string(), "4");
//! ```

use std::fmt::{self, Debug, Display};
use std::sync::atomic::{fence, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use atomic_time::AtomicOptionInstant;
use tracing::{debug, error, trace};

use crate::counters::atomic::AtomicCounter;
use crate::counters::decay::{self, DecayState, DecaySwitch};
use crate::counters::{CounterValue, Observable};
use crate::error::{check_resolution, Result};

/// Number of buckets used when no resolution is given.
pub const DEFAULT_RESOLUTION: usize = 20;

/// Callback invoked when a window empties and its decay task stops.
pub type IdleCallback = Arc<dyn Fn(&WindowCounter) + Send + Sync + 'static>;

/// State shared between the handles of one window and its decay task.
struct Window {
    name: &'static str,
    interval: Duration,
    step: Duration,
    buckets: Box<[AtomicCounter]>,
    current: AtomicUsize,
    total: AtomicCounter,
    max_observed: AtomicCounter,
    decay: DecaySwitch,
    last_rotation: AtomicOptionInstant,
    on_idle: RwLock<Vec<IdleCallback>>,
}

/// A thread-safe sliding-window counter.
///
/// `WindowCounter` is a handle: cloning it is cheap and every clone observes
/// and updates the same window. It is `Send + Sync`.
///
/// # Reads are approximate
///
/// [`rate`](Self::rate) is exact up to bucket quantization: an increment
/// expires between `interval - interval / resolution` and `interval` after it
/// was made. An increment racing the eviction of its own bucket may be
/// dropped from the window early. Both are accepted for a statistical counter.
///
/// # Background threads
///
/// Each window with a non-zero total owns one OS thread that wakes every
/// `interval / resolution`. Idle windows own none. The thread holds only a
/// weak reference, so once every handle is dropped it exits at its next
/// wake-up. Until then it stays parked: with a one-hour interval and
/// `resolution == 1` that can be up to an hour after the drop.
///
/// # Examples
///
/// Watching a window drain:
///
/// ```rust
/// use finestre::counters::window::WindowCounter;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// let counter = WindowCounter::new(Duration::from_millis(20));
/// let idles = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&idles);
/// counter.on_idle(move |_| {
///     seen.fetch_add(1, Ordering::SeqCst);
/// });
///
/// counter.increment(2);
/// thread::sleep(Duration::from_millis(200));
///
/// assert_eq!(counter.rate(), 0);
/// assert_eq!(idles.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct WindowCounter {
    inner: Arc<Window>,
}

impl WindowCounter {
    /// Creates a window over `interval` with [`DEFAULT_RESOLUTION`] buckets.
    ///
    /// A zero interval is allowed: increments then decay on the next tick.
    pub fn new(interval: Duration) -> Self {
        Self::build("", interval, DEFAULT_RESOLUTION as u32, Vec::new())
    }

    /// Creates a window over `interval` split into `resolution` buckets.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidConfiguration`](crate::WindowError) if
    /// `resolution` is zero or exceeds [`MAX_RESOLUTION`](crate::MAX_RESOLUTION).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use finestre::counters::window::WindowCounter;
    /// use std::time::Duration;
    ///
    /// let counter = WindowCounter::new_with_resolution(Duration::from_secs(10), 100)?;
    /// assert_eq!(counter.resolution(), 100);
    ///
    /// assert!(WindowCounter::new_with_resolution(Duration::from_secs(10), 0).is_err());
    /// # Ok::<(), finestre::WindowError>(())
    /// ```
    pub fn new_with_resolution(interval: Duration, resolution: usize) -> Result<Self> {
        let resolution = check_resolution(resolution)?;
        Ok(Self::build("", interval, resolution, Vec::new()))
    }

    fn build(
        name: &'static str,
        interval: Duration,
        resolution: u32,
        on_idle: Vec<IdleCallback>,
    ) -> Self {
        let buckets = (0..resolution).map(|_| AtomicCounter::new()).collect();
        WindowCounter {
            inner: Arc::new(Window {
                name,
                interval,
                step: interval / resolution,
                buckets,
                current: AtomicUsize::new(0),
                total: AtomicCounter::new(),
                max_observed: AtomicCounter::new(),
                decay: DecaySwitch::new(),
                last_rotation: AtomicOptionInstant::none(),
                on_idle: RwLock::new(on_idle),
            }),
        }
    }

    /// Rebuilds the window with `resolution` buckets, keeping its interval,
    /// name and idle callbacks.
    ///
    /// Meant to be chained right after construction. Counts already recorded
    /// are not carried over, and other clones of this handle keep the old
    /// window.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidConfiguration`](crate::WindowError) if
    /// `resolution` is zero or exceeds [`MAX_RESOLUTION`](crate::MAX_RESOLUTION).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use finestre::counters::window::WindowCounter;
    /// use std::time::Duration;
    ///
    /// let counter = WindowCounter::new(Duration::from_secs(1)).with_resolution(1)?;
    /// assert_eq!(counter.resolution(), 1);
    /// # Ok::<(), finestre::WindowError>(())
    /// ```
    pub fn with_resolution(self, resolution: usize) -> Result<Self> {
        let resolution = check_resolution(resolution)?;
        Ok(Self::build(
            self.inner.name,
            self.inner.interval,
            resolution,
            self.idle_callbacks(),
        ))
    }

    /// Sets the name of this counter, returning the renamed counter.
    ///
    /// Like [`with_resolution`](Self::with_resolution) this builds a fresh
    /// window, so use it before recording anything.
    pub fn with_name(self, name: &'static str) -> Self {
        Self::build(
            name,
            self.inner.interval,
            self.inner.buckets.len() as u32,
            self.idle_callbacks(),
        )
    }

    /// Returns an empty window with this one's name, interval and resolution,
    /// moving the idle callbacks over to it.
    ///
    /// This window keeps counting but no longer fires any callback.
    pub(crate) fn succeed(&self) -> Self {
        Self::build(
            self.inner.name,
            self.inner.interval,
            self.inner.buckets.len() as u32,
            self.take_idle_callbacks(),
        )
    }

    /// Adds `weight` to the window. Negative weights are allowed.
    ///
    /// Never blocks: if the decay task is idle a new one is spawned and this
    /// call returns without waiting for it.
    #[inline]
    pub fn increment(&self, weight: i64) {
        let window = &*self.inner;
        let total = window.total.add_and_get(weight);
        window.buckets[window.current.load(Ordering::Relaxed)].add(weight);
        window.max_observed.observe_max(total);

        // Pairs with the fence in `rotate`: either this call sees `Idle`, or
        // the task going idle sees the new total.
        fence(Ordering::SeqCst);
        if window.decay.state() == DecayState::Idle && window.decay.try_start() {
            self.start_decay();
        }
    }

    /// Returns the total weight added during roughly the last interval.
    #[inline]
    pub fn rate(&self) -> i64 {
        self.inner.total.value()
    }

    /// Returns the highest [`rate`](Self::rate) observed since the window
    /// was last empty.
    ///
    /// Unlike `rate`, this does not fade: it keeps its peak until the window
    /// drains completely, then starts again from zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use finestre::counters::window::WindowCounter;
    /// use std::time::Duration;
    ///
    /// let counter = WindowCounter::new(Duration::from_secs(60));
    /// counter.increment(10);
    /// counter.increment(-4);
    /// assert_eq!(counter.rate(), 6);
    /// assert_eq!(counter.max_rate(), 10);
    /// ```
    #[inline]
    pub fn max_rate(&self) -> i64 {
        self.inner.max_observed.value()
    }

    /// Registers a callback fired each time the window empties and its
    /// decay task stops.
    ///
    /// Callbacks accumulate and run in registration order on the decay
    /// thread, receiving the window that went idle. A typical use is evicting
    /// the counter from a registry keyed by some identifier.
    pub fn on_idle<F>(&self, callback: F)
    where
        F: Fn(&WindowCounter) + Send + Sync + 'static,
    {
        self.inner
            .on_idle
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Returns the length of the window.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Returns the number of buckets the window is split into.
    pub fn resolution(&self) -> usize {
        self.inner.buckets.len()
    }

    /// Returns `true` while a decay task is active for this window.
    pub fn is_running(&self) -> bool {
        self.inner.decay.state() == DecayState::Running
    }

    /// Returns when the decay task last rotated the buckets, if ever.
    ///
    /// [`rate`](Self::rate) can be stale by at most the time elapsed since.
    pub fn last_rotation(&self) -> Option<Instant> {
        self.inner.last_rotation.load(Ordering::Relaxed)
    }

    pub(crate) fn static_name(&self) -> &'static str {
        self.inner.name
    }

    fn idle_callbacks(&self) -> Vec<IdleCallback> {
        self.inner
            .on_idle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_idle_callbacks(&self) -> Vec<IdleCallback> {
        std::mem::take(
            &mut *self
                .inner
                .on_idle
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn start_decay(&self) {
        let window = Arc::downgrade(&self.inner);
        let step = self.inner.step;
        debug!(
            counter = self.inner.name,
            interval = ?self.inner.interval,
            ?step,
            "decay task started"
        );
        if let Err(err) = decay::spawn(step, move || Self::tick(&window)) {
            error!(
                counter = self.inner.name,
                error = %err,
                "failed to spawn decay task"
            );
            self.inner.decay.stop();
        }
    }

    /// One wake-up of the decay task. Returns `false` once the task should exit.
    fn tick(window: &Weak<Window>) -> bool {
        match window.upgrade() {
            Some(inner) => WindowCounter { inner }.rotate(),
            None => {
                trace!("window dropped, decay task exiting");
                false
            }
        }
    }

    /// Advances `current` and evicts the bucket it lands on.
    fn rotate(&self) -> bool {
        let window = &*self.inner;
        let next = (window.current.load(Ordering::Relaxed) + 1) % window.buckets.len();
        window.current.store(next, Ordering::Relaxed);

        let expired = window.buckets[next].value_and_reset();
        if expired != 0 {
            window.total.add(-expired);
        }
        window.last_rotation.store(Some(Instant::now()), Ordering::Relaxed);
        trace!(counter = window.name, bucket = next, expired, "rotated");

        if window.total.value() != 0 {
            return true;
        }
        self.go_idle(next)
    }

    /// Switches an emptied window to `Idle` and fires the idle callbacks.
    /// Returns `true` if a racing increment kept the task alive instead.
    fn go_idle(&self, current: usize) -> bool {
        let window = &*self.inner;

        // Offsetting weights can leave the total at zero with non-empty
        // buckets; fold them into the current one so the ring still sums to
        // the total.
        let residue: i64 = window.buckets.iter().map(|b| b.value_and_reset()).sum();
        if residue != 0 {
            window.buckets[current].add(residue);
        }

        window.max_observed.reset();
        window.decay.stop();
        fence(Ordering::SeqCst);
        if window.total.value() != 0 {
            // An increment raced the transition. Keep going unless it already
            // started a task of its own.
            trace!(counter = window.name, "increment raced idle transition");
            window.max_observed.observe_max(window.total.value());
            return window.decay.try_start();
        }

        debug!(counter = window.name, "window idle, decay task stopped");
        for callback in self.idle_callbacks() {
            callback(self);
        }
        false
    }
}

impl Observable for WindowCounter {
    #[inline]
    fn name(&self) -> &str {
        self.static_name()
    }

    #[inline]
    fn value(&self) -> CounterValue {
        CounterValue::Signed(self.rate())
    }
}

impl Display for WindowCounter {
    /// Formats the current rate as a decimal integer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rate())
    }
}

impl Debug for WindowCounter {
    /// Formats the counter showing non-zero buckets.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let window = &*self.inner;
        write!(f, "{}{{", window.name)?;
        for (i, bucket) in window.buckets.iter().enumerate() {
            let val = bucket.value();
            if val != 0 {
                write!(f, " [{i}]:{val}")?;
            }
        }
        write!(
            f,
            " | total:{} max:{} }}",
            window.total.value(),
            window.max_observed.value()
        )
    }
}
