//! Hot-swappable wrapper for window counters.
//!
//! This module provides [`SwappableWindowCounter`], which holds a
//! [`WindowCounter`] behind an atomically replaceable pointer so that the
//! window can be reset in place while other threads keep using the wrapper.
//!
//! # Example
//!
//! ```rust
//! use finestre::adapters::SwappableWindowCounter;
//! use std::time::Duration;
//!
//! let counter = SwappableWindowCounter::new(Duration::from_secs(60));
//! counter.increment(2);
//! assert_eq!(counter.rate(), 2);
//!
//! // Discard the history, keep the configuration
//! counter.reset();
//! assert_eq!(counter.rate(), 0);
//!
//! counter.increment(3);
//! assert_eq!(counter.rate(), 3);
//! ```

use std::fmt::{self, Debug, Display};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::counters::window::WindowCounter;
use crate::counters::{CounterValue, Observable};
use crate::error::Result;

/// A window counter that can be atomically replaced by a fresh one.
///
/// Every operation reads the installed window through a lock-free atomic
/// load and never blocks on a concurrent [`reset`](Self::reset). This costs
/// one extra indirection per call compared to using a [`WindowCounter`]
/// directly.
///
/// Idle callbacks belong to the wrapper: `reset` moves them to the new
/// window, so the replaced one never fires them. Its decay task, if still
/// running, winds down on its own: nothing reaches it any more, so its total
/// drains to zero within one interval.
///
/// # Example
///
/// ```rust
/// use finestre::adapters::SwappableWindowCounter;
/// use finestre::counters::window::WindowCounter;
/// use std::time::Duration;
///
/// let window = WindowCounter::new(Duration::from_secs(1)).with_name("sessions");
/// let counter = SwappableWindowCounter::from(window);
///
/// counter.increment(1);
/// counter.reset();
///
/// let installed = counter.current();
/// assert_eq!(installed.rate(), 0);
/// assert_eq!(installed.interval(), Duration::from_secs(1));
/// ```
pub struct SwappableWindowCounter {
    current: ArcSwap<WindowCounter>,
    // Serializes `reset` and `on_idle`, so a callback is never registered on
    // a window whose callbacks were already moved.
    swapping: Mutex<()>,
}

impl SwappableWindowCounter {
    /// Creates a swappable window over `interval` with the default resolution.
    pub fn new(interval: Duration) -> Self {
        Self::from(WindowCounter::new(interval))
    }

    /// Creates a swappable window over `interval` split into `resolution` buckets.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidConfiguration`](crate::WindowError) under
    /// the same conditions as [`WindowCounter::new_with_resolution`].
    pub fn new_with_resolution(interval: Duration, resolution: usize) -> Result<Self> {
        Ok(Self::from(WindowCounter::new_with_resolution(
            interval, resolution,
        )?))
    }

    /// Rebuilds the installed window with `resolution` buckets.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidConfiguration`](crate::WindowError) if
    /// `resolution` is zero or too large.
    pub fn with_resolution(self, resolution: usize) -> Result<Self> {
        Ok(Self::from(self.current().with_resolution(resolution)?))
    }

    /// Sets the name of the installed window, returning `self` for chaining.
    pub fn with_name(self, name: &'static str) -> Self {
        Self::from(self.current().with_name(name))
    }

    /// Returns a handle to the currently installed window.
    ///
    /// The handle stays valid after a [`reset`](Self::reset) but keeps
    /// pointing at the window it was taken from.
    pub fn current(&self) -> WindowCounter {
        WindowCounter::clone(&self.current.load())
    }

    /// Adds `weight` to the installed window.
    #[inline]
    pub fn increment(&self, weight: i64) {
        self.current.load().increment(weight)
    }

    /// Returns the installed window's rate.
    #[inline]
    pub fn rate(&self) -> i64 {
        self.current.load().rate()
    }

    /// Returns the installed window's running maximum.
    #[inline]
    pub fn max_rate(&self) -> i64 {
        self.current.load().max_rate()
    }

    /// Registers an idle callback on the installed window.
    ///
    /// Callbacks are moved to the windows installed by later resets.
    pub fn on_idle<F>(&self, callback: F)
    where
        F: Fn(&WindowCounter) + Send + Sync + 'static,
    {
        let _swapping = self.swapping.lock().unwrap_or_else(PoisonError::into_inner);
        self.current.load().on_idle(callback)
    }

    /// Installs an empty window with the same name, interval and resolution
    /// as the current one, and moves the idle callbacks over to it.
    pub fn reset(&self) {
        let _swapping = self.swapping.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = self.current.load().succeed();
        debug!(
            counter = fresh.name(),
            interval = ?fresh.interval(),
            "window reset"
        );
        self.current.store(Arc::new(fresh));
    }
}

impl From<WindowCounter> for SwappableWindowCounter {
    fn from(window: WindowCounter) -> Self {
        SwappableWindowCounter {
            current: ArcSwap::from_pointee(window),
            swapping: Mutex::new(()),
        }
    }
}

impl Observable for SwappableWindowCounter {
    fn name(&self) -> &str {
        // Names are `'static`, so the borrow may outlive the guard.
        self.current.load().static_name()
    }

    fn value(&self) -> CounterValue {
        CounterValue::Signed(self.rate())
    }
}

impl Display for SwappableWindowCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&**self.current.load(), f)
    }
}

impl Debug for SwappableWindowCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwappableWindowCounter")
            .field("current", &**self.current.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_reset_and_restart() {
        let interval = Duration::from_millis(50);
        let counter = SwappableWindowCounter::new(interval);

        assert_eq!(counter.rate(), 0);
        counter.increment(1);
        assert_eq!(counter.rate(), 1);
        thread::sleep(2 * interval);
        assert_eq!(counter.rate(), 0);
        thread::sleep(2 * interval);
        counter.increment(2);
        assert_eq!(counter.rate(), 2);
        thread::sleep(2 * interval);
        assert_eq!(counter.rate(), 0);
        counter.increment(2);
        assert_eq!(counter.rate(), 2);
        counter.reset();
        assert_eq!(counter.rate(), 0);
        counter.increment(3);
        assert_eq!(counter.rate(), 3);
    }

    #[test]
    fn test_reset_clears_max_rate() {
        let counter = SwappableWindowCounter::new(Duration::from_secs(60));
        counter.increment(9);
        assert_eq!(counter.max_rate(), 9);
        counter.reset();
        assert_eq!(counter.max_rate(), 0);
    }

    #[test]
    fn test_reset_keeps_configuration() {
        let counter =
            SwappableWindowCounter::new_with_resolution(Duration::from_secs(2), 8)
                .unwrap()
                .with_name("swapped");
        counter.reset();

        let installed = counter.current();
        assert_eq!(installed.interval(), Duration::from_secs(2));
        assert_eq!(installed.resolution(), 8);
        assert_eq!(counter.name(), "swapped");
    }

    #[test]
    fn test_with_resolution() {
        let counter = SwappableWindowCounter::new(Duration::from_secs(1))
            .with_resolution(3)
            .unwrap();
        assert_eq!(counter.current().resolution(), 3);
        assert!(SwappableWindowCounter::new(Duration::from_secs(1))
            .with_resolution(0)
            .is_err());
        assert!(SwappableWindowCounter::new_with_resolution(Duration::from_secs(1), 0).is_err());
    }

    #[test]
    fn test_on_idle_survives_reset() {
        let interval = Duration::from_millis(20);
        let counter = SwappableWindowCounter::new(interval);
        let idles = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&idles);
        counter.on_idle(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        counter.reset();
        counter.increment(1);

        let deadline = Instant::now() + Duration::from_secs(2);
        while idles.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(idles.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_idle_not_fired_by_replaced_window() {
        let interval = Duration::from_millis(40);
        let counter = SwappableWindowCounter::new(interval);
        let idles = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&idles);
        counter.on_idle(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        counter.increment(1);
        counter.reset();

        // Keep the new window busy well past the old one draining.
        let start = Instant::now();
        while start.elapsed() < 5 * interval {
            counter.increment(1);
            thread::sleep(Duration::from_millis(10));
        }
        assert!(counter.rate() > 0);
        assert_eq!(idles.load(Ordering::SeqCst), 0);

        let deadline = Instant::now() + Duration::from_secs(2);
        while idles.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(idles.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_old_window_is_detached() {
        let counter = SwappableWindowCounter::new(Duration::from_secs(60));
        counter.increment(4);
        let old = counter.current();
        counter.reset();
        counter.increment(1);

        assert_eq!(old.rate(), 4);
        assert_eq!(counter.rate(), 1);
    }

    #[test]
    fn test_concurrent_increment_and_reset() {
        let counter = Arc::new(SwappableWindowCounter::new(Duration::from_secs(60)));
        let mut handles = vec![];

        for _ in 0..4 {
            let c = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    c.increment(1);
                    let _ = c.rate();
                }
            }));
        }
        let resetter = {
            let c = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..100 {
                    c.reset();
                    thread::yield_now();
                }
            })
        };

        for h in handles {
            h.join().unwrap();
        }
        resetter.join().unwrap();

        let rate = counter.rate();
        assert!((0..=40_000).contains(&rate));
        counter.reset();
        assert_eq!(counter.rate(), 0);
    }

    #[test]
    fn test_increment_with_many_outstanding() {
        let counter = SwappableWindowCounter::new(Duration::from_secs(3600));
        for _ in 0..1_000_000 {
            counter.increment(1);
        }
        let start = Instant::now();
        counter.increment(1);
        let _ = counter.rate();
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_display_and_debug() {
        let counter = SwappableWindowCounter::new(Duration::from_secs(60));
        counter.increment(12);
        assert_eq!(counter.to_string(), "12");
        assert!(format!("{:?}", counter).starts_with("SwappableWindowCounter"));
    }

    #[test]
    fn test_observable() {
        let counter = SwappableWindowCounter::new(Duration::from_secs(60)).with_name("sw");
        counter.increment(2);
        let formatted = format!("{}", &counter as &dyn Observable);
        assert_eq!(formatted, "sw:2");
    }
}
