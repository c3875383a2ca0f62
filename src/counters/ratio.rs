//! Windowed average built from two sliding windows.
//!
//! This module provides [`RatioWindowCounter`], which reports the average
//! weight per event over the last interval: one window counts events, the
//! other sums their weights.

use std::fmt::{self, Debug, Display};
use std::time::Duration;

use crate::counters::window::WindowCounter;
use crate::counters::{format_scientific, CounterValue, Observable};
use crate::error::Result;

/// A sliding-window average: total weight divided by number of events.
///
/// The two constituent windows share interval and resolution. An increment
/// updates them one after the other without joint atomicity; each is
/// independently accurate over the same window, so a reader can at worst see
/// one event counted on one side only.
///
/// # Examples
///
/// ```rust
/// use finestre::counters::ratio::RatioWindowCounter;
/// use std::time::Duration;
///
/// let latency = RatioWindowCounter::new(Duration::from_secs(60)).with_name("latency_avg_ms");
///
/// latency.increment(1);
/// assert_eq!(latency.rate(), 1.0);
///
/// latency.increment(3);
/// assert_eq!(latency.rate(), 2.0);
/// assert_eq!(latency.hits(), 2);
/// assert_eq!(latency.to_string(), "2.00000e+00");
/// ```
#[derive(Clone)]
pub struct RatioWindowCounter {
    name: &'static str,
    occurrences: WindowCounter,
    weight: WindowCounter,
}

impl RatioWindowCounter {
    /// Creates a ratio counter over `interval` with the default resolution.
    pub fn new(interval: Duration) -> Self {
        RatioWindowCounter {
            name: "",
            occurrences: WindowCounter::new(interval),
            weight: WindowCounter::new(interval),
        }
    }

    /// Creates a ratio counter over `interval` split into `resolution` buckets.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidConfiguration`](crate::WindowError) under
    /// the same conditions as [`WindowCounter::new_with_resolution`].
    pub fn new_with_resolution(interval: Duration, resolution: usize) -> Result<Self> {
        Ok(RatioWindowCounter {
            name: "",
            occurrences: WindowCounter::new_with_resolution(interval, resolution)?,
            weight: WindowCounter::new_with_resolution(interval, resolution)?,
        })
    }

    /// Applies `resolution` to both windows.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidConfiguration`](crate::WindowError) if
    /// `resolution` is zero or too large.
    pub fn with_resolution(self, resolution: usize) -> Result<Self> {
        Ok(RatioWindowCounter {
            name: self.name,
            occurrences: self.occurrences.with_resolution(resolution)?,
            weight: self.weight.with_resolution(resolution)?,
        })
    }

    /// Sets the name of this counter, returning `self` for method chaining.
    pub fn with_name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Records one event carrying `weight`.
    #[inline]
    pub fn increment(&self, weight: i64) {
        self.occurrences.increment(1);
        self.weight.increment(weight);
    }

    /// Returns the average weight per event in the window, or `0.0` when the
    /// window holds no events.
    pub fn rate(&self) -> f64 {
        let hits = self.occurrences.rate();
        if hits == 0 {
            return 0.0;
        }
        self.weight.rate() as f64 / hits as f64
    }

    /// Returns the number of events in the window.
    #[inline]
    pub fn hits(&self) -> i64 {
        self.occurrences.rate()
    }

    /// Returns the summed weight of the events in the window.
    #[inline]
    pub fn weight(&self) -> i64 {
        self.weight.rate()
    }

    /// Returns the length of the window.
    pub fn interval(&self) -> Duration {
        self.occurrences.interval()
    }

    /// Returns the number of buckets each window is split into.
    pub fn resolution(&self) -> usize {
        self.occurrences.resolution()
    }
}

impl Observable for RatioWindowCounter {
    #[inline]
    fn name(&self) -> &str {
        self.name
    }

    #[inline]
    fn value(&self) -> CounterValue {
        CounterValue::Float(self.rate())
    }
}

impl Display for RatioWindowCounter {
    /// Formats the ratio in scientific notation, e.g. `1.00000e+00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_scientific(self.rate(), 5))
    }
}

impl Debug for RatioWindowCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{ hits:{} weight:{} }}",
            self.name,
            self.hits(),
            self.weight()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WindowError;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_ratio_counter() {
        let interval = Duration::from_millis(50);
        let counter = RatioWindowCounter::new(interval);

        assert_eq!(counter.rate(), 0.0);
        assert_eq!(counter.hits(), 0);
        counter.increment(1);
        assert_eq!(counter.rate(), 1.0);
        assert_eq!(counter.hits(), 1);
        counter.increment(3);
        assert_eq!(counter.rate(), 2.0);
        assert_eq!(counter.hits(), 2);
        thread::sleep(2 * interval);
        assert_eq!(counter.rate(), 0.0);
        assert_eq!(counter.hits(), 0);
    }

    #[test]
    fn test_ratio_counter_partial_decay() {
        let interval = Duration::from_millis(100);
        let counter = RatioWindowCounter::new(interval);

        counter.increment(1);
        thread::sleep(Duration::from_millis(30));
        counter.increment(3);
        assert_eq!(counter.rate(), 2.0);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(counter.rate(), 3.0);
        assert_eq!(counter.hits(), 1);
        thread::sleep(2 * interval);
        assert_eq!(counter.rate(), 0.0);
        assert_eq!(counter.hits(), 0);
    }

    #[test]
    fn test_ratio_counter_no_resolution() {
        let interval = Duration::from_millis(50);
        let counter = RatioWindowCounter::new(interval).with_resolution(1).unwrap();

        counter.increment(1);
        thread::sleep(Duration::from_millis(5));
        counter.increment(3);
        assert_eq!(counter.rate(), 2.0);
        thread::sleep(Duration::from_millis(75));
        assert_eq!(counter.rate(), 0.0);
        assert_eq!(counter.hits(), 0);
    }

    #[test]
    fn test_min_resolution() {
        let counter = RatioWindowCounter::new(Duration::from_millis(500));
        assert_eq!(
            counter.with_resolution(0).unwrap_err(),
            WindowError::InvalidConfiguration { resolution: 0 }
        );
        assert!(RatioWindowCounter::new_with_resolution(Duration::from_millis(500), 0).is_err());
    }

    #[test]
    fn test_with_resolution_applies_to_both() {
        let counter = RatioWindowCounter::new(Duration::from_secs(1))
            .with_name("avg")
            .with_resolution(5)
            .unwrap();
        assert_eq!(counter.resolution(), 5);
        assert_eq!(counter.weight.resolution(), 5);
        assert_eq!(counter.name(), "avg");
    }

    #[test]
    fn test_negative_weights() {
        let counter = RatioWindowCounter::new(Duration::from_secs(60));
        counter.increment(-4);
        counter.increment(2);
        assert_eq!(counter.rate(), -1.0);
        assert_eq!(counter.weight(), -2);
    }

    #[test]
    fn test_display() {
        let counter = RatioWindowCounter::new(Duration::from_secs(1));
        assert_eq!(counter.to_string(), "0.00000e+00");
        counter.increment(1);
        assert_eq!(counter.to_string(), "1.00000e+00");
    }

    #[test]
    fn test_increment_returns_immediately() {
        let counter = RatioWindowCounter::new(Duration::from_secs(1));
        let start = Instant::now();
        counter.increment(-1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_observable() {
        let counter = RatioWindowCounter::new(Duration::from_secs(60)).with_name("ratio");
        counter.increment(5);
        assert_eq!(counter.value(), CounterValue::Float(5.0));
        let formatted = format!("{}", &counter as &dyn Observable);
        assert_eq!(formatted, "ratio:5.00000e+00");
    }

    #[test]
    fn test_debug() {
        let counter = RatioWindowCounter::new(Duration::from_secs(60)).with_name("dbg");
        counter.increment(7);
        assert_eq!(format!("{:?}", counter), "dbg{ hits:1 weight:7 }");
    }
}
