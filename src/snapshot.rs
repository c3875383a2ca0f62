//! Snapshot types for serializing counter state.
//!
//! This module provides serializable snapshot types that can be used
//! to capture and export the current state of window counters.
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature; [`MetricsSnapshot::to_json`]
//! additionally requires `json`:
//!
//! ```toml
//! [dependencies]
//! finestre = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use finestre::counters::window::WindowCounter;
//! use finestre::snapshot::WindowSnapshot;
//! use std::time::Duration;
//!
//! let counter = WindowCounter::new(Duration::from_secs(60)).with_name("requests");
//! counter.increment(42);
//!
//! let snapshot = WindowSnapshot::from_window(&counter);
//! assert_eq!(snapshot.rate, 42);
//! assert_eq!(snapshot.resolution, 20);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::counters::window::WindowCounter;
use crate::counters::{CounterValue, Observable};

const UNNAMED: &str = "(unnamed)";

fn snapshot_name(name: &str) -> String {
    if name.is_empty() {
        UNNAMED.to_string()
    } else {
        name.to_string()
    }
}

/// A snapshot of a single counter's value.
///
/// # Examples
///
/// ```rust
/// use finestre::counters::CounterValue;
/// use finestre::snapshot::CounterSnapshot;
///
/// let snapshot = CounterSnapshot::new("requests", CounterValue::Signed(42));
/// assert_eq!(snapshot.name, "requests");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterSnapshot {
    /// The name of the counter.
    pub name: String,
    /// The value of the counter.
    pub value: CounterValue,
}

impl CounterSnapshot {
    /// Creates a new counter snapshot.
    pub fn new(name: impl Into<String>, value: CounterValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Creates a snapshot from an observable counter.
    pub fn from_observable(counter: &dyn Observable) -> Self {
        Self {
            name: snapshot_name(counter.name()),
            value: counter.value(),
        }
    }
}

/// A snapshot of a window counter, including its configuration and peak.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSnapshot {
    /// The name of the counter.
    pub name: String,
    /// Length of the window.
    pub interval: Duration,
    /// Number of buckets the window is split into.
    pub resolution: usize,
    /// Weight added during the window.
    pub rate: i64,
    /// Peak rate since the window was last empty.
    pub max_rate: i64,
}

impl WindowSnapshot {
    /// Captures the current state of `window`.
    pub fn from_window(window: &WindowCounter) -> Self {
        Self {
            name: snapshot_name(window.name()),
            interval: window.interval(),
            resolution: window.resolution(),
            rate: window.rate(),
            max_rate: window.max_rate(),
        }
    }
}

/// A collection of counter snapshots, typically representing a point-in-time
/// capture of all metrics.
///
/// # Examples
///
/// ```rust
/// use finestre::counters::CounterValue;
/// use finestre::snapshot::{CounterSnapshot, MetricsSnapshot};
///
/// let snapshot = MetricsSnapshot::with_timestamp(
///     vec![CounterSnapshot::new("errors", CounterValue::Signed(5))],
///     1_700_000_000_000,
/// );
/// assert!(snapshot.get("errors").is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    /// Optional timestamp in milliseconds since Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    /// The counter snapshots.
    pub counters: Vec<CounterSnapshot>,
}

impl MetricsSnapshot {
    /// Creates a new metrics snapshot with the given counters.
    pub fn new(counters: Vec<CounterSnapshot>) -> Self {
        Self {
            timestamp_ms: None,
            counters,
        }
    }

    /// Creates a new metrics snapshot with counters and a timestamp.
    pub fn with_timestamp(counters: Vec<CounterSnapshot>, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            counters,
        }
    }

    /// Finds a counter by name.
    pub fn get(&self, name: &str) -> Option<&CounterSnapshot> {
        self.counters.iter().find(|c| c.name == name)
    }

    /// Collects snapshots from an iterator of observable counters.
    pub fn collect<'a>(counters: impl Iterator<Item = &'a dyn Observable>) -> Self {
        Self::new(counters.map(CounterSnapshot::from_observable).collect())
    }

    /// Serializes the snapshot to JSON.
    #[cfg(feature = "json")]
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SwappableWindowCounter;
    use crate::counters::ratio::RatioWindowCounter;

    #[test]
    fn test_counter_snapshot_from_observable() {
        let counter = WindowCounter::new(Duration::from_secs(60)).with_name("requests");
        counter.increment(100);

        let snapshot = CounterSnapshot::from_observable(&counter);
        assert_eq!(snapshot.name, "requests");
        assert_eq!(snapshot.value, CounterValue::Signed(100));
    }

    #[test]
    fn test_counter_snapshot_from_observable_unnamed() {
        let counter = WindowCounter::new(Duration::from_secs(60));
        counter.increment(50);

        let snapshot = CounterSnapshot::from_observable(&counter);
        assert_eq!(snapshot.name, "(unnamed)");
    }

    #[test]
    fn test_window_snapshot() {
        let counter = WindowCounter::new_with_resolution(Duration::from_secs(30), 6)
            .unwrap()
            .with_name("w");
        counter.increment(8);
        counter.increment(-3);

        let snapshot = WindowSnapshot::from_window(&counter);
        assert_eq!(snapshot.name, "w");
        assert_eq!(snapshot.interval, Duration::from_secs(30));
        assert_eq!(snapshot.resolution, 6);
        assert_eq!(snapshot.rate, 5);
        assert_eq!(snapshot.max_rate, 8);
    }

    #[test]
    fn test_metrics_snapshot_collect() {
        let window = WindowCounter::new(Duration::from_secs(60)).with_name("window");
        let ratio = RatioWindowCounter::new(Duration::from_secs(60)).with_name("ratio");
        let swappable = SwappableWindowCounter::new(Duration::from_secs(60)).with_name("swap");
        window.increment(10);
        ratio.increment(4);
        ratio.increment(2);
        swappable.increment(7);

        let counters: Vec<&dyn Observable> = vec![&window, &ratio, &swappable];
        let snapshot = MetricsSnapshot::collect(counters.into_iter());

        assert_eq!(snapshot.counters.len(), 3);
        assert_eq!(snapshot.get("window").unwrap().value, CounterValue::Signed(10));
        assert_eq!(snapshot.get("ratio").unwrap().value, CounterValue::Float(3.0));
        assert_eq!(snapshot.get("swap").unwrap().value, CounterValue::Signed(7));
        assert!(snapshot.get("missing").is_none());
    }

    #[test]
    fn test_serialize_counter_snapshot() {
        let snapshot = CounterSnapshot::new("test", CounterValue::Signed(-42));
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"name":"test","value":-42}"#);
    }

    #[test]
    fn test_deserialize_counter_snapshot() {
        let json = r#"{"name":"avg","value":2.5}"#;
        let snapshot: CounterSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.value, CounterValue::Float(2.5));

        let json = r#"{"name":"hits","value":42}"#;
        let snapshot: CounterSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.value, CounterValue::Signed(42));
    }

    #[test]
    fn test_serialize_metrics_snapshot() {
        let snapshot = MetricsSnapshot::with_timestamp(
            vec![CounterSnapshot::new("a", CounterValue::Signed(1))],
            1234567890,
        );
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("timestamp_ms"));
        assert!(json.contains("1234567890"));

        let untimed = serde_json::to_string(&MetricsSnapshot::new(vec![])).unwrap();
        assert!(!untimed.contains("timestamp_ms"));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_to_json() {
        let snapshot = MetricsSnapshot::new(vec![CounterSnapshot::new(
            "a",
            CounterValue::Signed(1),
        )]);
        assert_eq!(
            snapshot.to_json(false).unwrap(),
            r#"{"counters":[{"name":"a","value":1}]}"#
        );
        assert!(snapshot.to_json(true).unwrap().contains('\n'));
    }
}
