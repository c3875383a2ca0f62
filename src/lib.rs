//! # Finestre - Lock-Free Sliding-Window Rate Counters
//!
//! A Rust library answering "how many (weighted) events happened in the last
//! T?" for highly concurrent workloads, without storing a timestamp per event.
//!
//! ## The Problem
//!
//! The obvious sliding-window counter remembers when each event happened, or
//! schedules one timer per event to take it back out of the total once it
//! expires. Either way memory and background work grow with the event rate:
//! a busy counter with a one-hour window ends up holding millions of pending
//! timers.
//!
//! ## The Solution: Bucketed Windows
//!
//! This library splits the window into a fixed ring of buckets (20 by
//! default). Increments go into the current bucket and a running total; a
//! single background task per window advances the ring once per bucket
//! length and evicts the oldest bucket from the total.
//!
//! ### Design Principles
//!
//! 1. **Bounded Background Work**: at most `resolution` wake-ups per window
//!    interval, whatever the event volume.
//!
//! 2. **Self-Stopping Decay**: the background task only runs while the window
//!    is non-empty. It stops itself once everything has been evicted and the
//!    next increment restarts it; a compare-and-swap guarantees there is never
//!    more than one per window.
//!
//! 3. **Lock-Free Hot Path**: `increment`, `rate` and `max_rate` are plain
//!    atomic operations and never wait for the decay task.
//!
//! 4. **Cache Line Padding**: every bucket is wrapped in
//!    [`crossbeam_utils::CachePadded`] so writers of the current bucket and
//!    the task evicting an old one do not contend.
//!
//! ## Available Counter Types
//!
//! | Type | Description | Use Case |
//! |------|-------------|----------|
//! | [`AtomicCounter`](counters::atomic::AtomicCounter) | Signed atomic cell | Building block, gauges |
//! | [`WindowCounter`](counters::window::WindowCounter) | Weighted sum over a sliding window | Requests in the last minute |
//! | [`SwappableWindowCounter`](adapters::SwappableWindowCounter) | Window with atomic in-place reset | Counters reset by an operator |
//! | [`RatioWindowCounter`](counters::ratio::RatioWindowCounter) | Average weight per event over a window | Mean latency, mean payload size |
//!
//! ## Quick Start
//!
//! ```rust
//! use finestre::counters::window::WindowCounter;
//! use std::time::Duration;
//!
//! // Cloning is cheap; every clone updates the same window
//! let requests = WindowCounter::new(Duration::from_secs(60)).with_name("requests");
//!
//! requests.increment(1);
//! requests.increment(5);
//!
//! // Sum of the weights added during the last minute
//! assert_eq!(requests.rate(), 6);
//!
//! // Peak since the window was last empty
//! assert_eq!(requests.max_rate(), 6);
//! ```
//!
//! ## Precision
//!
//! An increment leaves the window between `interval - interval / resolution`
//! and `interval` after it was made. Raise the resolution for smoother decay,
//! lower it for fewer wake-ups:
//!
//! ```rust
//! use finestre::counters::window::WindowCounter;
//! use std::time::Duration;
//!
//! let fine = WindowCounter::new_with_resolution(Duration::from_secs(10), 100)?;
//! let coarse = WindowCounter::new(Duration::from_secs(10)).with_resolution(1)?;
//! # let _ = (fine, coarse);
//! # Ok::<(), finestre::WindowError>(())
//! ```
//!
//! ## Evicting Idle Counters
//!
//! A registry owning many windows can drop the ones that went quiet:
//!
//! ```rust
//! use finestre::counters::window::WindowCounter;
//! use std::time::Duration;
//!
//! let counter = WindowCounter::new(Duration::from_secs(5)).with_name("client-42");
//! counter.on_idle(|window| {
//!     tracing::debug!(counter = ?window, "evicting idle counter");
//! });
//! ```
//!
//! ## Logging
//!
//! Decay task start and stop are reported as `tracing` events at `debug`
//! level, individual rotations at `trace`. The library never installs a
//! subscriber.
//!
//! ## Snapshots
//!
//! With the `serde` feature, [`snapshot`] captures counters in a
//! serializable form; the `json` feature adds JSON export.

pub mod adapters;
pub mod counters;
mod error;

#[cfg(feature = "serde")]
pub mod snapshot;

pub use error::{Result, WindowError, MAX_RESOLUTION};
