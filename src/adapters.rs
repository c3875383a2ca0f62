//! Wrapper types for extending counter functionality.
//!
//! This module provides wrapper types that add behavior to window counters
//! while keeping the same read and write surface and the [`Observable`]
//! trait.
//!
//! # Available Wrappers
//!
//! | Wrapper | Description |
//! |---------|-------------|
//! | [`SwappableWindowCounter`] | Atomically replaceable window with an in-place `reset()` |
//!
//! # Examples
//!
//! ```rust
//! use finestre::adapters::SwappableWindowCounter;
//! use std::time::Duration;
//!
//! let errors = SwappableWindowCounter::new(Duration::from_secs(30)).with_name("errors");
//! errors.increment(1);
//!
//! // Forget everything seen so far, e.g. after a deploy
//! errors.reset();
//! assert_eq!(errors.rate(), 0);
//! ```
//!
//! [`Observable`]: crate::counters::Observable

mod swappable;

pub use swappable::SwappableWindowCounter;
