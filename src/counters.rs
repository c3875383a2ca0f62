//! Core module containing counter implementations and shared infrastructure.
//!
//! This module provides the foundational types and traits used by all counter
//! implementations.
//!
//! # Architecture
//!
//! Every counter here is built from [`AtomicCounter`](atomic::AtomicCounter)
//! cells. A [`WindowCounter`](window::WindowCounter) splits its interval into
//! a ring of buckets and keeps a running total next to it:
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   increment ──► │ total  (AtomicCounter, CachePadded)          │ ◄── rate()
//!            │    ├──────────────────────────────────────────────┤
//!            └──► │ [b0] [b1] [b2] ... [current] ... [b(n-1)]    │
//!                 └──────────────────────────────────────────────┘
//!                                  ▲
//!                                  │ every interval / n:
//!                       decay task advances `current`,
//!                       evicts that bucket from `total`
//! ```
//!
//! The decay task only runs while the window holds a non-zero total. It is
//! started by the first increment after an idle period and stops itself once
//! everything has been evicted.

pub mod atomic;
mod decay;
pub mod ratio;
pub mod window;

use std::fmt::{Debug, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents the value of a counter, supporting both integer and ratio counters.
///
/// This enum allows the [`Observable`] trait to return values from counters
/// of different underlying types through a unified interface.
///
/// # Examples
///
/// ```rust
/// use finestre::counters::CounterValue;
///
/// let signed = CounterValue::Signed(-10);
/// let ratio = CounterValue::Float(2.5);
///
/// assert!(!signed.is_zero());
/// assert!(!ratio.is_zero());
/// assert!(CounterValue::Signed(0).is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum CounterValue {
    /// A signed 64-bit counter value.
    Signed(i64),
    /// A floating-point value, used by ratio counters.
    Float(f64),
}

impl Display for CounterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterValue::Signed(v) => write!(f, "{}", v),
            CounterValue::Float(v) => f.write_str(&format_scientific(*v, 5)),
        }
    }
}

impl CounterValue {
    /// Returns `true` if the counter value is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use finestre::counters::CounterValue;
    ///
    /// assert!(CounterValue::Signed(0).is_zero());
    /// assert!(CounterValue::Float(0.0).is_zero());
    /// assert!(!CounterValue::Signed(-1).is_zero());
    /// ```
    pub fn is_zero(&self) -> bool {
        match self {
            CounterValue::Signed(v) => *v == 0,
            CounterValue::Float(v) => *v == 0.0,
        }
    }

    /// Returns the value as an `i64`, truncating ratios toward zero.
    pub fn as_i64(&self) -> i64 {
        match self {
            CounterValue::Signed(v) => *v,
            CounterValue::Float(v) => *v as i64,
        }
    }

    /// Returns the value as an `f64`.
    pub fn as_f64(&self) -> f64 {
        match self {
            CounterValue::Signed(v) => *v as f64,
            CounterValue::Float(v) => *v,
        }
    }
}

/// A trait for types that can be observed to retrieve their current value.
///
/// This trait provides a common interface for all counter types, allowing
/// them to be collected side by side (see the `snapshot` module).
///
/// # Implementors
///
/// - [`AtomicCounter`](atomic::AtomicCounter) - returns `CounterValue::Signed`
/// - [`WindowCounter`](window::WindowCounter) - returns the windowed total
/// - [`RatioWindowCounter`](ratio::RatioWindowCounter) - returns `CounterValue::Float`
/// - [`SwappableWindowCounter`](crate::adapters::SwappableWindowCounter) -
///   forwards to the installed window
///
/// # Examples
///
/// ```rust
/// use finestre::counters::Observable;
/// use finestre::counters::window::WindowCounter;
/// use std::time::Duration;
///
/// let counter = WindowCounter::new(Duration::from_secs(60)).with_name("logins");
/// counter.increment(5);
///
/// let observed: &dyn Observable = &counter;
/// assert_eq!(format!("{}", observed), "logins:5");
/// ```
pub trait Observable: Debug {
    /// Returns the name of this counter, or an empty string if none was set.
    fn name(&self) -> &str;

    /// Returns the current value of the counter.
    fn value(&self) -> CounterValue;
}

impl Display for dyn Observable + '_ {
    /// Formats the counter as `name:value` if named, or just `value` otherwise.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.name().is_empty() {
            write!(f, "{}:{}", self.name(), self.value())
        } else {
            write!(f, "{}", self.value())
        }
    }
}

/// Formats `value` in normalized scientific notation with `precision`
/// fractional digits and a signed, at least two-digit exponent
/// (`1.00000e+00`, `2.50000e-03`).
pub(crate) fn format_scientific(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}
