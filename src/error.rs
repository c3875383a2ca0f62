//! Error type for window construction.
//!
//! Building a window is the only fallible operation in this crate: once a
//! counter exists, every update and read is a total function.
//!
//! # Example
//!
//! ```rust
//! use finestre::counters::window::WindowCounter;
//! use finestre::WindowError;
//! use std::time::Duration;
//!
//! let err = WindowCounter::new_with_resolution(Duration::from_secs(1), 0).unwrap_err();
//! assert_eq!(err, WindowError::InvalidConfiguration { resolution: 0 });
//! ```

use thiserror::Error;

/// Largest bucket count a window accepts.
///
/// The bucket length is `interval / resolution`, and [`std::time::Duration`]
/// only divides by a `u32`.
pub const MAX_RESOLUTION: usize = u32::MAX as usize;

/// Error returned when a window cannot be built.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    /// The requested bucket count is outside `1..=MAX_RESOLUTION`.
    #[error("invalid configuration: resolution must be between 1 and {max}, got {resolution}", max = MAX_RESOLUTION)]
    InvalidConfiguration {
        /// The rejected bucket count.
        resolution: usize,
    },
}

/// Result type for window construction.
pub type Result<T> = std::result::Result<T, WindowError>;

/// Checks a bucket count, returning it as the divisor used for bucket length.
pub(crate) fn check_resolution(resolution: usize) -> Result<u32> {
    match u32::try_from(resolution) {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(WindowError::InvalidConfiguration { resolution }),
    }
}
