//! Background bucket rotation.
//!
//! A window runs at most one decay task at a time. The task is a detached
//! thread that wakes once per bucket length and calls back into the window;
//! it exits as soon as the callback reports that the window went idle.
//!
//! ```text
//!            increment() while Idle
//!            (compare-and-swap wins)
//!     ┌──────┐ ─────────────────────► ┌─────────┐
//!     │ Idle │                        │ Running │ ──┐ tick: rotate one bucket
//!     └──────┘ ◄───────────────────── └─────────┘ ◄─┘
//!            tick leaves total == 0
//! ```

use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const THREAD_NAME: &str = "finestre-decay";

/// State of a window's decay task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum DecayState {
    Idle = 0,
    Running = 1,
}

impl From<u8> for DecayState {
    fn from(v: u8) -> Self {
        match v {
            0 => DecayState::Idle,
            _ => DecayState::Running,
        }
    }
}

/// Two-state switch guaranteeing a single decay task per window.
pub(crate) struct DecaySwitch {
    state: AtomicU8,
}

impl DecaySwitch {
    pub(crate) const fn new() -> Self {
        DecaySwitch {
            state: AtomicU8::new(DecayState::Idle as u8),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> DecayState {
        DecayState::from(self.state.load(Ordering::SeqCst))
    }

    /// Moves `Idle -> Running`. Returns `true` for the single caller that
    /// performed the transition; that caller owns starting the task.
    #[inline]
    pub(crate) fn try_start(&self) -> bool {
        self.state
            .compare_exchange(
                DecayState::Idle as u8,
                DecayState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Moves back to `Idle`. Only the running task (or a failed start) calls this.
    #[inline]
    pub(crate) fn stop(&self) {
        self.state.store(DecayState::Idle as u8, Ordering::SeqCst);
    }
}

/// Spawns a thread calling `tick` once every `step` until it returns `false`.
///
/// Wake-ups follow a fixed schedule rather than sleeping `step` after each
/// tick, so a slow tick does not stretch the window. Missed wake-ups are
/// caught up immediately. A zero `step` yields between ticks, and a `step`
/// too large to schedule from now is simply slept.
///
/// Dropping the returned handle detaches the thread.
pub(crate) fn spawn<F>(step: Duration, mut tick: F) -> io::Result<JoinHandle<()>>
where
    F: FnMut() -> bool + Send + 'static,
{
    thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            let mut deadline = Instant::now();
            loop {
                match deadline.checked_add(step) {
                    Some(next) => {
                        deadline = next;
                        let now = Instant::now();
                        if deadline > now {
                            thread::sleep(deadline - now);
                        } else if step.is_zero() {
                            thread::yield_now();
                        }
                    }
                    None => {
                        thread::sleep(step);
                        deadline = Instant::now();
                    }
                }
                if !tick() {
                    break;
                }
            }
        })
}
