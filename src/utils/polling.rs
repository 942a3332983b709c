//! Clock, cancellation and the polling loop shared by the device and the
//! bootloader waits.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use log::trace;

//==============================================================================
// Public Interface
//==============================================================================

/// Source of time for the polling loops. Sleeping is the only suspension
/// point of a session.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Cooperative cancellation flag, cheap to clone and safe to set from a
/// signal handler thread.
#[derive(Debug, Default, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}
impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A bounded polling period: a deadline and the pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollWindow {
    pub deadline: Instant,
    pub interval: Duration,
}
impl PollWindow {
    /// A window of `duration` starting at the current time of `clock`.
    pub fn starting_now(clock: &dyn Clock, duration: Duration, interval: Duration) -> Self {
        PollWindow {
            deadline: clock.now() + duration,
            interval,
        }
    }
}

/// Result of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Waited<T> {
    Found(T),
    /// The deadline elapsed first.
    NotFound,
    /// The cancellation token was set at a suspension point.
    Cancelled,
}

/// Call `check` until it yields a value, pausing `interval` between attempts.
///
/// Without a `deadline` the loop only ends on success or cancellation. The
/// token is checked before every attempt, so a cancellation requested during
/// a pause is honored as soon as the pause ends.
pub fn poll<T>(
    clock: &dyn Clock,
    cancel: &CancelToken,
    interval: Duration,
    deadline: Option<Instant>,
    mut check: impl FnMut() -> Option<T>,
) -> Waited<T> {
    let mut attempt: usize = 1;
    loop {
        if cancel.is_cancelled() {
            return Waited::Cancelled;
        }
        if let Some(deadline) = deadline {
            if clock.now() >= deadline {
                return Waited::NotFound;
            }
        }
        trace!("poll attempt {}", attempt);
        if let Some(value) = check() {
            return Waited::Found(value);
        }
        clock.sleep(interval);
        attempt += 1;
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
