//! Resettable gate.
//!
//! A gate releases blocked threads when it is lifted. Each lift starts a new
//! generation; waiters compare generations instead of relying on the
//! condition variable alone, so spurious wakeups and lifts racing with a
//! waiter never get lost.
//!
//! Two wait modes are provided:
//!
//! - `wait_once`: blocks until the first lift, then never again until the
//!   gate is reset. If a lift already happened since the last reset, it does
//!   not block at all.
//! - `wait_next`: always blocks until a lift that happens after the call.
//!
//! Timeouts are a liveness bound, not an error: an expired wait returns
//! [`Release::TimedOut`] and the caller proceeds as if released.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Why a wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The gate was lifted while waiting.
    Lifted,
    /// The timeout elapsed first.
    TimedOut,
    /// The gate was already released; the call did not block.
    AlreadyReleased,
}

#[derive(Debug, Default)]
struct GateState {
    generation: u64,
    anchor: u64,
    once_released: bool,
    waiting: usize,
}

/// A thread-safe resettable gate.
#[derive(Debug, Default)]
pub struct Gate {
    state: Mutex<GateState>,
    condvar: Condvar,
    timeout: Option<Duration>,
}

impl Gate {
    /// Creates a gate whose waits block indefinitely by default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate whose waits are bounded by `timeout` by default.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Returns the instance default timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Lifts the gate, releasing every current waiter. Never blocks on waiters.
    pub fn lift(&self) {
        {
            let mut state = self.state.lock();
            state.generation = state.generation.wrapping_add(1);
        }
        self.condvar.notify_all();
    }

    /// Waits for the first lift, bounded by the instance timeout.
    pub fn wait_once(&self) -> Release {
        self.wait_once_inner(self.timeout)
    }

    /// Waits for the first lift, bounded by `timeout`.
    pub fn wait_once_for(&self, timeout: Duration) -> Release {
        self.wait_once_inner(Some(timeout))
    }

    /// Waits for a lift strictly after this call, bounded by the instance timeout.
    pub fn wait_next(&self) -> Release {
        self.wait_next_inner(self.timeout)
    }

    /// Waits for a lift strictly after this call, bounded by `timeout`.
    pub fn wait_next_for(&self, timeout: Duration) -> Release {
        self.wait_next_inner(Some(timeout))
    }

    /// Waits until the gate has been lifted past `generation`, bounded by
    /// the instance timeout.
    ///
    /// Pairs with [`Gate::generation`]: a lift that lands between reading the
    /// generation and calling this is not lost.
    pub fn wait_after(&self, generation: u64) -> Release {
        self.wait_after_inner(generation, self.timeout)
    }

    /// Waits until the gate has been lifted past `generation`, bounded by `timeout`.
    pub fn wait_after_for(&self, generation: u64, timeout: Duration) -> Release {
        self.wait_after_inner(generation, Some(timeout))
    }

    /// Re-arms `wait_once` from the current generation.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.anchor = state.generation;
        state.once_released = false;
    }

    /// Returns the number of lifts so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Returns the number of threads currently blocked on the gate.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.state.lock().waiting
    }

    fn wait_once_inner(&self, timeout: Option<Duration>) -> Release {
        let mut state = self.state.lock();
        if state.once_released || state.generation != state.anchor {
            state.once_released = true;
            return Release::AlreadyReleased;
        }

        let observed = state.generation;
        let release = self.block(&mut state, observed, timeout);
        state.once_released = true;
        release
    }

    fn wait_next_inner(&self, timeout: Option<Duration>) -> Release {
        let mut state = self.state.lock();
        let observed = state.generation;
        self.block(&mut state, observed, timeout)
    }

    fn wait_after_inner(&self, generation: u64, timeout: Option<Duration>) -> Release {
        let mut state = self.state.lock();
        if state.generation != generation {
            return Release::AlreadyReleased;
        }
        self.block(&mut state, generation, timeout)
    }

    fn block(
        &self,
        state: &mut MutexGuard<'_, GateState>,
        observed: u64,
        timeout: Option<Duration>,
    ) -> Release {
        // An unrepresentable deadline is as good as none.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        state.waiting += 1;
        let release = loop {
            if state.generation != observed {
                break Release::Lifted;
            }
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(state, deadline).timed_out() {
                        break if state.generation != observed {
                            Release::Lifted
                        } else {
                            Release::TimedOut
                        };
                    }
                }
                None => self.condvar.wait(state),
            }
        };
        state.waiting -= 1;
        release
    }
}
