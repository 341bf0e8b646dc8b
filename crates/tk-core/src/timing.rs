//! Millisecond clock primitives for cooperative polling loops.
//!
//! Every component reads one free-running `u32` millisecond counter. The
//! counter wraps after ~49.7 days, so intervals are always computed as
//! wrapping unsigned differences and deadlines are compared through the
//! signed distance between the two counter values.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Free-running millisecond counter value.
pub type Millis = u32;

/// Milliseconds elapsed from `since` to `now`, tolerant of counter wrap.
pub fn elapsed(now: Millis, since: Millis) -> Millis {
    now.wrapping_sub(since)
}

/// Counter value `delay` milliseconds after `now`.
pub fn after(now: Millis, delay: Millis) -> Millis {
    now.wrapping_add(delay)
}

/// Whether `now` has reached `due`.
///
/// Valid as long as the two values are less than 2^31 ms apart.
pub fn deadline_reached(now: Millis, due: Millis) -> bool {
    (now.wrapping_sub(due) as i32) >= 0
}

/// Milliseconds left until `due`, zero once it has been reached.
pub fn remaining(now: Millis, due: Millis) -> Millis {
    if deadline_reached(now, due) {
        0
    } else {
        due.wrapping_sub(now)
    }
}

/// Source of the monotonic millisecond counter.
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}

/// Clock driven by hand. Used by simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    /// Advance the clock and return the new counter value.
    pub fn advance(&self, ms: Millis) -> Millis {
        let next = after(self.now.get(), ms);
        self.now.set(next);
        next
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// Host clock: milliseconds since construction, truncated to the counter width.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Millis {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as Millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn elapsed_across_wrap() {
        let since = u32::MAX - 99;
        let now = 400;
        assert_eq!(elapsed(now, since), 500);
    }

    #[test]
    fn deadline_across_wrap() {
        let due = after(u32::MAX - 10, 20);
        assert_eq!(due, 9);
        assert!(!deadline_reached(u32::MAX - 1, due));
        assert!(deadline_reached(9, due));
        assert!(deadline_reached(15, due));
        assert_eq!(remaining(u32::MAX, due), 10);
        assert_eq!(remaining(30, due), 0);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1000);
        assert_eq!(clock.advance(250), 1250);
        assert_eq!(clock.now_ms(), 1250);
        let shared = Rc::new(clock);
        shared.set(5);
        assert_eq!(shared.now_ms(), 5);
    }

    proptest! {
        #[test]
        fn after_then_elapsed_is_identity(start in any::<u32>(), delay in 0u32..(1 << 30)) {
            let due = after(start, delay);
            prop_assert_eq!(elapsed(due, start), delay);
            prop_assert!(deadline_reached(due, due));
            if delay > 0 {
                prop_assert!(!deadline_reached(start, due));
            }
        }
    }
}
