//! Millisecond timestamps and the [`Clock`] collaborator.
//!
//! Timestamps are 32-bit and wrap, the same way Arduino's `millis()` and LVGL's tick counter do.
//! Keeping them at 32 bits means they can be shared with interrupt handlers through plain
//! [`AtomicU32`]s, which is the widest atomic available on the Xtensa ESP32 parts.

use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// A reading of a monotonic millisecond counter with no particular epoch.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Millis(pub u32);

impl Millis {
    /// The counter's zero reading.
    pub const ZERO: Millis = Millis(0);

    /// Signed number of milliseconds from `earlier` to `self`.
    ///
    /// Computed with wrapping arithmetic, so the answer is correct across a counter wrap as long as
    /// the two readings are less than about 24 days apart. A negative result means `self` is
    /// actually before `earlier`.
    pub fn since(self, earlier: Millis) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    /// Raw counter value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl Add<u32> for Millis {
    type Output = Millis;

    fn add(self, rhs: u32) -> Millis {
        Millis(self.0.wrapping_add(rhs))
    }
}

impl From<u32> for Millis {
    fn from(value: u32) -> Self {
        Millis(value)
    }
}

/// Monotonically increasing millisecond counter, read-only.
///
/// On the device this is `esp_timer_get_time() / 1000` or `millis()`. Any `Fn() -> Millis` is also
/// a clock.
pub trait Clock {
    /// Reads the counter.
    fn now(&self) -> Millis;
}

impl<F: Fn() -> Millis> Clock for F {
    fn now(&self) -> Millis {
        self()
    }
}

/// [`Clock`] backed by [`std::time::Instant`], counting from its creation.
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    /// Creates a clock that reads zero now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Millis {
        // Truncation is the wrap.
        Millis(self.origin.elapsed().as_millis() as u32)
    }
}

/// [`Clock`] that only moves when told to. Used for simulations and tests.
///
/// Can be shared between threads; [`advance`](Self::advance) and [`set`](Self::set) take `&self`.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU32::new(start.0),
        }
    }

    /// Moves the clock forward by `ms` and returns the new reading.
    pub fn advance(&self, ms: u32) -> Millis {
        Millis(self.now.fetch_add(ms, Ordering::AcqRel).wrapping_add(ms))
    }

    /// Sets the clock to an absolute reading.
    pub fn set(&self, now: Millis) {
        self.now.store(now.0, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now.load(Ordering::Acquire))
    }
}
