//! Idle detection driven by an external trigger, typically a GPIO falling-edge interrupt from a
//! touch pad or button.
//!
//! Two contexts touch the monitor: the trigger source calls [`IdleMonitor::on_trigger`]
//! preemptively, and the render task calls [`IdleMonitor::poll`] once per frame. All shared state
//! is held in 32-bit atomics, so the monitor can live behind an `Arc` (or in a `static`) without a
//! lock.
//!
//! # Staleness
//!
//! A trigger that lands between a poll's read of the trigger time and its write of the idle flag
//! can leave the flag reporting idle for that one frame. The trigger's pending flag survives, so
//! the very next poll reports [`DisplayMode::Active`]. One frame of lag is the accepted bound.

pub use enum_map::Enum;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::clock::Millis;

/// Which animation path the render loop should drive.
#[derive(Clone, Copy, Debug, Default, Enum, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum DisplayMode {
    /// A trigger was seen recently.
    #[default]
    Active,
    /// No trigger for at least the idle threshold.
    Idle,
}

/// Timing parameters for an [`IdleMonitor`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Time without triggers after which the monitor reports [`DisplayMode::Idle`].
    pub idle_threshold_ms: u32,
    /// When set, triggers arriving within this many milliseconds of the last accepted trigger are
    /// ignored. Useful for bouncy mechanical switches.
    pub debounce_ms: Option<u32>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            idle_threshold_ms: 3000,
            debounce_ms: None,
        }
    }
}

/// Tracks how recently the trigger fired and derives the [`DisplayMode`].
#[derive(Debug)]
pub struct IdleMonitor {
    config: TriggerConfig,
    last_trigger: AtomicU32,
    triggers: AtomicU32,
    pending: AtomicBool,
    idle: AtomicBool,
}

impl IdleMonitor {
    /// Creates a monitor that counts `now` as the last activity, so it starts out
    /// [`Active`](DisplayMode::Active).
    pub fn new(config: TriggerConfig, now: Millis) -> Self {
        Self {
            config,
            last_trigger: AtomicU32::new(now.as_u32()),
            triggers: AtomicU32::new(0),
            pending: AtomicBool::new(false),
            idle: AtomicBool::new(false),
        }
    }

    /// Records a trigger at `now`. Returns `false` if it fell inside the debounce window and was
    /// ignored.
    ///
    /// Safe to call from an interrupt handler: it only touches atomics. It does not log, allocate
    /// or block.
    pub fn on_trigger(&self, now: Millis) -> bool {
        if let Some(window) = self.config.debounce_ms {
            if self.triggers.load(Ordering::Acquire) > 0 {
                let since_last = now.since(Millis(self.last_trigger.load(Ordering::Acquire)));
                if (0..window as i32).contains(&since_last) {
                    return false;
                }
            }
        }
        self.last_trigger.store(now.as_u32(), Ordering::Release);
        self.triggers.fetch_add(1, Ordering::AcqRel);
        self.pending.store(true, Ordering::Release);
        self.idle.store(false, Ordering::Release);
        true
    }

    /// Re-evaluates and returns the display mode. Call once per rendered frame.
    ///
    /// A trigger recorded since the previous poll always yields [`DisplayMode::Active`]; otherwise
    /// the mode is [`DisplayMode::Idle`] exactly when the idle threshold has elapsed since the last
    /// trigger. Once idle, the monitor stays idle until the next trigger, however long the counter
    /// runs in between.
    pub fn poll(&self, now: Millis) -> DisplayMode {
        if self.pending.swap(false, Ordering::AcqRel) {
            self.idle.store(false, Ordering::Release);
            return DisplayMode::Active;
        }
        if self.idle.load(Ordering::Acquire) {
            return DisplayMode::Idle;
        }
        let since_last = now.since(Millis(self.last_trigger.load(Ordering::Acquire)));
        let idle = since_last >= self.config.idle_threshold_ms as i32;
        self.idle.store(idle, Ordering::Release);
        if idle {
            DisplayMode::Idle
        } else {
            DisplayMode::Active
        }
    }

    /// The idle flag as of the last poll or trigger.
    pub fn is_idle(&self) -> bool {
        self.idle.load(Ordering::Acquire)
    }

    /// Number of triggers accepted so far. Wraps.
    pub fn trigger_count(&self) -> u32 {
        self.triggers.load(Ordering::Acquire)
    }

    /// Time of the last accepted trigger, or of construction if there has been none.
    pub fn last_trigger(&self) -> Millis {
        Millis(self.last_trigger.load(Ordering::Acquire))
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn monitor(debounce_ms: Option<u32>) -> IdleMonitor {
        IdleMonitor::new(
            TriggerConfig {
                idle_threshold_ms: 3000,
                debounce_ms,
            },
            Millis(0),
        )
    }

    #[test]
    fn when_below_threshold_then_active() {
        let monitor = monitor(None);
        monitor.on_trigger(Millis(0));

        for t in 0..3000 {
            assert_eq!(monitor.poll(Millis(t)), DisplayMode::Active, "at {t}");
            assert!(!monitor.is_idle());
        }
    }

    #[test]
    fn when_threshold_reached_then_idle() {
        let monitor = monitor(None);
        monitor.on_trigger(Millis(0));
        monitor.poll(Millis(0));

        assert_eq!(monitor.poll(Millis(2999)), DisplayMode::Active);
        assert_eq!(monitor.poll(Millis(3000)), DisplayMode::Idle);
        assert!(monitor.is_idle());
        assert_eq!(monitor.poll(Millis(60_000)), DisplayMode::Idle);
    }

    #[test]
    fn when_triggered_while_idle_then_next_poll_active() {
        let monitor = monitor(None);
        monitor.on_trigger(Millis(0));
        assert_eq!(monitor.poll(Millis(3000)), DisplayMode::Idle);

        monitor.on_trigger(Millis(3500));

        assert!(!monitor.is_idle());
        assert_eq!(monitor.poll(Millis(3500)), DisplayMode::Active);
        assert_eq!(monitor.poll(Millis(6499)), DisplayMode::Active);
        assert_eq!(monitor.poll(Millis(6500)), DisplayMode::Idle);
    }

    #[test]
    fn when_pending_trigger_then_active_regardless_of_elapsed_time() {
        let monitor = monitor(None);
        // Trigger stamped with an old reading, polled much later.
        monitor.on_trigger(Millis(10));

        assert_eq!(monitor.poll(Millis(90_000)), DisplayMode::Active);
        assert_eq!(monitor.poll(Millis(90_001)), DisplayMode::Idle);
    }

    #[test]
    fn when_idle_for_weeks_then_stays_idle() {
        let monitor = monitor(None);
        assert_eq!(monitor.poll(Millis(3000)), DisplayMode::Idle);

        let weeks_later = Millis(0) + (i32::MAX as u32 + 10);
        assert_eq!(monitor.poll(weeks_later), DisplayMode::Idle);
        assert_eq!(monitor.poll(Millis(0) + u32::MAX), DisplayMode::Idle);
        assert_eq!(monitor.poll(Millis(5)), DisplayMode::Idle);

        monitor.on_trigger(Millis(5));
        assert_eq!(monitor.poll(Millis(5)), DisplayMode::Active);
        assert_eq!(monitor.poll(Millis(3005)), DisplayMode::Idle);
    }

    #[test]
    fn when_never_triggered_then_idles_from_construction() {
        let monitor = IdleMonitor::new(TriggerConfig::default(), Millis(1000));

        assert_eq!(monitor.poll(Millis(3999)), DisplayMode::Active);
        assert_eq!(monitor.poll(Millis(4000)), DisplayMode::Idle);
        assert_eq!(monitor.trigger_count(), 0);
    }

    #[test]
    fn when_debounced_then_close_triggers_collapse() {
        let monitor = monitor(Some(50));

        assert!(monitor.on_trigger(Millis(100)));
        assert!(!monitor.on_trigger(Millis(110)));

        assert_eq!(monitor.last_trigger(), Millis(100));
        assert_eq!(monitor.trigger_count(), 1);

        assert!(monitor.on_trigger(Millis(150)));
        assert_eq!(monitor.last_trigger(), Millis(150));
        assert_eq!(monitor.trigger_count(), 2);
    }

    #[test]
    fn when_not_debounced_then_every_trigger_counts() {
        let monitor = monitor(None);

        assert!(monitor.on_trigger(Millis(100)));
        assert!(monitor.on_trigger(Millis(110)));

        assert_eq!(monitor.last_trigger(), Millis(110));
        assert_eq!(monitor.trigger_count(), 2);
    }

    #[test]
    fn when_first_trigger_then_debounce_does_not_apply() {
        // Construction time is not a trigger, so a trigger right after it is accepted.
        let monitor = IdleMonitor::new(
            TriggerConfig {
                idle_threshold_ms: 3000,
                debounce_ms: Some(50),
            },
            Millis(0),
        );

        assert!(monitor.on_trigger(Millis(5)));
    }

    #[test]
    fn triggers_from_another_thread_are_seen_by_poll() {
        let monitor = Arc::new(monitor(None));
        assert_eq!(monitor.poll(Millis(5000)), DisplayMode::Idle);

        let handle = {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || {
                for t in 0..100 {
                    monitor.on_trigger(Millis(5000 + t));
                }
            })
        };
        handle.join().unwrap();

        assert_eq!(monitor.trigger_count(), 100);
        assert_eq!(monitor.poll(Millis(5100)), DisplayMode::Active);
        assert_eq!(monitor.poll(Millis(5101)), DisplayMode::Active);
    }
}
