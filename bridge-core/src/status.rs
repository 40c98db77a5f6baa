//! Status indicator blink patterns.
//!
//! | State       | Pattern                                  |
//! |-------------|------------------------------------------|
//! | NotMounted  | toggle every 2000 ms                     |
//! | Mounted     | continuously on                          |
//! | Suspended   | toggle every 500 ms                      |
//! | Active      | off for 100 ms, then back to Mounted     |
//!
//! [`StatusIndicator::tick`] is meant to be called from a single periodic
//! task; it keeps its own timing and only reads the shared
//! [`ActivityMonitor`].

use crate::activity::{ActivityMonitor, DeviceActivity};

pub const NOT_MOUNTED_PERIOD_MS: u64 = 2000;
pub const SUSPENDED_PERIOD_MS: u64 = 500;
pub const ACTIVITY_PULSE_MS: u64 = 100;

/// Output level of the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorLevel {
    On,
    Off,
}

impl IndicatorLevel {
    #[inline]
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            IndicatorLevel::On => IndicatorLevel::Off,
            IndicatorLevel::Off => IndicatorLevel::On,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, IndicatorLevel::On)
    }
}

/// Blink state machine driven by a millisecond clock.
#[derive(Debug, Clone)]
pub struct StatusIndicator {
    level: IndicatorLevel,
    previous: Option<DeviceActivity>,
    /// Start of the current blink period, or end of the activity pulse.
    mark_ms: u64,
}

impl StatusIndicator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: IndicatorLevel::Off,
            previous: None,
            mark_ms: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn level(&self) -> IndicatorLevel {
        self.level
    }

    /// Advance to `now_ms` and return the level to drive.
    pub fn tick(&mut self, now_ms: u64, monitor: &ActivityMonitor) -> IndicatorLevel {
        let state = monitor.current();
        let entered = self.previous != Some(state);

        match state {
            DeviceActivity::Mounted => {
                self.level = IndicatorLevel::On;
            }
            DeviceActivity::Active => {
                if entered {
                    self.level = IndicatorLevel::Off;
                    self.mark_ms = now_ms + ACTIVITY_PULSE_MS;
                } else if now_ms >= self.mark_ms {
                    self.level = IndicatorLevel::On;
                    monitor.settle();
                }
            }
            DeviceActivity::NotMounted | DeviceActivity::Suspended => {
                let period = if state == DeviceActivity::NotMounted {
                    NOT_MOUNTED_PERIOD_MS
                } else {
                    SUSPENDED_PERIOD_MS
                };
                if entered {
                    self.level = self.level.toggled();
                    self.mark_ms = now_ms;
                } else if now_ms.saturating_sub(self.mark_ms) >= period {
                    self.mark_ms += period;
                    self.level = self.level.toggled();
                }
            }
        }

        self.previous = Some(state);
        self.level
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_mounted_toggles_every_two_seconds() {
        let monitor = ActivityMonitor::new();
        let mut led = StatusIndicator::new();

        let first = led.tick(0, &monitor);
        assert_eq!(first, IndicatorLevel::On);
        assert_eq!(led.tick(1999, &monitor), first);
        assert_eq!(led.tick(2000, &monitor), first.toggled());
        assert_eq!(led.tick(3999, &monitor), first.toggled());
        assert_eq!(led.tick(4000, &monitor), first);
    }

    #[test]
    fn test_suspended_uses_shorter_period() {
        let monitor = ActivityMonitor::new();
        monitor.set(DeviceActivity::Suspended);
        let mut led = StatusIndicator::new();

        let first = led.tick(10, &monitor);
        assert_eq!(led.tick(509, &monitor), first);
        assert_eq!(led.tick(510, &monitor), first.toggled());
        assert_eq!(led.tick(1010, &monitor), first);
    }

    #[test]
    fn test_mounted_is_continuously_on() {
        let monitor = ActivityMonitor::new();
        monitor.set(DeviceActivity::Mounted);
        let mut led = StatusIndicator::new();

        for now in [0, 100, 5000, 100_000] {
            assert_eq!(led.tick(now, &monitor), IndicatorLevel::On);
        }
    }

    #[test]
    fn test_activity_pulses_then_settles() {
        let monitor = ActivityMonitor::new();
        monitor.set(DeviceActivity::Mounted);
        let mut led = StatusIndicator::new();
        assert_eq!(led.tick(0, &monitor), IndicatorLevel::On);

        monitor.record_transfer();
        assert_eq!(led.tick(10, &monitor), IndicatorLevel::Off);
        assert_eq!(led.tick(50, &monitor), IndicatorLevel::Off);
        assert_eq!(monitor.current(), DeviceActivity::Active);

        assert_eq!(led.tick(110, &monitor), IndicatorLevel::On);
        assert_eq!(monitor.current(), DeviceActivity::Mounted);
        assert_eq!(led.tick(120, &monitor), IndicatorLevel::On);
    }

    #[test]
    fn test_unmount_during_pulse_resumes_blinking() {
        let monitor = ActivityMonitor::new();
        monitor.set(DeviceActivity::Mounted);
        let mut led = StatusIndicator::new();
        led.tick(0, &monitor);
        monitor.record_transfer();
        assert_eq!(led.tick(10, &monitor), IndicatorLevel::Off);

        monitor.set(DeviceActivity::NotMounted);
        // Entering NotMounted toggles right away
        assert_eq!(led.tick(20, &monitor), IndicatorLevel::On);
        assert_eq!(led.tick(2020, &monitor), IndicatorLevel::Off);
    }
}
