//! Device-wide connection and traffic state.
//!
//! Written by the bridge on USB events and transfer completions, read by the
//! status indicator. Reads are advisory: nothing in the flow controllers
//! depends on this value.

use portable_atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceActivity {
    NotMounted = 0,
    /// Configured by the host, no recent traffic.
    Mounted = 1,
    Suspended = 2,
    /// A transfer completed since the indicator last settled.
    Active = 3,
}

impl DeviceActivity {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => DeviceActivity::Mounted,
            2 => DeviceActivity::Suspended,
            3 => DeviceActivity::Active,
            _ => DeviceActivity::NotMounted,
        }
    }
}

/// Lock-free holder for the current [`DeviceActivity`].
///
/// Can live in a `static` and be shared between the bridge and the indicator.
#[derive(Debug)]
pub struct ActivityMonitor {
    state: AtomicU8,
}

impl ActivityMonitor {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(DeviceActivity::NotMounted as u8),
        }
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> DeviceActivity {
        DeviceActivity::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, activity: DeviceActivity) {
        self.state.store(activity as u8, Ordering::Release);
    }

    /// Record a completed transfer.
    ///
    /// Only a mounted device becomes `Active`; suspend and unmount win.
    pub fn record_transfer(&self) {
        let _ = self.state.compare_exchange(
            DeviceActivity::Mounted as u8,
            DeviceActivity::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Return from `Active` to `Mounted` once the activity pulse is shown.
    pub fn settle(&self) {
        let _ = self.state.compare_exchange(
            DeviceActivity::Active as u8,
            DeviceActivity::Mounted as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Whether the host has configured the device.
    #[inline]
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        matches!(
            self.current(),
            DeviceActivity::Mounted | DeviceActivity::Active
        )
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}
