//! Activity-driven power management: idle warning, rail shutdown, light
//! sleep, and interrupt wake.
//!
//! ```text
//!            idle >= T_warn                 idle >= T_shutdown
//!  Active ------------------> WarningIssued -------------------> Sleeping
//!    ^  ^                          |                                |
//!    |  +------- activity ---------+                                |
//!    +------------------------- wake interrupt ---------------------+
//! ```
//!
//! The only state shared with the interrupt is the [`WakeFlag`]; everything
//! else in this module is touched by the main loop alone.
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::Instant;

use crate::config::PowerTimeouts;

//==================================================================================WAKE_FLAG
/// Sleep flag shared between the main loop and the wake interrupt.
///
/// Uses plain atomic loads and stores (no read-modify-write instructions),
/// so it also works on cores without CAS support. Usually placed in a
/// `static`:
///
/// ```
/// use can_gateway_core::manager::power::WakeFlag;
///
/// static WAKE: WakeFlag = WakeFlag::new();
///
/// // Inside the GPIO interrupt handler bound to the CAN activity pin:
/// fn on_can_activity_pin() {
///     WAKE.on_wake_interrupt();
/// }
/// # on_can_activity_pin();
/// # assert!(!WAKE.is_sleeping());
/// ```
#[derive(Debug)]
pub struct WakeFlag {
    sleeping: AtomicBool,
    wake_pending: AtomicBool,
}

impl WakeFlag {
    pub const fn new() -> Self {
        Self {
            sleeping: AtomicBool::new(false),
            wake_pending: AtomicBool::new(false),
        }
    }

    /// Wake handler body. Clears the sleep flag and leaves a note for the
    /// main loop; does nothing while already awake.
    #[inline]
    pub fn on_wake_interrupt(&self) {
        if self.sleeping.load(Ordering::Acquire) {
            self.wake_pending.store(true, Ordering::Relaxed);
            self.sleeping.store(false, Ordering::Release);
        }
    }

    /// Whether the main loop is (or is about to be) suspended.
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.sleeping.load(Ordering::Acquire)
    }

    /// Mark the main loop as suspended. Called right before entering sleep.
    pub(crate) fn enter_sleep(&self) {
        self.wake_pending.store(false, Ordering::Relaxed);
        self.sleeping.store(true, Ordering::Release);
    }

    /// Whether a wake happened that the main loop has not processed yet.
    #[inline]
    pub(crate) fn wake_pending(&self) -> bool {
        self.wake_pending.load(Ordering::Acquire)
    }

    /// Consume the wake note left by the interrupt.
    pub(crate) fn take_wake(&self) -> bool {
        if self.wake_pending.load(Ordering::Acquire) {
            self.wake_pending.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }
}

impl Default for WakeFlag {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================POWER_STATE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Observable power state.
pub enum PowerState {
    /// Normal operation; rail powered (or waiting for traffic after a wake).
    Active,
    /// Idle long enough to announce the coming shutdown.
    WarningIssued,
    /// Rail cut, MCU suspended until the wake interrupt.
    Sleeping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Hardware action the manager must apply after a tick.
pub enum PowerAction {
    /// Nothing to do.
    None,
    /// Traffic seen: keep the rail HIGH.
    HoldRail,
    /// Log the shutdown warning; no hardware effect.
    IssueWarning,
    /// Cut the rail and enter light sleep.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Power transitions reported to the caller of `tick`.
pub enum PowerEvent {
    /// Processed a wake after sleeping.
    Woke,
    /// Idle warning issued.
    ShutdownWarning,
    /// Rail cut and MCU suspended; reported once the MCU runs again.
    Shutdown,
}

//==================================================================================POWER_STATE_MACHINE
/// Idle timer and warning latch. The sleep flag itself lives in the
/// borrowed [`WakeFlag`].
#[derive(Debug)]
pub struct PowerStateMachine<'w> {
    wake: &'w WakeFlag,
    timeouts: PowerTimeouts,
    last_activity: Instant,
    warning_issued: bool,
}

impl<'w> PowerStateMachine<'w> {
    pub fn new(wake: &'w WakeFlag, timeouts: PowerTimeouts) -> Self {
        Self {
            wake,
            timeouts,
            last_activity: Instant::from_ticks(0),
            warning_issued: false,
        }
    }

    /// Current state. A wake not yet processed by the main loop already
    /// counts as `Active`.
    pub fn state(&self) -> PowerState {
        if self.wake.is_sleeping() {
            PowerState::Sleeping
        } else if self.warning_issued && !self.wake.wake_pending() {
            PowerState::WarningIssued
        } else {
            PowerState::Active
        }
    }

    /// Instant of the last observed activity (or seed / wake).
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Restart the idle timer from `now`, e.g. at boot.
    pub fn seed(&mut self, now: Instant) {
        self.last_activity = now;
        self.warning_issued = false;
    }

    /// Handle a pending wake. Returns `true` when one was consumed.
    ///
    /// The idle timer restarts from `now`, so a wake that brings no traffic
    /// still walks through the warning before sleeping again.
    pub fn resume(&mut self, now: Instant) -> bool {
        if !self.wake.take_wake() {
            return false;
        }
        self.seed(now);
        true
    }

    /// Evaluate one tick after all channels were drained.
    pub fn observe(&mut self, activity: bool, now: Instant) -> PowerAction {
        if activity {
            self.seed(now);
            return PowerAction::HoldRail;
        }

        let idle = now.saturating_duration_since(self.last_activity);
        match self.state() {
            PowerState::Active if idle >= self.timeouts.warning => {
                self.warning_issued = true;
                PowerAction::IssueWarning
            }
            PowerState::WarningIssued if idle >= self.timeouts.shutdown => {
                PowerAction::Shutdown
            }
            _ => PowerAction::None,
        }
    }

    /// Flag the suspend; the caller then cuts the rail and sleeps.
    pub fn enter_sleep(&mut self) {
        self.wake.enter_sleep();
    }

    /// Called once the suspend returned. A wake without the interrupt having
    /// run (spurious wake) is turned into a regular one.
    pub fn after_sleep(&mut self) {
        if self.wake.is_sleeping() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Woke up without CAN activity interrupt");
            self.wake.on_wake_interrupt();
        }
    }
}
