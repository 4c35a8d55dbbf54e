//! Per-channel bus load estimation: a rolling bit counter converted every
//! [`BUS_LOAD_WINDOW_MS`] into a smoothed percentage.
//!
//! # Smoothing
//!
//! ```text
//! raw  = min(999, bits * 1000 / bits_per_window) / 10      (0..=99)
//! load = (load * 3 + raw) / 4                              (25 % weight per window)
//! ```
//!
//! Any traffic in a window yields at least 1 %, so an activity indicator
//! lights up even for a single frame on an idle bus.
use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::{Duration, Instant};

use crate::config::{BusConfig, BUS_LOAD_WINDOW_MS, DEFAULT_BITS_PER_WINDOW};
use crate::frame::Frame;

//==================================================================================BUS_LOAD_STATE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Load accounting for one channel.
pub struct BusLoadState {
    /// Bits the bus can carry in one window; never zero.
    pub bits_per_window: u32,
    /// Bits observed since the last rollover.
    pub bits_accumulated: u32,
    /// Smoothed load, 0..=100.
    pub load_percent: u8,
}

impl Default for BusLoadState {
    fn default() -> Self {
        Self::new()
    }
}

impl BusLoadState {
    pub const fn new() -> Self {
        Self {
            bits_per_window: DEFAULT_BITS_PER_WINDOW,
            bits_accumulated: 0,
            load_percent: 0,
        }
    }

    /// Start over for a (re)configured channel.
    pub fn reset(&mut self, config: &BusConfig) {
        self.bits_per_window = config.bits_per_window();
        self.bits_accumulated = 0;
        self.load_percent = 0;
    }

    /// Account for one frame seen on the bus.
    #[inline]
    pub fn add_frame(&mut self, frame: &Frame) {
        self.bits_accumulated = self.bits_accumulated.saturating_add(frame.wire_bits());
    }

    /// Close the current window and fold it into the smoothed load.
    ///
    /// `config` supplies the nominal speed for the next window, so a speed
    /// change made between ticks is picked up here.
    pub fn roll_window(&mut self, config: &BusConfig) {
        let window = self.bits_per_window.max(1) as u64;
        let raw = (self.bits_accumulated as u64 * 1000 / window).min(999) / 10;
        let smoothed = (self.load_percent as u64 * 3 + raw) / 4;

        self.load_percent = if smoothed == 0 && self.bits_accumulated > 0 {
            1
        } else {
            smoothed.min(100) as u8
        };
        self.bits_accumulated = 0;
        self.bits_per_window = config.bits_per_window();
    }
}

//==================================================================================BUS_LOAD_ESTIMATOR
/// Load states for all `N` channels plus the shared window timer.
#[derive(Debug, Clone, Copy)]
pub struct BusLoadEstimator<const N: usize> {
    states: [BusLoadState; N],
    window_started: Instant,
}

impl<const N: usize> BusLoadEstimator<N> {
    pub const fn new() -> Self {
        Self {
            states: [BusLoadState::new(); N],
            window_started: Instant::from_ticks(0),
        }
    }

    /// Re-seed every channel from its configuration and restart the window.
    pub fn reset(&mut self, buses: &[BusConfig; N], now: Instant) {
        for (state, config) in self.states.iter_mut().zip(buses.iter()) {
            state.reset(config);
        }
        self.window_started = now;
    }

    /// Re-seed one channel; out-of-range indices are ignored.
    pub fn reset_channel(&mut self, channel: usize, config: &BusConfig) {
        if let Some(state) = self.states.get_mut(channel) {
            state.reset(config);
        }
    }

    /// Count a frame against `channel`. Out-of-range indices are ignored.
    pub fn add_bits(&mut self, channel: usize, frame: &Frame) {
        if let Some(state) = self.states.get_mut(channel) {
            state.add_frame(frame);
        }
    }

    /// Roll every channel over if a full window elapsed since the last
    /// rollover. Returns `true` when a rollover happened.
    pub fn roll_if_due(&mut self, buses: &[BusConfig; N], now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.window_started);
        if elapsed < Duration::from_millis(BUS_LOAD_WINDOW_MS) {
            return false;
        }
        self.window_started = now;
        for (state, config) in self.states.iter_mut().zip(buses.iter()) {
            state.roll_window(config);
        }
        true
    }

    /// State of one channel.
    pub fn state(&self, channel: usize) -> Option<&BusLoadState> {
        self.states.get(channel)
    }

    /// Smoothed load of one channel, 0 for unknown indices.
    pub fn load_percent(&self, channel: usize) -> u8 {
        self.states.get(channel).map_or(0, |s| s.load_percent)
    }

    /// Load of every channel, indexed by channel number.
    pub fn snapshot(&self) -> [u8; N] {
        let mut loads = [0u8; N];
        for (load, state) in loads.iter_mut().zip(self.states.iter()) {
            *load = state.load_percent;
        }
        loads
    }

    /// Load of the busiest channel; drives the activity indicator.
    pub fn peak_load_percent(&self) -> u8 {
        self.states
            .iter()
            .map(|s| s.load_percent)
            .max()
            .unwrap_or(0)
    }
}

impl<const N: usize> Default for BusLoadEstimator<N> {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================LOAD_TELEMETRY
/// Load percentages published for tasks outside the dispatch loop (status
/// LED, host status replies).
///
/// Firmware allocates it statically and hands a reference to the manager:
///
/// ```rust,ignore
/// static LOADS: LoadTelemetry<2> = LoadTelemetry::new();
/// let manager = CanManager::new(config, channels, board, &WAKE)?.with_telemetry(&LOADS);
/// ```
pub struct LoadTelemetry<const N: usize> {
    loads: Mutex<CriticalSectionRawMutex, Cell<[u8; N]>>,
}

impl<const N: usize> LoadTelemetry<N> {
    pub const fn new() -> Self {
        Self {
            loads: Mutex::new(Cell::new([0u8; N])),
        }
    }

    /// Replace the published values.
    pub fn publish(&self, loads: [u8; N]) {
        self.loads.lock(|cell| cell.set(loads));
    }

    /// Last published values.
    pub fn snapshot(&self) -> [u8; N] {
        self.loads.lock(|cell| cell.get())
    }

    /// Busiest channel among the published values.
    pub fn peak(&self) -> u8 {
        self.snapshot().into_iter().max().unwrap_or(0)
    }
}

impl<const N: usize> Default for LoadTelemetry<N> {
    fn default() -> Self {
        Self::new()
    }
}
