//! Static gateway configuration: per-channel bus settings, board variant,
//! sink buffer limits and power timeouts.
//!
//! ## Timing and sizing constants
//!
//! These constants are the defaults used by [`GatewayConfig::new`]. Every
//! value can be overridden through the builder methods before the manager
//! is constructed.
use embassy_time::Duration;

use crate::error::ConfigError;

/// Length of one bus-load accounting window (ms).
///
/// Four windows per second; the smoothed load therefore settles after
/// roughly one second of steady traffic.
pub const BUS_LOAD_WINDOW_MS: u64 = 250;

/// Bits per window used when a channel has no nominal speed configured.
///
/// Corresponds to a 500 kbit/s bus (500 000 / 4). Keeps the load division
/// well defined for channels that are disabled or not yet configured.
pub const DEFAULT_BITS_PER_WINDOW: u32 = 125_000;

/// Capacity of the downstream transport buffers (bytes).
pub const DEFAULT_SINK_BUFFER_SIZE: usize = 2048;

/// Free space kept in the transport buffers before reading stops (bytes).
///
/// One GVRET-encoded classic frame is well below 80 bytes, so a frame read
/// while the backlog sits just under the ceiling still fits.
pub const DEFAULT_SINK_HEADROOM: usize = 80;

/// Idle time before the shutdown warning is logged (ms).
pub const DEFAULT_WARNING_TIMEOUT_MS: u64 = 30_000;

/// Idle time before the power rail is cut and the MCU sleeps (ms).
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 60_000;

/// Pause between two dispatcher ticks when driven by `CanManager::run` (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 1;

//==================================================================================BUS_CONFIG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Settings of one CAN channel.
pub struct BusConfig {
    /// Whether the channel is brought up at all.
    pub enabled: bool,
    /// Receive-only mode (no ACK, no arbitration).
    pub listen_only: bool,
    /// Request CAN FD operation. Ignored on controllers without FD support.
    pub fd_mode: bool,
    /// Nominal (arbitration) bit rate in bit/s.
    pub nominal_speed: u32,
    /// FD data-phase bit rate in bit/s.
    pub fd_data_speed: u32,
}

impl BusConfig {
    /// A disabled channel.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            listen_only: false,
            fd_mode: false,
            nominal_speed: 0,
            fd_data_speed: 0,
        }
    }

    /// An enabled classic channel at `nominal_speed` bit/s.
    pub const fn classic(nominal_speed: u32) -> Self {
        Self {
            enabled: true,
            listen_only: false,
            fd_mode: false,
            nominal_speed,
            fd_data_speed: 0,
        }
    }

    /// An enabled FD channel.
    pub const fn fd(nominal_speed: u32, fd_data_speed: u32) -> Self {
        Self {
            enabled: true,
            listen_only: false,
            fd_mode: true,
            nominal_speed,
            fd_data_speed,
        }
    }

    /// Toggle receive-only operation.
    pub const fn with_listen_only(mut self, listen_only: bool) -> Self {
        self.listen_only = listen_only;
        self
    }

    /// Bits available in one load window, never zero.
    pub const fn bits_per_window(&self) -> u32 {
        match self.nominal_speed / 4 {
            0 => DEFAULT_BITS_PER_WINDOW,
            bits => bits,
        }
    }

    /// Check the per-channel invariants.
    pub fn validate(&self, channel: usize) -> Result<(), ConfigError> {
        if self.enabled && self.nominal_speed == 0 {
            return Err(ConfigError::ZeroNominalSpeed { channel });
        }
        Ok(())
    }
}

//==================================================================================SYSTEM_VARIANT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Board family the core runs on.
pub enum SystemVariant {
    /// One transceiver per channel, nothing shared.
    #[default]
    Standard,
    /// Channels 0 and 1 share a transceiver through a select line (HIGH
    /// routes channel 0, LOW routes channel 1), and channels 1.. sit on
    /// MCP2517FD controllers whose GPIO0 drives the transceiver standby.
    SharedTransceiver,
}

impl SystemVariant {
    /// Whether channels 0 and 1 are multiplexed onto one transceiver.
    pub const fn shares_transceiver(&self) -> bool {
        matches!(self, SystemVariant::SharedTransceiver)
    }

    /// Whether `channel` needs the standby-pin register patch after start-up.
    pub const fn needs_standby_pin(&self, channel: usize) -> bool {
        matches!(self, SystemVariant::SharedTransceiver) && channel >= 1
    }
}

//==================================================================================SINK_LIMITS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Backpressure ceiling applied to the downstream transport buffers.
pub struct SinkLimits {
    /// Size of the transport buffer (bytes).
    pub capacity: usize,
    /// Space kept free before reading stops (bytes).
    pub headroom: usize,
}

impl SinkLimits {
    /// Reading stops once the largest sink backlog reaches this value.
    pub const fn ceiling(&self) -> usize {
        self.capacity.saturating_sub(self.headroom)
    }

    /// Whether another frame may be read with `backlog` bytes pending.
    #[inline]
    pub const fn admits(&self, backlog: usize) -> bool {
        backlog < self.ceiling()
    }
}

impl Default for SinkLimits {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SINK_BUFFER_SIZE,
            headroom: DEFAULT_SINK_HEADROOM,
        }
    }
}

//==================================================================================POWER_TIMEOUTS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Idle thresholds, both measured from the last observed activity.
pub struct PowerTimeouts {
    /// Idle time before the shutdown warning.
    pub warning: Duration,
    /// Idle time before the rail is cut and the MCU sleeps.
    pub shutdown: Duration,
}

impl Default for PowerTimeouts {
    fn default() -> Self {
        Self {
            warning: Duration::from_millis(DEFAULT_WARNING_TIMEOUT_MS),
            shutdown: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
        }
    }
}

//==================================================================================GATEWAY_CONFIG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Complete configuration for a gateway with `N` channels.
///
/// # Example
///
/// ```
/// use can_gateway_core::config::{BusConfig, GatewayConfig, SystemVariant};
///
/// let config = GatewayConfig::new([BusConfig::classic(500_000), BusConfig::disabled()])
///     .with_variant(SystemVariant::Standard)
///     .with_timeouts_ms(10_000, 20_000);
///
/// assert!(config.validate().is_ok());
/// ```
pub struct GatewayConfig<const N: usize> {
    /// Per-channel settings, indexed by channel number.
    pub buses: [BusConfig; N],
    /// Board family.
    pub variant: SystemVariant,
    /// Transport buffer ceiling.
    pub sink_limits: SinkLimits,
    /// Idle warning / shutdown thresholds.
    pub timeouts: PowerTimeouts,
    /// Pause between ticks in `CanManager::run` (ms).
    pub poll_interval_ms: u32,
}

impl<const N: usize> GatewayConfig<N> {
    /// Configuration with default limits and timeouts.
    pub fn new(buses: [BusConfig; N]) -> Self {
        Self {
            buses,
            variant: SystemVariant::default(),
            sink_limits: SinkLimits::default(),
            timeouts: PowerTimeouts::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn with_variant(mut self, variant: SystemVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_sink_limits(mut self, capacity: usize, headroom: usize) -> Self {
        self.sink_limits = SinkLimits { capacity, headroom };
        self
    }

    pub fn with_timeouts_ms(mut self, warning_ms: u64, shutdown_ms: u64) -> Self {
        self.timeouts = PowerTimeouts {
            warning: Duration::from_millis(warning_ms),
            shutdown: Duration::from_millis(shutdown_ms),
        };
        self
    }

    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u32) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Check every invariant once, before the manager starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (channel, bus) in self.buses.iter().enumerate() {
            bus.validate(channel)?;
        }
        if self.timeouts.warning >= self.timeouts.shutdown {
            return Err(ConfigError::InvalidTimeouts);
        }
        if self.sink_limits.ceiling() == 0 {
            return Err(ConfigError::InvalidSinkLimits);
        }
        Ok(())
    }
}

//==================================================================================OUTPUT_MODE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Runtime flags selecting which sink receives the traffic. These change
/// while the gateway runs (a host switching to Lawicel, Wi-Fi connecting).
pub struct OutputMode {
    /// Lawicel support is compiled in / allowed by the settings.
    pub lawicel_enabled: bool,
    /// The host switched the console to Lawicel mode.
    pub lawicel_mode: bool,
    /// A Wi-Fi GVRET client is connected.
    pub wifi_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// The single sink a frame is forwarded to.
pub enum ActiveSink {
    Lawicel,
    Wifi,
    Serial,
}

impl OutputMode {
    /// Lawicel wins when enabled and selected, then Wi-Fi, then serial.
    pub const fn active_sink(&self) -> ActiveSink {
        if self.lawicel_enabled && self.lawicel_mode {
            ActiveSink::Lawicel
        } else if self.wifi_active {
            ActiveSink::Wifi
        } else {
            ActiveSink::Serial
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
