//! Error definitions shared across the gateway modules.
//! Each type models a specific failure scenario (configuration checks,
//! channel bring-up, frame transmission).
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Configuration rejected before the gateway starts ticking.
pub enum ConfigError {
    /// An enabled channel must declare a non-zero nominal bit rate.
    #[error("Channel {channel} is enabled with a nominal speed of 0")]
    ZeroNominalSpeed { channel: usize },
    /// The idle warning must fire strictly before the shutdown.
    #[error("Warning timeout must be shorter than the shutdown timeout")]
    InvalidTimeouts,
    /// Channel index outside `[0, N)`.
    #[error("Channel {channel} does not exist")]
    InvalidChannel { channel: usize },
    /// The sink headroom swallows the whole buffer.
    #[error("Sink headroom must be smaller than the sink capacity")]
    InvalidSinkLimits,
}

#[derive(Error, Debug)]
/// Failures while bringing a single channel up. They are logged and recorded
/// in the setup report, never propagated out of `setup`.
pub enum ChannelSetupError<E: core::fmt::Debug> {
    /// `begin` or `begin_fd` failed; the channel stays disabled.
    #[error("Controller start failed: {0:?}")]
    Begin(E),
    /// Routing the standby pin through the controller registers failed.
    #[error("Standby pin configuration failed: {0:?}")]
    StandbyPin(E),
}

#[derive(Error, Debug)]
/// Errors returned when transmitting a frame through the manager.
pub enum SendError<E: core::fmt::Debug> {
    /// Channel index outside `[0, N)`.
    #[error("Channel {channel} does not exist")]
    InvalidChannel { channel: usize },
    /// The channel is disabled (by configuration or after a failed start).
    #[error("Channel {channel} is disabled")]
    ChannelDisabled { channel: usize },
    /// An FD frame was submitted to a channel running in classic mode.
    #[error("Channel {channel} is not running in FD mode")]
    ModeMismatch { channel: usize },
    /// The controller refused the frame.
    #[error("CAN controller send error: {0:?}")]
    Hardware(E),
}
