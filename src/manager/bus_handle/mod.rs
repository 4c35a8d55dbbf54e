//! Per-channel handle: owns one [`CanChannel`] and remembers the mode the
//! channel actually runs in after start-up (which may differ from the
//! requested one when FD is not supported).
use crate::config::BusConfig;
use crate::error::{ChannelSetupError, SendError};
use crate::frame::Frame;
use crate::traits::can_channel::CanChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Mode a channel is running in.
pub enum ChannelMode {
    /// Not started, disabled by configuration, or failed to start.
    Disabled,
    /// Classic CAN 2.0.
    Classic,
    /// CAN FD.
    Fd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Outcome of bringing one channel up.
pub enum ChannelStatus {
    /// Disabled by configuration.
    Disabled,
    /// Running in classic mode as requested.
    Classic,
    /// Running in FD mode as requested.
    Fd,
    /// FD requested but unsupported by the controller; running classic.
    FdFallback,
    /// The controller refused to start; disabled for the session.
    Failed,
}

impl ChannelStatus {
    /// Whether the channel ended up receiving traffic.
    pub const fn is_running(&self) -> bool {
        matches!(
            self,
            ChannelStatus::Classic | ChannelStatus::Fd | ChannelStatus::FdFallback
        )
    }
}

//==================================================================================BUS_HANDLE
/// Exclusive owner of one channel's hardware.
pub struct BusHandle<C: CanChannel> {
    channel: C,
    mode: ChannelMode,
}

impl<C: CanChannel> BusHandle<C> {
    /// Wrap a channel that has not been started yet.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            mode: ChannelMode::Disabled,
        }
    }

    /// Bring the channel up (or down) according to `config`.
    ///
    /// FD is used only when requested *and* supported; otherwise the classic
    /// path runs and [`ChannelStatus::FdFallback`] is reported. Listen-only is
    /// applied on both paths, then the wake filter is armed.
    pub fn start(&mut self, config: &BusConfig) -> Result<ChannelStatus, ChannelSetupError<C::Error>> {
        if !config.enabled {
            self.channel.disable();
            self.mode = ChannelMode::Disabled;
            return Ok(ChannelStatus::Disabled);
        }

        self.channel.enable();
        let use_fd = config.fd_mode && self.channel.supports_fd();
        let started = if use_fd {
            self.channel
                .begin_fd(config.nominal_speed, config.fd_data_speed)
        } else {
            self.channel.begin(config.nominal_speed)
        };

        if let Err(err) = started {
            self.channel.disable();
            self.mode = ChannelMode::Disabled;
            return Err(ChannelSetupError::Begin(err));
        }

        self.channel.set_listen_only(config.listen_only);
        self.channel.arm_wake_filter();

        if use_fd {
            self.mode = ChannelMode::Fd;
            Ok(ChannelStatus::Fd)
        } else {
            self.mode = ChannelMode::Classic;
            if config.fd_mode {
                Ok(ChannelStatus::FdFallback)
            } else {
                Ok(ChannelStatus::Classic)
            }
        }
    }

    /// Apply the controller-specific standby-pin routing.
    pub fn configure_standby_pin(&mut self) -> Result<(), ChannelSetupError<C::Error>> {
        self.channel
            .configure_standby_pin()
            .map_err(ChannelSetupError::StandbyPin)
    }

    /// Mode resolved by the last [`start`](Self::start).
    #[inline]
    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    /// Whether the channel is running.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.mode != ChannelMode::Disabled
    }

    /// Frames waiting to be read; always 0 on a disabled channel.
    pub fn available(&self) -> usize {
        if self.is_active() {
            self.channel.available()
        } else {
            0
        }
    }

    /// Read one frame in the running mode.
    pub fn read(&mut self) -> Result<Option<Frame>, C::Error> {
        match self.mode {
            ChannelMode::Disabled => Ok(None),
            ChannelMode::Classic => self.channel.read_frame().map(|f| Some(Frame::Classic(f))),
            ChannelMode::Fd => self.channel.read_frame_fd().map(|f| Some(Frame::Fd(f))),
        }
    }

    /// Transmit a frame. `index` only labels the errors.
    ///
    /// FD channels also carry classic frames; classic channels refuse FD ones.
    pub fn send(&mut self, index: usize, frame: &Frame) -> Result<(), SendError<C::Error>> {
        match (self.mode, frame) {
            (ChannelMode::Disabled, _) => Err(SendError::ChannelDisabled { channel: index }),
            (ChannelMode::Classic, Frame::Fd(_)) => Err(SendError::ModeMismatch { channel: index }),
            (_, Frame::Classic(classic)) => self
                .channel
                .send_frame(classic)
                .map_err(SendError::Hardware),
            (ChannelMode::Fd, Frame::Fd(fd)) => self
                .channel
                .send_frame_fd(fd)
                .map_err(SendError::Hardware),
        }
    }

    /// Underlying hardware channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Underlying hardware channel, mutably (driver-specific calls).
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}
