//! Gateway core: owns the CAN channels, drains them into the downstream
//! sinks, tracks bus load and drives the idle power cycle.
//!
//! A firmware main task typically looks like:
//!
//! ```rust,ignore
//! static WAKE: WakeFlag = WakeFlag::new();
//!
//! let mut manager = CanManager::new(config, [can0, can1], board, &WAKE)?;
//! manager.setup(timer.now());
//! let mut sinks = SinkSet::new(&mut wifi, &mut serial, &mut lawicel, &mut elm);
//! manager.run(&mut timer, &mut sinks).await;
//! ```
pub mod bus_handle;
pub mod bus_load;
pub mod dispatcher;
pub mod power;

use embassy_time::Instant;

use crate::config::{BusConfig, GatewayConfig};
use crate::error::{ConfigError, SendError};
use crate::frame::Frame;
use crate::traits::board::Board;
use crate::traits::can_channel::CanChannel;
use crate::traits::gateway_timer::GatewayTimer;
use crate::traits::sink::{FrameSink, ObdEmulator};

use bus_handle::{BusHandle, ChannelStatus};
use bus_load::{BusLoadEstimator, LoadTelemetry};
use dispatcher::{FrameDispatcher, SinkSet};
use power::{PowerAction, PowerEvent, PowerState, PowerStateMachine, WakeFlag};

//==================================================================================REPORTS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Outcome of [`CanManager::setup`], one status per channel.
pub struct SetupReport<const N: usize> {
    pub channels: [ChannelStatus; N],
}

impl<const N: usize> SetupReport<N> {
    /// Status of one channel.
    pub fn status(&self, channel: usize) -> Option<ChannelStatus> {
        self.channels.get(channel).copied()
    }

    /// Number of channels receiving traffic.
    pub fn running(&self) -> usize {
        self.channels.iter().filter(|s| s.is_running()).count()
    }

    /// Whether any enabled channel refused to start.
    pub fn has_failures(&self) -> bool {
        self.channels.iter().any(|s| *s == ChannelStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What one serviced tick did.
pub struct TickReport {
    /// Frames read across all channels.
    pub frames_read: usize,
    /// The sink backlog stopped reading while frames were still waiting.
    pub throttled: bool,
    /// Power transition that happened during the tick, if any.
    pub power_event: Option<PowerEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// The gateway is sleeping; nothing was touched.
    Skipped,
    Serviced(TickReport),
}

//==================================================================================CAN_MANAGER
/// Multi-channel CAN gateway core.
///
/// `'a` is the lifetime of the wake flag shared with the interrupt handler
/// (and of the optional load telemetry), usually `'static`.
pub struct CanManager<'a, C: CanChannel, B: Board, const N: usize> {
    config: GatewayConfig<N>,
    handles: [BusHandle<C>; N],
    loads: BusLoadEstimator<N>,
    dispatcher: FrameDispatcher,
    power: PowerStateMachine<'a>,
    board: B,
    telemetry: Option<&'a LoadTelemetry<N>>,
}

impl<'a, C: CanChannel, B: Board, const N: usize> CanManager<'a, C, B, N> {
    /// Validate `config` and take ownership of the channels and the board.
    ///
    /// Nothing touches the hardware until [`setup`](Self::setup).
    pub fn new(
        config: GatewayConfig<N>,
        channels: [C; N],
        board: B,
        wake: &'a WakeFlag,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            handles: channels.map(BusHandle::new),
            loads: BusLoadEstimator::new(),
            dispatcher: FrameDispatcher::new(config.sink_limits),
            power: PowerStateMachine::new(wake, config.timeouts),
            board,
            telemetry: None,
            config,
        })
    }

    /// Publish load percentages to `telemetry` on every window rollover.
    pub fn with_telemetry(mut self, telemetry: &'a LoadTelemetry<N>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Bring every channel up, seed the load windows and the idle timer,
    /// and arm the wake interrupt.
    ///
    /// Channel failures are logged and reported, never fatal: a channel that
    /// refuses to start stays disabled for the session.
    pub fn setup(&mut self, now: Instant) -> SetupReport<N> {
        let mut channels = [ChannelStatus::Disabled; N];
        for (index, status) in channels.iter_mut().enumerate() {
            *status = self.bring_up(index);
            self.route_standby(index);
        }

        self.loads.reset(&self.config.buses, now);
        self.power.seed(now);
        self.board.arm_wake_interrupt();

        #[cfg(feature = "defmt")]
        defmt::info!("CAN setup done, {} channel(s) running", channels.iter().filter(|s| s.is_running()).count());

        SetupReport { channels }
    }

    /// Apply a new configuration to one channel between ticks.
    ///
    /// The channel restarts from scratch and its load accounting is reset.
    /// On a shared-transceiver board, channel 0 or 1 going down hands the
    /// select line to the other one when it is running. The standby pin
    /// routing done by [`setup`](Self::setup) is kept as is.
    pub fn reconfigure_channel(
        &mut self,
        index: usize,
        bus: BusConfig,
    ) -> Result<ChannelStatus, ConfigError> {
        if index >= N {
            return Err(ConfigError::InvalidChannel { channel: index });
        }
        bus.validate(index)?;

        self.config.buses[index] = bus;
        let status = self.bring_up(index);
        if !status.is_running() {
            self.hand_over_transceiver(index);
        }
        self.loads.reset_channel(index, &bus);
        Ok(status)
    }

    /// Per-channel part of the setup, shared with reconfiguration.
    fn bring_up(&mut self, index: usize) -> ChannelStatus {
        let bus = self.config.buses[index];
        let variant = self.config.variant;
        let handle = &mut self.handles[index];

        let status = match handle.start(&bus) {
            Ok(status) => status,
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::error!("CAN{}: controller start failed, channel disabled", index);
                ChannelStatus::Failed
            }
        };

        #[cfg(feature = "defmt")]
        match status {
            ChannelStatus::Classic => {
                defmt::info!("CAN{}: classic, {} bit/s", index, bus.nominal_speed)
            }
            ChannelStatus::Fd => defmt::info!(
                "CAN{}: FD, nominal {} bit/s, data {} bit/s",
                index,
                bus.nominal_speed,
                bus.fd_data_speed
            ),
            ChannelStatus::FdFallback => defmt::warn!(
                "CAN{}: FD not supported by controller, classic at {} bit/s",
                index,
                bus.nominal_speed
            ),
            _ => {}
        }

        if variant.shares_transceiver() && index < 2 && status.is_running() {
            #[cfg(feature = "defmt")]
            if index == 1 {
                defmt::info!("CAN1 takes the shared transceiver, CAN0 is off");
            }
            self.board.select_transceiver(index == 0);
        }

        status
    }

    /// Give the shared transceiver back to the other channel of the pair
    /// once `index` no longer uses it.
    fn hand_over_transceiver(&mut self, index: usize) {
        if !self.config.variant.shares_transceiver() || index >= 2 {
            return;
        }
        let other = 1 - index;
        if self.handles.get(other).is_some_and(|handle| handle.is_active()) {
            #[cfg(feature = "defmt")]
            defmt::info!("CAN{} is down, CAN{} takes the shared transceiver", index, other);
            self.board.select_transceiver(other == 0);
        }
    }

    /// MCP2517FD standby patch, once per controller at setup.
    fn route_standby(&mut self, index: usize) {
        if !self.config.variant.needs_standby_pin(index) {
            return;
        }
        if let Err(_err) = self.handles[index].configure_standby_pin() {
            #[cfg(feature = "defmt")]
            defmt::warn!("CAN{}: standby pin routing failed", index);
        }
    }

    /// Transmit a frame on `channel`; its bits count towards the bus load.
    pub fn send_frame(&mut self, channel: usize, frame: &Frame) -> Result<(), SendError<C::Error>> {
        let handle = self
            .handles
            .get_mut(channel)
            .ok_or(SendError::InvalidChannel { channel })?;
        handle.send(channel, frame)?;
        self.loads.add_bits(channel, frame);
        Ok(())
    }

    /// One iteration of the main loop.
    ///
    /// Only returns late when the idle timeout cuts the rail: the tick then
    /// awaits [`Board::light_sleep`] and reports
    /// [`PowerEvent::Shutdown`] once the MCU runs again.
    pub async fn tick<W, S, L, E>(
        &mut self,
        now: Instant,
        sinks: &mut SinkSet<'_, W, S, L, E>,
    ) -> TickOutcome
    where
        W: FrameSink,
        S: FrameSink,
        L: FrameSink,
        E: ObdEmulator,
    {
        if self.power.state() == PowerState::Sleeping {
            return TickOutcome::Skipped;
        }

        let mut power_event = None;
        if self.power.resume(now) {
            #[cfg(feature = "defmt")]
            defmt::info!("Woke up on CAN activity");
            power_event = Some(PowerEvent::Woke);
        }

        if self.loads.roll_if_due(&self.config.buses, now) {
            if let Some(telemetry) = self.telemetry {
                telemetry.publish(self.loads.snapshot());
            }
        }

        let drained = self
            .dispatcher
            .drain(&mut self.handles, &mut self.loads, sinks);

        match self.power.observe(drained.frames_read > 0, now) {
            PowerAction::None => {}
            PowerAction::HoldRail => self.board.set_power_rail(true),
            PowerAction::IssueWarning => {
                #[cfg(feature = "defmt")]
                defmt::warn!("No CAN activity, shutting down soon");
                power_event = Some(PowerEvent::ShutdownWarning);
            }
            PowerAction::Shutdown => {
                #[cfg(feature = "defmt")]
                defmt::warn!("No CAN activity, cutting power and sleeping");
                self.board.set_power_rail(false);
                self.power.enter_sleep();
                self.board.light_sleep().await;
                self.power.after_sleep();
                power_event = Some(PowerEvent::Shutdown);
            }
        }

        TickOutcome::Serviced(TickReport {
            frames_read: drained.frames_read,
            throttled: drained.throttled,
            power_event,
        })
    }

    /// Tick forever, yielding `poll_interval_ms` between iterations.
    pub async fn run<T, W, S, L, E>(&mut self, timer: &mut T, sinks: &mut SinkSet<'_, W, S, L, E>)
    where
        T: GatewayTimer,
        W: FrameSink,
        S: FrameSink,
        L: FrameSink,
        E: ObdEmulator,
    {
        let poll_interval_ms = self.config.poll_interval_ms;
        loop {
            self.tick(timer.now(), sinks).await;
            timer.delay_ms(poll_interval_ms).await;
        }
    }

    pub fn config(&self) -> &GatewayConfig<N> {
        &self.config
    }

    pub fn handle(&self, channel: usize) -> Option<&BusHandle<C>> {
        self.handles.get(channel)
    }

    pub fn channel(&self, channel: usize) -> Option<&C> {
        self.handles.get(channel).map(BusHandle::channel)
    }

    /// Driver access for controller-specific calls.
    pub fn channel_mut(&mut self, channel: usize) -> Option<&mut C> {
        self.handles.get_mut(channel).map(BusHandle::channel_mut)
    }

    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    pub fn last_activity(&self) -> Instant {
        self.power.last_activity()
    }

    /// Smoothed load of one channel, 0 for unknown indices.
    pub fn load_percent(&self, channel: usize) -> u8 {
        self.loads.load_percent(channel)
    }

    /// Load of the busiest channel.
    pub fn peak_load_percent(&self) -> u8 {
        self.loads.peak_load_percent()
    }

    pub fn bus_load(&self) -> &BusLoadEstimator<N> {
        &self.loads
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }
}
