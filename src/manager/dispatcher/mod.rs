//! Frame dispatch: drain every running channel in index order, account the
//! bits, and hand each frame to the active sink and, when relevant, to the
//! OBD emulator.
//!
//! # Backpressure
//!
//! Before every read the largest backlog among the sinks is compared with
//! the ceiling (`capacity - headroom`). Once reached, no channel is read for
//! the rest of the tick. Channels are served in index order, so the first
//! busy channel is never starved while later ones may wait for the next tick.
use crate::config::{ActiveSink, OutputMode, SinkLimits};
use crate::frame::Frame;
use crate::manager::bus_handle::BusHandle;
use crate::manager::bus_load::BusLoadEstimator;
use crate::traits::can_channel::CanChannel;
use crate::traits::sink::{FrameSink, ObdEmulator};

//==================================================================================SINK_SET
/// Borrowed downstream collaborators for one tick.
///
/// The sinks outlive the manager and are shared with the transport code, so
/// the manager only borrows them while dispatching.
pub struct SinkSet<'s, W, S, L, E> {
    /// GVRET over Wi-Fi.
    pub wifi: &'s mut W,
    /// GVRET over the USB serial console.
    pub serial: &'s mut S,
    /// Lawicel / SLCAN encoder.
    pub lawicel: &'s mut L,
    /// ELM327 emulator.
    pub obd: &'s mut E,
    /// Which sink is active.
    pub mode: OutputMode,
}

impl<'s, W, S, L, E> SinkSet<'s, W, S, L, E>
where
    W: FrameSink,
    S: FrameSink,
    L: FrameSink,
    E: ObdEmulator,
{
    pub fn new(wifi: &'s mut W, serial: &'s mut S, lawicel: &'s mut L, obd: &'s mut E) -> Self {
        Self {
            wifi,
            serial,
            lawicel,
            obd,
            mode: OutputMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Largest pending output among the sinks.
    pub fn backlog(&self) -> usize {
        self.wifi
            .pending_output_bytes()
            .max(self.serial.pending_output_bytes())
            .max(self.lawicel.pending_output_bytes())
    }

    /// Hand `frame` to exactly one sink, then to the OBD emulator when it
    /// looks like an ECU response or the emulator monitors everything.
    ///
    /// FD frames are never handed to the emulator.
    pub fn forward(&mut self, frame: &Frame, channel: usize) {
        let sink: &mut dyn FrameSink = match self.mode.active_sink() {
            ActiveSink::Lawicel => &mut *self.lawicel,
            ActiveSink::Wifi => &mut *self.wifi,
            ActiveSink::Serial => &mut *self.serial,
        };

        match frame {
            Frame::Classic(classic) => {
                sink.send_frame_to_buffer(classic, channel);
                if classic.is_obd_reply() || self.obd.is_monitor_mode_enabled() {
                    self.obd.on_can_reply(classic);
                }
            }
            Frame::Fd(fd) => sink.send_fd_frame_to_buffer(fd, channel),
        }
    }
}

//==================================================================================FRAME_DISPATCHER
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Result of one drain pass.
pub struct DrainReport {
    /// Frames read across all channels.
    pub frames_read: usize,
    /// Reading stopped on the backlog ceiling with frames still waiting.
    pub throttled: bool,
}

/// Drains channels into the sinks under the backlog ceiling.
#[derive(Debug, Clone, Copy)]
pub struct FrameDispatcher {
    limits: SinkLimits,
}

impl FrameDispatcher {
    pub const fn new(limits: SinkLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SinkLimits {
        &self.limits
    }

    /// One pass over every channel, in index order.
    pub fn drain<C, W, S, L, E, const N: usize>(
        &self,
        handles: &mut [BusHandle<C>; N],
        loads: &mut BusLoadEstimator<N>,
        sinks: &mut SinkSet<'_, W, S, L, E>,
    ) -> DrainReport
    where
        C: CanChannel,
        W: FrameSink,
        S: FrameSink,
        L: FrameSink,
        E: ObdEmulator,
    {
        let mut report = DrainReport::default();
        let mut backlog = sinks.backlog();

        for (index, handle) in handles.iter_mut().enumerate() {
            if !handle.is_active() {
                continue;
            }

            while handle.available() > 0 {
                if !self.limits.admits(backlog) {
                    report.throttled = true;
                    break;
                }

                let frame = match handle.read() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(_err) => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("CAN{}: read failed, skipping channel this tick", index);
                        break;
                    }
                };

                loads.add_bits(index, &frame);
                sinks.forward(&frame, index);
                backlog = sinks.backlog();
                report.frames_read += 1;
            }
        }

        report
    }
}
