//! Test doubles shared by the unit tests: scripted CAN channel, recording
//! sinks, OBD emulator and board.
use std::collections::VecDeque;
use std::vec::Vec;

use crate::frame::{ClassicFrame, FdFrame};
use crate::traits::board::Board;
use crate::traits::can_channel::CanChannel;
use crate::traits::sink::{FrameSink, ObdEmulator};

#[derive(Debug, Default)]
/// Channel whose receive FIFO is filled by the test.
pub struct MockChannel {
    pub fd_capable: bool,
    pub fail_begin: bool,
    pub fail_reads: bool,
    pub enabled: Option<bool>,
    pub begun_classic: Option<u32>,
    pub begun_fd: Option<(u32, u32)>,
    pub listen_only: Option<bool>,
    pub wake_armed: bool,
    pub standby_configured: usize,
    pub rx_classic: VecDeque<ClassicFrame>,
    pub rx_fd: VecDeque<FdFrame>,
    pub sent_classic: Vec<ClassicFrame>,
    pub sent_fd: Vec<FdFrame>,
}

impl MockChannel {
    pub fn fd_capable() -> Self {
        Self {
            fd_capable: true,
            ..Self::default()
        }
    }
}

impl CanChannel for MockChannel {
    type Error = ();

    fn enable(&mut self) {
        self.enabled = Some(true);
    }

    fn disable(&mut self) {
        self.enabled = Some(false);
    }

    fn begin(&mut self, nominal_speed: u32) -> Result<(), Self::Error> {
        if self.fail_begin {
            return Err(());
        }
        self.begun_classic = Some(nominal_speed);
        Ok(())
    }

    fn begin_fd(&mut self, nominal_speed: u32, data_speed: u32) -> Result<(), Self::Error> {
        if self.fail_begin {
            return Err(());
        }
        self.begun_fd = Some((nominal_speed, data_speed));
        Ok(())
    }

    fn set_listen_only(&mut self, listen_only: bool) {
        self.listen_only = Some(listen_only);
    }

    fn arm_wake_filter(&mut self) {
        self.wake_armed = true;
    }

    fn available(&self) -> usize {
        self.rx_classic.len() + self.rx_fd.len()
    }

    fn read_frame(&mut self) -> Result<ClassicFrame, Self::Error> {
        if self.fail_reads {
            return Err(());
        }
        self.rx_classic.pop_front().ok_or(())
    }

    fn read_frame_fd(&mut self) -> Result<FdFrame, Self::Error> {
        if self.fail_reads {
            return Err(());
        }
        self.rx_fd.pop_front().ok_or(())
    }

    fn send_frame(&mut self, frame: &ClassicFrame) -> Result<(), Self::Error> {
        self.sent_classic.push(*frame);
        Ok(())
    }

    fn send_frame_fd(&mut self, frame: &FdFrame) -> Result<(), Self::Error> {
        self.sent_fd.push(*frame);
        Ok(())
    }

    fn supports_fd(&self) -> bool {
        self.fd_capable
    }

    fn configure_standby_pin(&mut self) -> Result<(), Self::Error> {
        self.standby_configured += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
/// Sink recording what it receives; every frame grows the backlog by
/// `bytes_per_frame`.
pub struct MockSink {
    pub pending: usize,
    pub bytes_per_frame: usize,
    pub classic: Vec<(ClassicFrame, usize)>,
    pub fd: Vec<(FdFrame, usize)>,
}

impl MockSink {
    pub fn with_frame_cost(bytes_per_frame: usize) -> Self {
        Self {
            bytes_per_frame,
            ..Self::default()
        }
    }

    pub fn total(&self) -> usize {
        self.classic.len() + self.fd.len()
    }
}

impl FrameSink for MockSink {
    fn pending_output_bytes(&self) -> usize {
        self.pending
    }

    fn send_frame_to_buffer(&mut self, frame: &ClassicFrame, channel: usize) {
        self.pending += self.bytes_per_frame;
        self.classic.push((*frame, channel));
    }

    fn send_fd_frame_to_buffer(&mut self, frame: &FdFrame, channel: usize) {
        self.pending += self.bytes_per_frame;
        self.fd.push((*frame, channel));
    }
}

#[derive(Debug, Default)]
/// Lawicel-like sink keeping the default no-op FD entry point.
pub struct ClassicOnlySink {
    pub classic: Vec<(ClassicFrame, usize)>,
}

impl FrameSink for ClassicOnlySink {
    fn pending_output_bytes(&self) -> usize {
        0
    }

    fn send_frame_to_buffer(&mut self, frame: &ClassicFrame, channel: usize) {
        self.classic.push((*frame, channel));
    }
}

#[derive(Debug, Default)]
pub struct MockObd {
    pub monitor: bool,
    pub replies: Vec<ClassicFrame>,
}

impl ObdEmulator for MockObd {
    fn is_monitor_mode_enabled(&self) -> bool {
        self.monitor
    }

    fn on_can_reply(&mut self, frame: &ClassicFrame) {
        self.replies.push(*frame);
    }
}

#[derive(Debug, Default)]
/// Board recording line levels and sleep calls.
pub struct MockBoard {
    pub rail: Vec<bool>,
    pub select: Vec<bool>,
    pub wake_interrupt_armed: bool,
    pub sleeps: usize,
}

impl Board for MockBoard {
    fn set_power_rail(&mut self, powered: bool) {
        self.rail.push(powered);
    }

    fn select_transceiver(&mut self, channel_zero: bool) {
        self.select.push(channel_zero);
    }

    fn arm_wake_interrupt(&mut self) {
        self.wake_interrupt_armed = true;
    }

    async fn light_sleep(&mut self) {
        self.sleeps += 1;
    }
}
