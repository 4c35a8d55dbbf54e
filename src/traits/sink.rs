//! Downstream consumers of routed frames: protocol encoders (GVRET over
//! Wi-Fi or serial, Lawicel) and the ELM327 OBD-II emulator.
//!
//! The core only hands frames over; byte encodings and transport buffering
//! belong to the implementations.
use crate::frame::{ClassicFrame, FdFrame};

/// Encoder that buffers frames for later transport.
pub trait FrameSink {
    /// Bytes already buffered and not yet sent to the host.
    fn pending_output_bytes(&self) -> usize;
    /// Buffer a classic frame received on `channel`. Must not block.
    fn send_frame_to_buffer(&mut self, frame: &ClassicFrame, channel: usize);
    /// Buffer an FD frame received on `channel`. Encoders without FD
    /// support keep the default no-op.
    fn send_fd_frame_to_buffer(&mut self, _frame: &FdFrame, _channel: usize) {}
}

/// OBD-II emulator fed with potential ECU responses.
pub trait ObdEmulator {
    /// In monitor mode every classic frame is forwarded, not only OBD replies.
    fn is_monitor_mode_enabled(&self) -> bool;
    /// Hand over a frame that may be an OBD-II response.
    fn on_can_reply(&mut self, frame: &ClassicFrame);
}
