//! Minimal abstraction for one CAN controller + transceiver pair. Allows the
//! core to drive on-chip controllers (TWAI, FDCAN) and SPI-attached ones
//! (MCP2517FD) through the same calls.
//!
//! Every method is non-blocking: reads are only issued after `available`
//! reported a pending frame, and sends hand the frame to the controller
//! without waiting for the bus.
use crate::frame::{ClassicFrame, FdFrame};

/// Contract for a single CAN channel.
pub trait CanChannel {
    type Error: core::fmt::Debug;

    /// Power the transceiver path of this channel.
    fn enable(&mut self);
    /// Put the transceiver in standby and stop the controller.
    fn disable(&mut self);
    /// Start in classic mode at `nominal_speed` bit/s.
    fn begin(&mut self, nominal_speed: u32) -> Result<(), Self::Error>;
    /// Start in FD mode with separate arbitration and data bit rates.
    fn begin_fd(&mut self, nominal_speed: u32, data_speed: u32) -> Result<(), Self::Error>;
    /// Toggle receive-only operation.
    fn set_listen_only(&mut self, listen_only: bool);
    /// Arm the controller filters so traffic asserts the shared wake line.
    fn arm_wake_filter(&mut self);
    /// Number of frames waiting in the receive FIFO.
    fn available(&self) -> usize;
    /// Pop one classic frame from the receive FIFO.
    fn read_frame(&mut self) -> Result<ClassicFrame, Self::Error>;
    /// Pop one FD frame from the receive FIFO.
    fn read_frame_fd(&mut self) -> Result<FdFrame, Self::Error>;
    /// Queue one classic frame for transmission.
    fn send_frame(&mut self, frame: &ClassicFrame) -> Result<(), Self::Error>;
    /// Queue one FD frame for transmission.
    fn send_frame_fd(&mut self, frame: &FdFrame) -> Result<(), Self::Error>;
    /// Whether the controller can run CAN FD at all.
    fn supports_fd(&self) -> bool;
    /// Route a controller GPIO as the transceiver standby line.
    ///
    /// Only controllers that need it override this; MCP2517FD drivers can
    /// implement it with [`route_standby_pin`](super::register_access::route_standby_pin).
    fn configure_standby_pin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
