//! Byte-wide register access for SPI-attached controllers, and the MCP2517FD
//! standby-pin patch built on top of it.

/// MCP2517FD I/O control register (IOCON), lowest byte.
pub const MCP2517FD_IOCON: u16 = 0xE04;
/// IOCON bit 6: GPIO0 acts as the transceiver standby output (XSTBYEN).
pub const IOCON_XSTBYEN: u8 = 0x40;
/// IOCON bit 0: GPIO0 direction, 1 = input (TRIS0).
pub const IOCON_TRIS0: u8 = 0x01;

/// Read/write single register bytes.
pub trait RegisterAccess {
    type Error: core::fmt::Debug;

    fn read8(&mut self, address: u16) -> Result<u8, Self::Error>;
    fn write8(&mut self, address: u16, value: u8) -> Result<(), Self::Error>;
}

/// Make GPIO0 of an MCP2517FD drive the transceiver standby pin.
///
/// Two read-modify-write passes on IOCON: first enable XSTBY mode, then
/// clear TRIS0 so GPIO0 becomes an output. Must run after the controller
/// has been configured for speed and mode.
pub fn route_standby_pin<R: RegisterAccess>(registers: &mut R) -> Result<(), R::Error> {
    let iocon = registers.read8(MCP2517FD_IOCON)?;
    registers.write8(MCP2517FD_IOCON, iocon | IOCON_XSTBYEN)?;

    let iocon = registers.read8(MCP2517FD_IOCON)?;
    registers.write8(MCP2517FD_IOCON, iocon & !IOCON_TRIS0)?;
    Ok(())
}
