//! In-memory representation of the frames moving through the gateway:
//! classic CAN (up to eight bytes), CAN FD (up to sixty-four bytes), and the
//! tagged [`Frame`] used by the single dispatch path.
use core::ops::RangeInclusive;

use embedded_can::{ExtendedId, Id, StandardId};

/// Largest payload carried by a classic CAN frame.
pub const MAX_CLASSIC_PAYLOAD: usize = 8;
/// Largest payload carried by a CAN FD frame.
pub const MAX_FD_PAYLOAD: usize = 64;

/// Identifier values answered by OBD-II ECUs (0x7E0 to 0x7EF).
pub const OBD_REPLY_RANGE: RangeInclusive<u32> = 0x7E0..=0x7EF;

/// Raw numeric value of an identifier, regardless of its width.
#[inline]
pub fn raw_id(id: &Id) -> u32 {
    match id {
        Id::Standard(sid) => sid.as_raw() as u32,
        Id::Extended(eid) => eid.as_raw(),
    }
}

//==================================================================================CLASSIC_FRAME
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Classic CAN 2.0 frame as read from, or written to, a channel.
pub struct ClassicFrame {
    /// 11-bit or 29-bit identifier.
    pub id: Id,
    /// Payload buffer; only the first `len` bytes are meaningful.
    pub data: [u8; MAX_CLASSIC_PAYLOAD],
    /// Data Length Code (0 to 8).
    pub len: usize,
    /// Remote transmission request.
    pub remote: bool,
}

impl ClassicFrame {
    /// Build a data frame, clamping the payload to eight bytes.
    pub fn new_data(id: impl Into<Id>, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_CLASSIC_PAYLOAD);
        let mut data = [0u8; MAX_CLASSIC_PAYLOAD];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            id: id.into(),
            data,
            len,
            remote: false,
        }
    }

    /// Whether the identifier is 29 bits wide.
    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    /// Raw identifier value.
    #[inline]
    pub fn raw_id(&self) -> u32 {
        raw_id(&self.id)
    }

    /// Populated payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// True when the identifier value falls in [`OBD_REPLY_RANGE`], whatever
    /// its width.
    pub fn is_obd_reply(&self) -> bool {
        OBD_REPLY_RANGE.contains(&self.raw_id())
    }
}

impl embedded_can::Frame for ClassicFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_CLASSIC_PAYLOAD {
            return None;
        }
        Some(Self::new_data(id, data))
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_CLASSIC_PAYLOAD {
            return None;
        }
        Some(Self {
            id: id.into(),
            data: [0u8; MAX_CLASSIC_PAYLOAD],
            len: dlc,
            remote: true,
        })
    }

    fn is_extended(&self) -> bool {
        ClassicFrame::is_extended(self)
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.len
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            self.payload()
        }
    }
}

//==================================================================================FD_FRAME
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// FD-only control bits. The gateway never interprets them, it only passes
/// them through to the sinks.
pub struct FdFlags {
    /// Data phase was sent at the data bit rate (BRS).
    pub bit_rate_switch: bool,
    /// Transmitter was error passive (ESI).
    pub error_state: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// CAN FD frame.
pub struct FdFrame {
    /// 11-bit or 29-bit identifier.
    pub id: Id,
    /// Payload buffer; only the first `len` bytes are meaningful.
    pub data: [u8; MAX_FD_PAYLOAD],
    /// Payload length (0 to 64).
    pub len: usize,
    /// Bit-rate-switch / error-state indicators.
    pub flags: FdFlags,
}

impl FdFrame {
    /// Build an FD frame, clamping the payload to sixty-four bytes.
    pub fn new(id: impl Into<Id>, payload: &[u8], flags: FdFlags) -> Self {
        let len = payload.len().min(MAX_FD_PAYLOAD);
        let mut data = [0u8; MAX_FD_PAYLOAD];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            id: id.into(),
            data,
            len,
            flags,
        }
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    #[inline]
    pub fn raw_id(&self) -> u32 {
        raw_id(&self.id)
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

//==================================================================================FRAME
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// A frame of either flavour, routed through one dispatch path.
pub enum Frame {
    Classic(ClassicFrame),
    Fd(FdFrame),
}

impl Frame {
    /// Identifier of the wrapped frame.
    pub fn id(&self) -> Id {
        match self {
            Frame::Classic(frame) => frame.id,
            Frame::Fd(frame) => frame.id,
        }
    }

    /// Whether the identifier is 29 bits wide.
    pub fn is_extended(&self) -> bool {
        matches!(self.id(), Id::Extended(_))
    }

    pub fn raw_id(&self) -> u32 {
        raw_id(&self.id())
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Classic(frame) => frame.len,
            Frame::Fd(frame) => frame.len,
        }
    }

    /// True for a frame without payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate number of bits the frame occupies on the wire.
    ///
    /// Models arbitration, control, CRC, ACK and inter-frame space as a fixed
    /// 41 bits, nine bits per data byte (stuffing included), and 18 extra
    /// arbitration bits for a 29-bit identifier. FD bit-rate switching and FD
    /// stuffing are not modelled.
    pub fn wire_bits(&self) -> u32 {
        let mut bits = 41 + 9 * self.len() as u32;
        if self.is_extended() {
            bits += 18;
        }
        bits
    }
}

impl From<ClassicFrame> for Frame {
    fn from(frame: ClassicFrame) -> Self {
        Frame::Classic(frame)
    }
}

impl From<FdFrame> for Frame {
    fn from(frame: FdFrame) -> Self {
        Frame::Fd(frame)
    }
}

/// Shorthand used by tests and demos: a standard identifier from a raw value.
///
/// Values above 0x7FF are masked to eleven bits.
pub fn standard_id(raw: u16) -> Id {
    match StandardId::new(raw & StandardId::MAX.as_raw()) {
        Some(sid) => Id::Standard(sid),
        None => Id::Standard(StandardId::ZERO),
    }
}

/// Shorthand for an extended identifier; values are masked to 29 bits.
pub fn extended_id(raw: u32) -> Id {
    match ExtendedId::new(raw & ExtendedId::MAX.as_raw()) {
        Some(eid) => Id::Extended(eid),
        None => Id::Extended(ExtendedId::ZERO),
    }
}
