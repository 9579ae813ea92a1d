//! Wire codec for the OSD bridge serial protocol
//!
//! Frame layout:
//!
//! ```text
//! [0x00] [LEN] [CMD] [PAYLOAD ...] [0xFF]
//!         \_______ LEN bytes ______/
//! ```
//!
//! `LEN` counts the command byte plus the payload, so the body is limited to
//! 255 bytes. There is no checksum: the only integrity checks are the start
//! and end markers and the declared length.
//!
//! - `address` - receiver address parsing
//! - `display` - DISPLAY_DATA body layout

pub mod address;
pub mod display;

pub use address::DeviceAddress;
pub use display::{DisplayMessage, FieldLayout};

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// First byte of every frame
pub const START_MARKER: u8 = 0x00;

/// Last byte of every frame
pub const END_MARKER: u8 = 0xFF;

/// Largest body (command + payload) a single length byte can describe
pub const MAX_BODY_LEN: usize = u8::MAX as usize;

/// Largest payload that fits next to the command byte
pub const MAX_PAYLOAD_LEN: usize = MAX_BODY_LEN - 1;

/// Start marker + length byte + end marker
const FRAME_OVERHEAD: usize = 3;

/// Commands understood by the bridge firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Ask the bridge to identify itself (empty payload)
    Identify = 0x01,
    /// Push OSD content to one receiver
    DisplayData = 0x10,
}

impl Command {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = PacketError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(Self::Identify),
            0x10 => Ok(Self::DisplayData),
            other => Err(PacketError::UnknownCommand(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Payload does not fit the one-byte length field
    PayloadTooLarge(usize),
    /// Buffer shorter than the smallest possible frame
    Truncated(usize),
    /// First byte is not the start marker
    BadStart(u8),
    /// Last byte is not the end marker
    BadEnd(u8),
    /// Declared length does not match the bytes between the markers
    LengthMismatch { declared: usize, actual: usize },
    /// Body has no command byte
    EmptyBody,
    UnknownCommand(u8),
    /// DISPLAY_DATA payload has the wrong size for the field layout
    BadDisplayPayload { expected: usize, actual: usize },
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge(size) => {
                write!(f, "Payload too large: {} bytes (max {})", size, MAX_PAYLOAD_LEN)
            }
            Self::Truncated(size) => write!(f, "Frame truncated: {} bytes", size),
            Self::BadStart(b) => write!(f, "Bad start marker: {:#04x}", b),
            Self::BadEnd(b) => write!(f, "Bad end marker: {:#04x}", b),
            Self::LengthMismatch { declared, actual } => write!(
                f,
                "Length mismatch: declared {} bytes, found {}",
                declared, actual
            ),
            Self::EmptyBody => write!(f, "Frame has no command byte"),
            Self::UnknownCommand(code) => write!(f, "Unknown command: {:#04x}", code),
            Self::BadDisplayPayload { expected, actual } => write!(
                f,
                "Display payload is {} bytes, layout needs {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for PacketError {}

/// A decoded frame, borrowing its payload from the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    /// Raw command code (may be a command this codec does not know)
    pub command: u8,
    /// Bytes after the command code
    pub payload: &'a [u8],
}

impl Packet<'_> {
    /// Typed command, if known
    pub fn command(&self) -> Result<Command, PacketError> {
        Command::try_from(self.command)
    }
}

/// Encode a command and its payload into a complete frame
pub fn encode(command: Command, payload: &[u8]) -> Result<Bytes, PacketError> {
    let mut output = BytesMut::with_capacity(payload.len() + FRAME_OVERHEAD + 1);
    encode_into(command, payload, &mut output)?;
    Ok(output.freeze())
}

/// Encode into a caller-provided buffer (appends, does not clear)
///
/// Returns the number of bytes written.
pub fn encode_into(
    command: Command,
    payload: &[u8],
    output: &mut BytesMut,
) -> Result<usize, PacketError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(PacketError::PayloadTooLarge(payload.len()));
    }

    let body_len = payload.len() + 1;
    output.reserve(body_len + FRAME_OVERHEAD);
    output.put_u8(START_MARKER);
    output.put_u8(body_len as u8);
    output.put_u8(command.code());
    output.put_slice(payload);
    output.put_u8(END_MARKER);

    Ok(body_len + FRAME_OVERHEAD)
}

/// Decode one complete frame
///
/// The buffer must hold exactly one frame, markers included.
pub fn decode(frame: &[u8]) -> Result<Packet<'_>, PacketError> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(PacketError::Truncated(frame.len()));
    }
    if frame[0] != START_MARKER {
        return Err(PacketError::BadStart(frame[0]));
    }
    let last = frame[frame.len() - 1];
    if last != END_MARKER {
        return Err(PacketError::BadEnd(last));
    }

    let declared = frame[1] as usize;
    let body = &frame[2..frame.len() - 1];
    if declared != body.len() {
        return Err(PacketError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }

    let (&command, payload) = body.split_first().ok_or(PacketError::EmptyBody)?;
    Ok(Packet { command, payload })
}

/// Frame of the IDENTIFY probe used during discovery
pub fn identify_frame() -> Bytes {
    Bytes::from_static(&[START_MARKER, 0x01, 0x01, END_MARKER])
}

// ============================================================================
// Tests
// ============================================================================
