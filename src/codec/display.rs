//! DISPLAY_DATA body
//!
//! Payload layout (after the command byte):
//!
//! ```text
//! [address: 6B BE] [position: 1B] [lap: 1B] [text1] [text2] [text3]
//! ```
//!
//! Text fields are fixed width and space padded. Two firmware revisions
//! exist, selected by [`Revision`]:
//!
//! | Revision     | text1 | text2 | text3 | Terminator       |
//! |--------------|-------|-------|-------|------------------|
//! | `Standard`   | 15    | 15    | 20    | none             |
//! | `Terminated` | 16    | 16    | 21    | NUL in last byte |
//!
//! Both show at most 15/15/20 characters. Truncation, padding and numeric
//! coercion never fail; the OSD prefers stale-looking data over no update.

use super::address::DeviceAddress;
use super::{encode, Command, PacketError};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Visible characters per text field
pub const TEXT_WIDTHS: [usize; 3] = [15, 15, 20];

/// Address + position + lap
const HEADER_LEN: usize = 8;

/// Substitute for characters the OSD font cannot draw
const REPLACEMENT: char = '?';

/// Firmware protocol revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    /// 15/15/20 space padded
    #[default]
    Standard,
    /// 16/16/21 with a NUL terminator inside each field
    Terminated,
}

impl Revision {
    pub fn layout(self) -> FieldLayout {
        match self {
            Self::Standard => FieldLayout::STANDARD,
            Self::Terminated => FieldLayout::TERMINATED,
        }
    }

    /// Parse a host option value, unknown values fall back to the default
    pub fn from_option(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("terminated") => Self::Terminated,
            _ => Self::Standard,
        }
    }

    /// Option value accepted by [`Revision::from_option`]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Terminated => "terminated",
        }
    }
}

/// Byte layout of the three text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Visible characters per field
    pub text_widths: [usize; 3],
    /// Whether each field ends with an extra NUL byte
    pub nul_terminated: bool,
}

impl FieldLayout {
    pub const STANDARD: Self = Self {
        text_widths: TEXT_WIDTHS,
        nul_terminated: false,
    };

    pub const TERMINATED: Self = Self {
        text_widths: TEXT_WIDTHS,
        nul_terminated: true,
    };

    /// Bytes one field occupies on the wire
    pub fn field_len(&self, index: usize) -> usize {
        self.text_widths[index] + usize::from(self.nul_terminated)
    }

    /// Full DISPLAY_DATA payload size (without the command byte)
    pub fn payload_len(&self) -> usize {
        HEADER_LEN + (0..3).map(|i| self.field_len(i)).sum::<usize>()
    }
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// Coerce a rank or lap count into the one-byte wire field
///
/// Missing values become 0, negative values become 0 and values above 255
/// saturate.
pub fn coerce_small_int(value: Option<i64>) -> u8 {
    match value {
        Some(v) if v > 0 => u8::try_from(v).unwrap_or(u8::MAX),
        _ => 0,
    }
}

/// Fit a string to a field: ASCII only, cut to `width`, right-padded with spaces
pub fn fit_text(text: &str, width: usize) -> String {
    let mut out: String = text
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() {
                c
            } else {
                REPLACEMENT
            }
        })
        .take(width)
        .collect();
    // Every char is ASCII here, so len() is the char count
    let pad = width - out.len();
    out.extend(std::iter::repeat(' ').take(pad));
    out
}

// =============================================================================
// Message
// =============================================================================

/// OSD content for one receiver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayMessage {
    pub position: u8,
    pub lap_number: u8,
    pub text1: String,
    pub text2: String,
    pub text3: String,
}

impl DisplayMessage {
    /// Message with coerced numeric fields and empty text
    pub fn new(position: Option<i64>, lap_number: Option<i64>) -> Self {
        Self {
            position: coerce_small_int(position),
            lap_number: coerce_small_int(lap_number),
            ..Self::default()
        }
    }

    /// Position/lap-less message showing a single line
    pub fn banner(text: impl Into<String>) -> Self {
        Self {
            text1: text.into(),
            ..Self::default()
        }
    }

    pub fn with_lines(
        mut self,
        text1: impl Into<String>,
        text2: impl Into<String>,
        text3: impl Into<String>,
    ) -> Self {
        self.text1 = text1.into();
        self.text2 = text2.into();
        self.text3 = text3.into();
        self
    }

    fn texts(&self) -> [&str; 3] {
        [&self.text1, &self.text2, &self.text3]
    }

    /// Serialize the DISPLAY_DATA payload (without command byte)
    pub fn serialize(&self, address: DeviceAddress, layout: FieldLayout) -> BytesMut {
        let mut out = BytesMut::with_capacity(layout.payload_len());
        out.put_slice(&address.to_bytes());
        out.put_u8(self.position);
        out.put_u8(self.lap_number);
        for (i, text) in self.texts().into_iter().enumerate() {
            out.put_slice(fit_text(text, layout.text_widths[i]).as_bytes());
            if layout.nul_terminated {
                out.put_u8(0x00);
            }
        }
        out
    }

    /// Serialize and frame as a DISPLAY_DATA packet
    pub fn to_frame(
        &self,
        address: DeviceAddress,
        layout: FieldLayout,
    ) -> Result<Bytes, PacketError> {
        encode(Command::DisplayData, &self.serialize(address, layout))
    }

    /// Parse a DISPLAY_DATA payload
    ///
    /// Text fields come back exactly as sent: truncated and space padded,
    /// with the NUL terminator (if any) removed.
    pub fn parse(
        payload: &[u8],
        layout: FieldLayout,
    ) -> Result<(DeviceAddress, Self), PacketError> {
        let expected = layout.payload_len();
        if payload.len() != expected {
            return Err(PacketError::BadDisplayPayload {
                expected,
                actual: payload.len(),
            });
        }

        let mut addr = [0u8; 6];
        addr.copy_from_slice(&payload[..6]);
        let mut offset = HEADER_LEN;
        let mut texts: [String; 3] = Default::default();
        for (i, text) in texts.iter_mut().enumerate() {
            let field = &payload[offset..offset + layout.text_widths[i]];
            *text = field.iter().map(|&b| b as char).collect();
            offset += layout.field_len(i);
        }
        let [text1, text2, text3] = texts;

        Ok((
            DeviceAddress::from_bytes(addr),
            Self {
                position: payload[6],
                lap_number: payload[7],
                text1,
                text2,
                text3,
            },
        ))
    }
}
