//! Centralized error types for the OSD bridge
//!
//! All errors are represented by the `OsdError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, OsdError>`.
//!
//! Note that the event and send paths never return these to the host: they are
//! logged and turned into outcome values at the dispatch/controller boundary.

use crate::codec::PacketError;
use std::fmt;
use std::path::PathBuf;

/// All OSD bridge errors
#[derive(Debug)]
pub enum OsdError {
    // === Transport ===
    /// Failed to open serial port
    SerialOpen {
        port: String,
        source: std::io::Error,
    },
    /// Read or write on an open serial port failed
    SerialIo {
        port: String,
        source: std::io::Error,
    },
    /// Failed to list serial ports
    PortEnumeration { source: std::io::Error },

    // === Protocol ===
    /// Frame could not be encoded or decoded
    Packet(PacketError),
    /// Pilot device address is not a hex string
    InvalidAddress { input: String },

    // === Race data ===
    /// Crossing seat is not present in the active leaderboard
    SeatNotRanked { seat: usize },

    // === IO / Config ===
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },
    /// Config file is not valid TOML
    ConfigParse { path: PathBuf, reason: String },
    /// Results snapshot is not valid JSON
    ResultsParse { path: PathBuf, reason: String },
}

impl std::error::Error for OsdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. }
            | Self::SerialIo { source, .. }
            | Self::PortEnumeration { source }
            | Self::Io { source, .. } => Some(source),
            Self::Packet(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for OsdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialOpen { port, .. } => write!(f, "Cannot open serial port: {}", port),
            Self::SerialIo { port, source } => {
                write!(f, "Serial I/O failed on {}: {}", port, source)
            }
            Self::PortEnumeration { source } => {
                write!(f, "Cannot list serial ports: {}", source)
            }
            Self::Packet(e) => write!(f, "Packet error: {}", e),
            Self::InvalidAddress { input } => write!(f, "Invalid device address: {:?}", input),
            Self::SeatNotRanked { seat } => {
                write!(f, "Seat {} not found in leaderboard", seat)
            }
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::ConfigParse { path, reason } => {
                write!(f, "Config parse error in {}: {}", path.display(), reason)
            }
            Self::ResultsParse { path, reason } => {
                write!(f, "Results parse error in {}: {}", path.display(), reason)
            }
        }
    }
}

impl From<PacketError> for OsdError {
    fn from(e: PacketError) -> Self {
        Self::Packet(e)
    }
}

/// Alias for Result with OsdError
pub type Result<T> = std::result::Result<T, OsdError>;
