//! Transport abstraction for byte-level serial I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: how bytes reach the bridge device (serial port)
//! - **Codec**: how frames are laid out (handled in `crate::codec`)
//!
//! Discovery and dispatch only see these two traits, so tests can replace the
//! real serial ports with scripted in-memory ones.

pub mod serial;

pub use serial::SystemPorts;

use crate::error::Result;
use std::time::Duration;

/// An open, exclusive connection to one serial port
///
/// Dropping the link closes the port.
pub trait SerialLink: Send {
    /// Write a complete frame
    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Read whatever is available, up to `buf.len()` bytes
    ///
    /// Returns `Ok(0)` or a `TimedOut` error when nothing arrived in time.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Discard stale input bytes
    fn clear_input(&mut self) -> std::io::Result<()>;
}

/// Source of serial ports
///
/// The real implementation enumerates and opens OS serial ports; it does not
/// know anything about the bridge device. Identification happens on top of it
/// in `crate::discovery`.
pub trait PortProvider: Send + Sync {
    /// Names of candidate ports, in enumeration order
    fn available_ports(&self) -> Result<Vec<String>>;

    /// Open a port with the given I/O timeout
    fn open(&self, port: &str, timeout: Duration) -> Result<Box<dyn SerialLink>>;
}
