//! Serial transport backed by the `serialport` crate
//!
//! 8N1, no flow control. The bridge device enumerates as a USB serial
//! adapter, so the baud rate must match its firmware (921600 by default).

use super::{PortProvider, SerialLink};
use crate::constants::DEFAULT_BAUD_RATE;
use crate::error::{OsdError, Result};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// OS serial ports
///
/// # Example
///
/// ```ignore
/// let ports = SystemPorts::new(921_600);
/// for name in ports.available_ports()? {
///     let mut link = ports.open(&name, Duration::from_secs(1))?;
///     link.write_all(&codec::identify_frame())?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SystemPorts {
    baud_rate: u32,
}

impl SystemPorts {
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Default for SystemPorts {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE)
    }
}

impl PortProvider for SystemPorts {
    fn available_ports(&self) -> Result<Vec<String>> {
        let ports = serialport::available_ports().map_err(|e| OsdError::PortEnumeration {
            source: std::io::Error::other(e.to_string()),
        })?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, port: &str, timeout: Duration) -> Result<Box<dyn SerialLink>> {
        let map_err = |e: serialport::Error| OsdError::SerialOpen {
            port: port.to_string(),
            source: std::io::Error::other(e.to_string()),
        };

        let handle = serialport::new(port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(map_err)?;

        Ok(Box::new(SerialPortLink { port: handle }))
    }
}

/// Open OS serial port
struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink for SerialPortLink {
    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }

    fn clear_input(&mut self) -> std::io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(std::io::Error::from)
    }
}
