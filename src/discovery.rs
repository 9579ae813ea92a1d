//! Bridge device discovery
//!
//! Finds the serial port hosting the OSD bridge:
//!
//! 1. A configured port is trusted as-is (no probe).
//! 2. Otherwise each enumerated port is opened, given time to boot, flushed,
//!    sent an IDENTIFY frame and read for the device signature.
//! 3. The first port answering with the signature wins.
//!
//! Discovery never fails outward. Open errors, timeouts and wrong answers only
//! disqualify the port being probed; the result is a [`DiscoveryOutcome`].

use crate::codec;
use crate::constants::{DEVICE_SIGNATURE, DISCOVERY_READ_TIMEOUT_MS, DISCOVERY_SETTLE_DELAY_MS};
use crate::error::{OsdError, Result};
use crate::transport::{PortProvider, SerialLink};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Probe parameters (all hardware specific)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Read timeout while waiting for the IDENTIFY answer
    pub read_timeout: Duration,
    /// Wait after opening a port before probing it
    pub settle_delay: Duration,
    /// Expected answer; its byte length is how much is read
    pub signature: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DISCOVERY_READ_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DISCOVERY_SETTLE_DELAY_MS),
            signature: DEVICE_SIGNATURE.to_string(),
        }
    }
}

/// Result of one discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Port taken from configuration, not verified
    Configured(String),
    /// Port answered IDENTIFY with the signature
    Found(String),
    /// No port answered
    NotFound,
}

impl DiscoveryOutcome {
    /// Port to use, if any
    pub fn port(&self) -> Option<&str> {
        match self {
            Self::Configured(p) | Self::Found(p) => Some(p),
            Self::NotFound => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.port().is_some()
    }
}

/// Run discovery
///
/// `configured` is the manual port override; blank values count as unset.
pub fn discover(
    ports: &dyn PortProvider,
    configured: Option<&str>,
    settings: &DiscoverySettings,
) -> DiscoveryOutcome {
    if let Some(port) = configured.map(str::trim).filter(|p| !p.is_empty()) {
        info!("Using configured OSD port {}", port);
        return DiscoveryOutcome::Configured(port.to_string());
    }

    let candidates = match ports.available_ports() {
        Ok(c) => c,
        Err(e) => {
            warn!("OSD discovery: {}", e);
            return DiscoveryOutcome::NotFound;
        }
    };

    debug!("OSD discovery: {} candidate port(s)", candidates.len());

    for name in candidates {
        match probe(ports, &name, settings) {
            Ok(true) => {
                info!("Found OSD bridge on {}", name);
                return DiscoveryOutcome::Found(name);
            }
            Ok(false) => debug!("{}: no OSD bridge signature", name),
            Err(e) => debug!("{}: skipped ({})", name, e),
        }
    }

    warn!("No OSD bridge found, OSD updates disabled");
    DiscoveryOutcome::NotFound
}

/// Probe one port, `Ok(true)` when it answers with the signature
fn probe(ports: &dyn PortProvider, name: &str, settings: &DiscoverySettings) -> Result<bool> {
    let mut link = ports.open(name, settings.read_timeout)?;

    if !settings.settle_delay.is_zero() {
        std::thread::sleep(settings.settle_delay);
    }

    let io_err = |source: std::io::Error| OsdError::SerialIo {
        port: name.to_string(),
        source,
    };

    link.clear_input().map_err(io_err)?;
    link.write_all(&codec::identify_frame()).map_err(io_err)?;

    let response = read_response(link.as_mut(), settings.signature.len()).map_err(io_err)?;
    Ok(matches_signature(&response, &settings.signature))
}

/// Read up to `len` bytes, stopping early on timeout
fn read_response(link: &mut dyn SerialLink, len: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;

    while filled < len {
        match link.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
            Err(e) => return Err(e),
        }
    }

    buf.truncate(filled);
    Ok(buf)
}

/// Whether the answer starts with the signature
///
/// Answers that are not valid ASCII text never match.
pub fn matches_signature(response: &[u8], signature: &str) -> bool {
    let Some(head) = response.get(..signature.len()) else {
        return false;
    };
    match std::str::from_utf8(head) {
        Ok(text) => text.is_ascii() && text == signature,
        Err(_) => false,
    }
}
