//! Dispatch layer: serialized, fault-contained writes to the bridge
//!
//! The dispatcher owns the single serial connection:
//! - opened lazily on the first send after a target port is known
//! - kept open across sends
//! - dropped on any write error, so the next send reopens it
//!
//! Nothing here returns an error to the caller. A failed OSD update is logged
//! and counted, and race processing carries on.

pub mod stats;

use self::stats::{Stats, StatsSnapshot};
use crate::codec::{DeviceAddress, DisplayMessage, FieldLayout};
use crate::constants::DISPATCH_IO_TIMEOUT_MS;
use crate::discovery::DiscoveryOutcome;
use crate::transport::{PortProvider, SerialLink};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// What happened to one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame written
    Sent { bytes: usize },
    /// No port selected (discovery failed or not run)
    NotReady,
    /// Open or write failed, connection closed
    Failed,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Connection state, guarded by one lock so frames never interleave
struct LinkState {
    /// Port chosen by discovery
    target: Option<String>,
    /// Open connection to `target`
    link: Option<Box<dyn SerialLink>>,
    layout: FieldLayout,
}

/// Sends display messages to the bridge device
///
/// # Example
///
/// ```ignore
/// let dispatcher = Dispatcher::new(Arc::new(SystemPorts::default()), FieldLayout::STANDARD);
/// dispatcher.reselect(|| discover(&ports, None, &settings));
/// dispatcher.send(address, &DisplayMessage::banner("GO"));
/// ```
pub struct Dispatcher {
    ports: Arc<dyn PortProvider>,
    io_timeout: Duration,
    state: Mutex<LinkState>,
    stats: Stats,
}

impl Dispatcher {
    pub fn new(ports: Arc<dyn PortProvider>, layout: FieldLayout) -> Self {
        Self {
            ports,
            io_timeout: Duration::from_millis(DISPATCH_IO_TIMEOUT_MS),
            state: Mutex::new(LinkState {
                target: None,
                link: None,
                layout,
            }),
            stats: Stats::new(),
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Select the port to write to (`None` = not ready)
    ///
    /// Changing the target closes any open connection.
    pub fn set_target(&self, port: Option<String>) {
        let mut state = self.state.lock();
        if state.target != port {
            state.link = None;
            state.target = port;
        }
    }

    pub fn target(&self) -> Option<String> {
        self.state.lock().target.clone()
    }

    /// Whether sends will be attempted
    pub fn is_ready(&self) -> bool {
        self.state.lock().target.is_some()
    }

    /// Whether a connection is currently open
    pub fn is_open(&self) -> bool {
        self.state.lock().link.is_some()
    }

    pub fn set_layout(&self, layout: FieldLayout) {
        self.state.lock().layout = layout;
    }

    /// Close the connection (reopened on next send)
    pub fn close(&self) {
        self.state.lock().link = None;
    }

    /// Close the connection and pick a new target while holding the lock
    ///
    /// Serial ports open exclusively, so the bridge port must be released
    /// before it can be probed. Sends block until `select` returns and never
    /// reopen the port mid-probe.
    pub fn reselect<F>(&self, select: F) -> DiscoveryOutcome
    where
        F: FnOnce() -> DiscoveryOutcome,
    {
        let mut state = self.state.lock();
        if state.link.take().is_some() {
            debug!("Closed OSD port for discovery");
        }
        let outcome = select();
        state.target = outcome.port().map(str::to_string);
        outcome
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Serialize and write one message
    pub fn send(&self, address: DeviceAddress, message: &DisplayMessage) -> SendOutcome {
        let mut state = self.state.lock();

        let Some(port) = state.target.clone() else {
            debug!("OSD not ready, dropping message for {}", address);
            self.stats.add_skipped();
            return SendOutcome::NotReady;
        };

        let frame = match message.to_frame(address, state.layout) {
            Ok(f) => f,
            Err(e) => {
                // Fixed-size payload, only reachable with a broken layout
                error!("Cannot encode OSD message for {}: {}", address, e);
                self.stats.add_failure();
                return SendOutcome::Failed;
            }
        };

        let mut link = match state.link.take() {
            Some(link) => link,
            None => match self.ports.open(&port, self.io_timeout) {
                Ok(link) => {
                    debug!("Opened OSD port {}", port);
                    link
                }
                Err(e) => {
                    info!("OSD send to {} failed: {}", address, e);
                    self.stats.add_failure();
                    return SendOutcome::Failed;
                }
            },
        };

        match link.write_all(&frame) {
            Ok(()) => {
                state.link = Some(link);
                self.stats.add_sent(frame.len());
                debug!(
                    "osd {} <- P{} L{} {:?} {:?} {:?}",
                    address,
                    message.position,
                    message.lap_number,
                    message.text1,
                    message.text2,
                    message.text3
                );
                SendOutcome::Sent { bytes: frame.len() }
            }
            Err(e) => {
                // Link dropped here, next send reopens
                info!("OSD write to {} on {} failed: {}", address, port, e);
                self.stats.add_failure();
                SendOutcome::Failed
            }
        }
    }

    /// Send the same message to every address independently
    ///
    /// Returns how many sends succeeded.
    pub fn broadcast<I>(&self, addresses: I, message: &DisplayMessage) -> usize
    where
        I: IntoIterator<Item = DeviceAddress>,
    {
        addresses
            .into_iter()
            .map(|address| self.send(address, message))
            .filter(SendOutcome::is_sent)
            .count()
    }
}
