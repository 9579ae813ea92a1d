//! OSD notification layer for drone race timing
//!
//! Turns race events (lap crossings, heat lifecycle) into per-pilot text
//! frames for the video OSD, and delivers them over a serial bridge:
//!
//! ```text
//! Host event -> OsdController -> Composer -> Dispatcher -> serial bridge -> goggles
//!                     |               ^
//!                     +-- compute_gap-+
//! ```
//!
//! The host timing application is reached only through [`host::Host`];
//! serial ports only through [`transport::PortProvider`].

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod controller;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod logging;
pub mod race;
pub mod standalone;
pub mod transport;

pub use controller::{EventOutcome, OsdController};
pub use error::{OsdError, Result};
pub use host::{HeatSlot, Host, RaceEvent};
