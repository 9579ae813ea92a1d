//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use crate::host::RaceEvent;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Race timing to video OSD bridge
#[derive(Parser, Debug)]
#[command(name = "osd-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: config.toml, then config/default.toml)
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Serial port to use (overrides config, skips discovery)
    #[arg(long, value_name = "PORT", global = true)]
    pub port: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find the OSD bridge and print its port
    Discover,

    /// Show free text on every configured pilot's OSD
    Message {
        text: String,
    },

    /// Broadcast a race lifecycle banner
    Event {
        #[arg(value_enum)]
        kind: EventArg,

        /// Heat name (for `heat`)
        #[arg(long)]
        name: Option<String>,
    },

    /// Send the lap update for one seat from a JSON results export
    Lap {
        #[arg(long)]
        seat: usize,

        #[arg(long, value_name = "FILE")]
        results: PathBuf,

        /// Print the messages instead of sending them
        #[arg(long)]
        print: bool,
    },
}

/// Lifecycle events available from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventArg {
    Heat,
    Stage,
    Start,
    Finish,
    Stop,
    Clear,
}

impl EventArg {
    pub fn to_event(self, name: Option<&str>) -> RaceEvent {
        match self {
            Self::Heat => RaceEvent::HeatSet {
                heat_name: name.unwrap_or_default().to_string(),
            },
            Self::Stage => RaceEvent::RaceStage,
            Self::Start => RaceEvent::RaceStart,
            Self::Finish => RaceEvent::RaceFinish,
            Self::Stop => RaceEvent::RaceStop,
            Self::Clear => RaceEvent::LapsCleared,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
