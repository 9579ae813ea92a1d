//! OSD Bridge - race timing to video OSD over serial
//!
//! Usage:
//!   osd-bridge discover                        Find the bridge port
//!   osd-bridge message "Land now"              Free text to every pilot
//!   osd-bridge event start                     Lifecycle banner
//!   osd-bridge lap --seat 1 --results r.json   Lap update from a results export

use clap::Parser;
use osd_bridge::cli::{Cli, Command};
use osd_bridge::config;
use osd_bridge::logging::init_tracing;
use osd_bridge::race::Outgoing;
use osd_bridge::standalone::ConfigHost;
use osd_bridge::transport::SystemPorts;
use osd_bridge::{EventOutcome, OsdController, RaceEvent, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => config::load_strict(path)?,
        None => config::load(None),
    };
    if let Some(port) = cli.port {
        config.serial.port = port;
    }
    config.validate()?;

    let ports = Arc::new(SystemPorts::new(config.serial.baud_rate));
    let discovery = config.discovery_settings();
    let write_timeout = config.write_timeout();
    let host = Arc::new(ConfigHost::new(config));
    let controller =
        OsdController::new(host.clone(), ports, discovery).with_io_timeout(write_timeout);

    let event = match cli.command {
        Command::Discover => {
            return Ok(match controller.discover().port() {
                Some(port) => {
                    println!("{}", port);
                    ExitCode::SUCCESS
                }
                None => {
                    eprintln!("No OSD bridge found");
                    ExitCode::FAILURE
                }
            });
        }
        Command::Message { text } => RaceEvent::SendMessage { text },
        Command::Event { kind, name } => kind.to_event(name.as_deref()),
        Command::Lap {
            seat,
            results,
            print,
        } => {
            host.load_results(&results)?;
            if print {
                controller.compose_lap(seat)?.iter().for_each(print_message);
                return Ok(ExitCode::SUCCESS);
            }
            RaceEvent::LapRecorded { seat: Some(seat) }
        }
    };

    controller.handle(&RaceEvent::Startup);
    let outcome = controller.handle(&event);
    let stats = controller.stats();
    eprintln!(
        "{:?}: {} frame(s), {} bytes, {} failure(s), {} skipped",
        outcome, stats.frames_sent, stats.bytes_sent, stats.failures, stats.skipped
    );

    Ok(match outcome {
        EventOutcome::Delivered { sent, attempted } if sent == attempted => ExitCode::SUCCESS,
        EventOutcome::Skipped => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn print_message(out: &Outgoing) {
    let msg = &out.message;
    println!(
        "{:<10} P{} L{} | {:<15} | {:<15} | {:<20}",
        out.recipient.callsign, msg.position, msg.lap_number, msg.text1, msg.text2, msg.text3
    );
}
