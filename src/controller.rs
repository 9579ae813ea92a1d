//! Event handling: host events in, OSD frames out
//!
//! The controller is the only piece wired to the host. For each event it
//! reads the host state it needs, composes messages and hands them to the
//! dispatcher. Failures stay inside: every event ends in an [`EventOutcome`]
//! and the host pipeline carries on.

use crate::codec::display::Revision;
use crate::codec::{DeviceAddress, FieldLayout};
use crate::constants::{
    ATTR_OSD_ADDRESS, OPTION_HOLESHOT_HEADER, OPTION_LAP_HEADER, OPTION_POSITION_HEADER,
    OPTION_PREVIOUS_LAP_HEADER, OPTION_REVISION, OPTION_SERIAL_PORT,
};
use crate::discovery::{self, DiscoveryOutcome, DiscoverySettings};
use crate::dispatch::stats::StatsSnapshot;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::host::{self, HeatSlot, Host, RaceEvent, UiAction, UiField};
use crate::race::transform::is_personal;
use crate::race::{
    compute_gap, Composer, HeaderOptions, HeatContext, Labels, Outgoing, PilotId, Seat,
};
use crate::transport::PortProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// What one event led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing to send (no pilot, no template, malformed event)
    Skipped,
    /// Messages handed to the dispatcher
    Delivered { sent: usize, attempted: usize },
    /// Race data lookup failed, nothing was sent
    Aborted,
    /// Discovery ran
    Discovered(DiscoveryOutcome),
}

/// OSD notification layer bound to one host
pub struct OsdController {
    host: Arc<dyn Host>,
    ports: Arc<dyn PortProvider>,
    dispatcher: Dispatcher,
    discovery: DiscoverySettings,
}

impl OsdController {
    pub fn new(
        host: Arc<dyn Host>,
        ports: Arc<dyn PortProvider>,
        discovery: DiscoverySettings,
    ) -> Self {
        let dispatcher = Dispatcher::new(ports.clone(), FieldLayout::STANDARD);
        Self {
            host,
            ports,
            dispatcher,
            discovery,
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.dispatcher = self.dispatcher.with_io_timeout(timeout);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.dispatcher.stats()
    }

    /// Handle one host event
    pub fn handle(&self, event: &RaceEvent) -> EventOutcome {
        debug!("OSD event: {}", event.kind().as_str());
        match event {
            RaceEvent::Startup => EventOutcome::Discovered(self.discover()),
            RaceEvent::LapRecorded { seat } => self.on_lap(*seat),
            other => self.on_lifecycle(other),
        }
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Select the bridge port and reload the protocol revision
    ///
    /// Safe to re-run: the open connection is released before probing.
    pub fn discover(&self) -> DiscoveryOutcome {
        self.refresh_layout();
        let configured = self.host.option(OPTION_SERIAL_PORT);
        self.dispatcher.reselect(|| {
            discovery::discover(self.ports.as_ref(), configured.as_deref(), &self.discovery)
        })
    }

    /// Manual discovery from the UI action; the result is shown to the user
    pub fn run_discovery_action(&self) -> DiscoveryOutcome {
        let outcome = self.discover();
        let notice = match outcome.port() {
            Some(port) => format!("{} {}", self.host.translate("OSD bridge on"), port),
            None => self.host.translate("OSD bridge not found"),
        };
        self.host.notify(&notice);
        outcome
    }

    fn refresh_layout(&self) {
        let revision = Revision::from_option(self.host.option(OPTION_REVISION).as_deref());
        self.dispatcher.set_layout(revision.layout());
    }

    // =========================================================================
    // Lap crossings
    // =========================================================================

    fn labels(&self) -> Labels {
        let lap = self.host.option(OPTION_LAP_HEADER);
        let holeshot = self.host.option(OPTION_HOLESHOT_HEADER);
        let previous_lap = self.host.option(OPTION_PREVIOUS_LAP_HEADER);
        let position = self.host.option(OPTION_POSITION_HEADER);
        Labels::localized(|text| self.host.translate(text)).with_headers(HeaderOptions {
            lap: lap.as_deref(),
            holeshot: holeshot.as_deref(),
            previous_lap: previous_lap.as_deref(),
            position: position.as_deref(),
        })
    }

    /// Messages a lap crossing on `seat` would produce, without sending
    pub fn compose_lap(&self, seat: Seat) -> Result<Vec<Outgoing>> {
        let snapshot = self.host.race_snapshot().unwrap_or_default();
        let gap = compute_gap(&snapshot, seat)?;

        let labels = self.labels();
        let time_format = self.host.time_format();
        let format_time = |millis: i64| time_format.format(millis);
        Ok(Composer::new(&labels, &format_time).lap(&gap, &snapshot.meta))
    }

    fn on_lap(&self, seat: Option<Seat>) -> EventOutcome {
        let Some(seat) = seat else {
            warn!("Lap event without a seat, ignored");
            return EventOutcome::Skipped;
        };

        let slots = self.host.heat_slots();
        if pilot_in_seat(&slots, seat).is_none() {
            debug!("No pilot in seat {}, no OSD update", seat);
            return EventOutcome::Skipped;
        }

        // Compose everything before sending anything
        let messages = match self.compose_lap(seat) {
            Ok(m) => m,
            Err(e) => {
                error!("OSD lap update aborted: {}", e);
                return EventOutcome::Aborted;
            }
        };

        let mut attempted = 0;
        let mut sent = 0;
        for out in &messages {
            let pilot = out
                .recipient
                .pilot_id
                .or_else(|| out.recipient.seat.and_then(|s| pilot_in_seat(&slots, s)));
            let Some(address) = pilot.and_then(|p| self.address_of(p)) else {
                debug!("No OSD address for {:?}, skipped", out.recipient.callsign);
                continue;
            };
            attempted += 1;
            if self.dispatcher.send(address, &out.message).is_sent() {
                sent += 1;
            }
        }
        EventOutcome::Delivered { sent, attempted }
    }

    // =========================================================================
    // Lifecycle broadcasts
    // =========================================================================

    fn on_lifecycle(&self, event: &RaceEvent) -> EventOutcome {
        let labels = self.labels();
        let time_format = self.host.time_format();
        let format_time = |millis: i64| time_format.format(millis);
        let composer = Composer::new(&labels, &format_time);
        let recipients = self.heat_recipients();

        if !is_personal(event) {
            let Some(message) = composer.lifecycle(event, &HeatContext::default()) else {
                return EventOutcome::Skipped;
            };
            let attempted = recipients.len();
            let addresses = recipients.into_iter().map(|(_, address)| address);
            let sent = self.dispatcher.broadcast(addresses, &message);
            return EventOutcome::Delivered { sent, attempted };
        }

        let round = self.host.completed_rounds().saturating_add(1);
        let mut sent = 0;
        for (pilot, address) in &recipients {
            let callsign = self.host.pilot_callsign(*pilot).unwrap_or_default();
            let heat = HeatContext {
                callsign: &callsign,
                round,
            };
            let Some(message) = composer.lifecycle(event, &heat) else {
                return EventOutcome::Skipped;
            };
            if self.dispatcher.send(*address, &message).is_sent() {
                sent += 1;
            }
        }
        EventOutcome::Delivered {
            sent,
            attempted: recipients.len(),
        }
    }

    /// Every seated pilot that has an address
    fn heat_recipients(&self) -> Vec<(PilotId, DeviceAddress)> {
        self.host
            .heat_slots()
            .iter()
            .filter_map(|slot| slot.pilot_id)
            .filter_map(|pilot| Some((pilot, self.address_of(pilot)?)))
            .collect()
    }

    // =========================================================================
    // Pilot addresses / UI
    // =========================================================================

    /// Device address of a pilot, `None` when unset or unparsable
    pub fn address_of(&self, pilot: PilotId) -> Option<DeviceAddress> {
        let raw = self.host.pilot_attribute(pilot, ATTR_OSD_ADDRESS);
        let address = DeviceAddress::from_attribute(raw.as_deref());
        if address.is_none() && raw.is_some_and(|r| !r.trim().is_empty()) {
            warn!("Pilot {} has an invalid OSD address", pilot);
        }
        address
    }

    /// Validate and store a pilot's device address (normalized to 12 hex digits)
    pub fn set_pilot_address(&self, pilot: PilotId, input: &str) -> Result<DeviceAddress> {
        let address = DeviceAddress::parse(input)?;
        self.host
            .set_pilot_attribute(pilot, ATTR_OSD_ADDRESS, &address.to_string());
        Ok(address)
    }

    pub fn ui_fields(&self) -> Vec<UiField> {
        host::ui_fields(self.host.as_ref())
    }

    pub fn ui_actions(&self) -> Vec<UiAction> {
        host::ui_actions(self.host.as_ref())
    }
}

fn pilot_in_seat(slots: &[HeatSlot], seat: Seat) -> Option<PilotId> {
    slots
        .iter()
        .find(|slot| slot.seat == seat)
        .and_then(|slot| slot.pilot_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, DisplayMessage};
    use crate::error::OsdError;
    use crate::race::{RaceSnapshot, RankEntry, WinCondition};
    use crate::transport::SerialLink;
    use parking_lot::{Mutex, RwLock};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    // =========================================================================
    // Fakes
    // =========================================================================

    #[derive(Default)]
    struct FakeHost {
        snapshot: RwLock<Option<RaceSnapshot>>,
        slots: Vec<HeatSlot>,
        callsigns: HashMap<PilotId, &'static str>,
        rounds: u32,
        options: HashMap<&'static str, String>,
        attributes: RwLock<HashMap<(PilotId, String), String>>,
        notices: Mutex<Vec<String>>,
    }

    impl Host for FakeHost {
        fn race_snapshot(&self) -> Option<RaceSnapshot> {
            self.snapshot.read().clone()
        }

        fn heat_slots(&self) -> Vec<HeatSlot> {
            self.slots.clone()
        }

        fn option(&self, key: &str) -> Option<String> {
            self.options.get(key).cloned()
        }

        fn pilot_attribute(&self, pilot: PilotId, name: &str) -> Option<String> {
            self.attributes
                .read()
                .get(&(pilot, name.to_string()))
                .cloned()
        }

        fn set_pilot_attribute(&self, pilot: PilotId, name: &str, value: &str) {
            self.attributes
                .write()
                .insert((pilot, name.to_string()), value.to_string());
        }

        fn pilot_callsign(&self, pilot: PilotId) -> Option<String> {
            self.callsigns.get(&pilot).map(|c| c.to_string())
        }

        fn completed_rounds(&self) -> u32 {
            self.rounds
        }

        fn notify(&self, message: &str) {
            self.notices.lock().push(message.to_string());
        }
    }

    #[derive(Default)]
    struct Wire {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    struct WirePorts(Arc<Wire>);

    struct WireLink(Arc<Wire>);

    impl SerialLink for WireLink {
        fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
            self.0.frames.lock().push(data.to_vec());
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn clear_input(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl PortProvider for WirePorts {
        fn available_ports(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn open(&self, _port: &str, _timeout: Duration) -> Result<Box<dyn SerialLink>> {
            Ok(Box::new(WireLink(self.0.clone())))
        }
    }

    /// One bridge on COM9 that only one link can hold at a time
    struct ExclusivePorts {
        wire: Arc<Wire>,
        in_use: Arc<AtomicBool>,
    }

    struct ExclusiveLink {
        wire: Arc<Wire>,
        in_use: Arc<AtomicBool>,
        pending: Vec<u8>,
    }

    impl Drop for ExclusiveLink {
        fn drop(&mut self) {
            self.in_use.store(false, Ordering::SeqCst);
        }
    }

    impl SerialLink for ExclusiveLink {
        fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
            if data == crate::codec::identify_frame().as_ref() {
                self.pending = b"Fusion ESP".to_vec();
            } else {
                self.wire.frames.lock().push(data.to_vec());
            }
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }

        fn clear_input(&mut self) -> std::io::Result<()> {
            self.pending.clear();
            Ok(())
        }
    }

    impl PortProvider for ExclusivePorts {
        fn available_ports(&self) -> Result<Vec<String>> {
            Ok(vec!["COM9".into()])
        }

        fn open(&self, port: &str, _timeout: Duration) -> Result<Box<dyn SerialLink>> {
            if self.in_use.swap(true, Ordering::SeqCst) {
                return Err(OsdError::SerialOpen {
                    port: port.to_string(),
                    source: std::io::Error::other("port busy"),
                });
            }
            Ok(Box::new(ExclusiveLink {
                wire: self.wire.clone(),
                in_use: self.in_use.clone(),
                pending: Vec::new(),
            }))
        }
    }

    fn row(seat: Seat, pilot: PilotId, callsign: &str, position: i64, total: i64) -> RankEntry {
        RankEntry {
            seat: Some(seat),
            pilot_id: Some(pilot),
            callsign: callsign.into(),
            position: Some(position),
            laps: Some(3),
            last_lap_raw: Some(20_000 + position * 100),
            total_time_raw: Some(total),
            ..RankEntry::default()
        }
    }

    fn setup(mut host: FakeHost) -> (OsdController, Arc<FakeHost>, Arc<Wire>) {
        host.options.insert(OPTION_SERIAL_PORT, "COM7".into());
        let host = Arc::new(host);
        let wire = Arc::new(Wire::default());
        let controller = OsdController::new(
            host.clone(),
            Arc::new(WirePorts(wire.clone())),
            DiscoverySettings::default(),
        );
        (controller, host, wire)
    }

    fn two_pilot_race() -> FakeHost {
        let mut snapshot = RaceSnapshot::default();
        snapshot.meta.win_condition = WinCondition::MostLaps;
        snapshot.by_race_time = vec![
            row(0, 10, "Alpha", 1, 60_000),
            row(1, 11, "Bravo", 2, 61_200),
        ];
        let host = FakeHost {
            snapshot: RwLock::new(Some(snapshot)),
            slots: vec![
                HeatSlot { seat: 0, pilot_id: Some(10) },
                HeatSlot { seat: 1, pilot_id: Some(11) },
                HeatSlot { seat: 2, pilot_id: None },
            ],
            callsigns: HashMap::from([(10, "Alpha"), (11, "Bravo")]),
            ..FakeHost::default()
        };
        host.set_pilot_attribute(10, ATTR_OSD_ADDRESS, "aaaaaaaaaaaa");
        host.set_pilot_attribute(11, ATTR_OSD_ADDRESS, "bbbbbbbbbbbb");
        host
    }

    fn sent_messages(wire: &Wire) -> Vec<(DeviceAddress, DisplayMessage)> {
        wire.frames
            .lock()
            .iter()
            .map(|f| DisplayMessage::parse(decode(f).unwrap().payload, FieldLayout::STANDARD).unwrap())
            .collect()
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[test]
    fn test_startup_uses_configured_port() {
        let (controller, _, _) = setup(FakeHost::default());
        assert_eq!(
            controller.handle(&RaceEvent::Startup),
            EventOutcome::Discovered(DiscoveryOutcome::Configured("COM7".into()))
        );
        assert!(controller.dispatcher().is_ready());
    }

    #[test]
    fn test_not_ready_sends_nothing() {
        let (controller, _, wire) = setup(two_pilot_race());
        let outcome = controller.handle(&RaceEvent::LapRecorded { seat: Some(1) });
        assert_eq!(outcome, EventOutcome::Delivered { sent: 0, attempted: 2 });
        assert!(wire.frames.lock().is_empty());
        assert_eq!(controller.stats().skipped, 2);
    }

    #[test]
    fn test_lap_sends_crosser_then_ahead() {
        let (controller, _, wire) = setup(two_pilot_race());
        controller.handle(&RaceEvent::Startup);

        let outcome = controller.handle(&RaceEvent::LapRecorded { seat: Some(1) });
        assert_eq!(outcome, EventOutcome::Delivered { sent: 2, attempted: 2 });

        let sent = sent_messages(&wire);
        assert_eq!(sent[0].0, DeviceAddress::parse("bbbbbbbbbbbb").unwrap());
        assert_eq!(sent[0].1.text2.trim_end(), "P1 +0:01.200");
        assert_eq!(sent[1].0, DeviceAddress::parse("aaaaaaaaaaaa").unwrap());
        assert_eq!(sent[1].1.text2.trim_end(), "P2 -0:01.200");
    }

    #[test]
    fn test_lap_edge_cases() {
        let (controller, host, wire) = setup(two_pilot_race());
        controller.handle(&RaceEvent::Startup);

        // Malformed event, empty seat
        assert_eq!(controller.handle(&RaceEvent::LapRecorded { seat: None }), EventOutcome::Skipped);
        assert_eq!(
            controller.handle(&RaceEvent::LapRecorded { seat: Some(2) }),
            EventOutcome::Skipped
        );

        // Seated but missing from the leaderboard
        host.snapshot.write().as_mut().unwrap().by_race_time.truncate(1);
        assert_eq!(
            controller.handle(&RaceEvent::LapRecorded { seat: Some(1) }),
            EventOutcome::Aborted
        );
        assert!(wire.frames.lock().is_empty());
    }

    #[test]
    fn test_pilot_without_address_is_skipped() {
        let (controller, host, wire) = setup(two_pilot_race());
        host.attributes.write().remove(&(10, ATTR_OSD_ADDRESS.to_string()));
        controller.handle(&RaceEvent::Startup);

        let outcome = controller.handle(&RaceEvent::LapRecorded { seat: Some(1) });
        assert_eq!(outcome, EventOutcome::Delivered { sent: 1, attempted: 1 });
        assert_eq!(wire.frames.lock().len(), 1);
    }

    #[test]
    fn test_lifecycle_broadcasts_to_heat() {
        let (controller, _, wire) = setup(two_pilot_race());
        controller.handle(&RaceEvent::Startup);

        let outcome = controller.handle(&RaceEvent::RaceStart);
        assert_eq!(outcome, EventOutcome::Delivered { sent: 2, attempted: 2 });
        let sent = sent_messages(&wire);
        assert!(sent.iter().all(|(_, m)| m.text3.trim_end() == "Go"));
    }

    #[test]
    fn test_heat_set_is_personalized() {
        let mut host = two_pilot_race();
        host.rounds = 1;
        let (controller, _, wire) = setup(host);
        controller.handle(&RaceEvent::Startup);

        let outcome = controller.handle(&RaceEvent::HeatSet {
            heat_name: "Heat 2".into(),
        });
        assert_eq!(outcome, EventOutcome::Delivered { sent: 2, attempted: 2 });

        let sent = sent_messages(&wire);
        assert_eq!(sent[0].0, DeviceAddress::parse("aaaaaaaaaaaa").unwrap());
        assert_eq!(sent[0].1.text1.trim_end(), "Alpha");
        assert_eq!(sent[0].1.text2.trim_end(), "Round 2");
        assert_eq!(sent[0].1.text3.trim_end(), "Heat 2");
        assert_eq!(sent[1].1.text1.trim_end(), "Bravo");

        controller.handle(&RaceEvent::RaceStage);
        let sent = sent_messages(&wire);
        assert_eq!(sent[3].1.text1.trim_end(), "Bravo");
        assert_eq!(sent[3].1.text3.trim_end(), "Arm now");
    }

    #[test]
    fn test_header_options_reach_split_lines() {
        let mut host = two_pilot_race();
        host.options.insert(OPTION_POSITION_HEADER, "#".into());
        let (controller, _, _) = setup(host);

        let out = controller.compose_lap(1).unwrap();
        assert_eq!(out[0].message.text2, "#1 +0:01.200");
    }

    #[test]
    fn test_rediscovery_releases_exclusive_port() {
        let wire = Arc::new(Wire::default());
        let ports = Arc::new(ExclusivePorts {
            wire: wire.clone(),
            in_use: Arc::new(AtomicBool::new(false)),
        });
        let host = Arc::new(two_pilot_race());
        let controller = OsdController::new(
            host.clone(),
            ports,
            DiscoverySettings {
                settle_delay: Duration::ZERO,
                ..DiscoverySettings::default()
            },
        );

        assert_eq!(controller.discover(), DiscoveryOutcome::Found("COM9".into()));
        assert_eq!(
            controller.handle(&RaceEvent::RaceStart),
            EventOutcome::Delivered { sent: 2, attempted: 2 }
        );
        assert!(controller.dispatcher().is_open());

        // Manual retry while the link is held
        assert_eq!(
            controller.run_discovery_action(),
            DiscoveryOutcome::Found("COM9".into())
        );
        assert!(controller.dispatcher().is_ready());
        assert_eq!(host.notices.lock().as_slice(), ["OSD bridge on COM9"]);
        assert_eq!(
            controller.handle(&RaceEvent::RaceFinish),
            EventOutcome::Delivered { sent: 2, attempted: 2 }
        );
    }

    #[test]
    fn test_revision_option_changes_frame_size() {
        let mut host = two_pilot_race();
        host.options.insert(OPTION_REVISION, "terminated".into());
        let (controller, _, wire) = setup(host);
        controller.handle(&RaceEvent::Startup);
        controller.handle(&RaceEvent::RaceStage);

        assert!(wire.frames.lock().iter().all(|f| f.len() == 65));
    }

    #[test]
    fn test_discovery_action_notifies() {
        let (controller, host, _) = setup(FakeHost::default());
        controller.run_discovery_action();
        assert_eq!(host.notices.lock().as_slice(), ["OSD bridge on COM7"]);
    }

    #[test]
    fn test_set_pilot_address_normalizes() {
        let (controller, host, _) = setup(FakeHost::default());
        let address = controller.set_pilot_address(4, " AB12 ").unwrap();
        assert_eq!(address.value(), 0xAB12);
        assert_eq!(
            host.pilot_attribute(4, ATTR_OSD_ADDRESS).as_deref(),
            Some("00000000ab12")
        );

        assert!(matches!(
            controller.set_pilot_address(4, "zz"),
            Err(OsdError::InvalidAddress { .. })
        ));
        assert_eq!(controller.address_of(4), DeviceAddress::new(0xAB12));
    }
}
