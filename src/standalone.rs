//! Config-backed host for running without a timing application
//!
//! Seating and pilot addresses come from `[[pilots]]`, options from
//! `[serial]`/`[display]`, results from a JSON export loaded on demand.

use crate::config::Config;
use crate::constants::{
    ATTR_OSD_ADDRESS, OPTION_HOLESHOT_HEADER, OPTION_LAP_HEADER, OPTION_POSITION_HEADER,
    OPTION_PREVIOUS_LAP_HEADER, OPTION_REVISION, OPTION_SERIAL_PORT, OPTION_TIME_FORMAT,
};
use crate::error::{OsdError, Result};
use crate::host::{HeatSlot, Host};
use crate::race::{PilotId, RaceSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

pub struct ConfigHost {
    config: Config,
    results: RwLock<Option<RaceSnapshot>>,
    attributes: RwLock<HashMap<(PilotId, String), String>>,
}

impl ConfigHost {
    pub fn new(config: Config) -> Self {
        let attributes = config
            .pilots
            .iter()
            .filter(|p| !p.osd_address.trim().is_empty())
            .map(|p| ((p.id, ATTR_OSD_ADDRESS.to_string()), p.osd_address.clone()))
            .collect();
        Self {
            config,
            results: RwLock::new(None),
            attributes: RwLock::new(attributes),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install results, applying the `[race]` overrides
    pub fn set_results(&self, mut snapshot: RaceSnapshot) {
        if let Some(win) = self.config.race.win_condition {
            snapshot.meta.win_condition = win;
        }
        if let Some(base) = self.config.race.consecutives_base {
            snapshot.meta.consecutives_base = base;
        }
        *self.results.write() = Some(snapshot);
    }

    pub fn load_results(&self, path: &Path) -> Result<()> {
        let snapshot = read_results(path)?;
        self.set_results(snapshot);
        Ok(())
    }
}

/// Read a JSON results export
pub fn read_results(path: &Path) -> Result<RaceSnapshot> {
    let content = std::fs::read_to_string(path).map_err(|e| OsdError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| OsdError::ResultsParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl Host for ConfigHost {
    fn race_snapshot(&self) -> Option<RaceSnapshot> {
        self.results.read().clone()
    }

    fn heat_slots(&self) -> Vec<HeatSlot> {
        self.config
            .pilots
            .iter()
            .map(|p| HeatSlot {
                seat: p.seat,
                pilot_id: Some(p.id),
            })
            .collect()
    }

    fn option(&self, key: &str) -> Option<String> {
        let serial = &self.config.serial;
        let display = &self.config.display;
        let value = match key {
            OPTION_SERIAL_PORT => serial.port.clone(),
            OPTION_LAP_HEADER => display.lap_header.clone(),
            OPTION_HOLESHOT_HEADER => display.holeshot_header.clone(),
            OPTION_PREVIOUS_LAP_HEADER => display.previous_lap_header.clone(),
            OPTION_POSITION_HEADER => display.position_header.clone(),
            OPTION_TIME_FORMAT => display.time_format.clone(),
            OPTION_REVISION => display.revision.as_str().to_string(),
            _ => return None,
        };
        Some(value)
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
        self.config
            .pilots
            .iter()
            .find(|p| p.id == pilot)
            .map(|p| p.callsign.clone())
    }

    fn completed_rounds(&self) -> u32 {
        self.config.race.completed_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::display::Revision;
    use crate::config::PilotConfig;
    use crate::race::WinCondition;

    fn config() -> Config {
        let mut config = Config::default();
        config.serial.port = "COM5".into();
        config.display.revision = Revision::Terminated;
        config.pilots = vec![
            PilotConfig {
                id: 1,
                seat: 0,
                callsign: "Alpha".into(),
                osd_address: "a1".into(),
            },
            PilotConfig {
                id: 2,
                seat: 1,
                callsign: "Bravo".into(),
                osd_address: " ".into(),
            },
        ];
        config
    }

    #[test]
    fn test_options_map_to_config() {
        let host = ConfigHost::new(config());
        assert_eq!(host.option(OPTION_SERIAL_PORT).as_deref(), Some("COM5"));
        assert_eq!(host.option(OPTION_REVISION).as_deref(), Some("terminated"));
        assert_eq!(host.option(OPTION_LAP_HEADER).as_deref(), Some("LAP"));
        assert_eq!(host.option(OPTION_PREVIOUS_LAP_HEADER).as_deref(), Some("PRV"));
        assert_eq!(host.option(OPTION_POSITION_HEADER).as_deref(), Some("P"));
        assert_eq!(host.option("unknown"), None);
    }

    #[test]
    fn test_pilot_addresses_seeded_from_config() {
        let host = ConfigHost::new(config());
        assert_eq!(host.pilot_attribute(1, ATTR_OSD_ADDRESS).as_deref(), Some("a1"));
        assert_eq!(host.pilot_attribute(2, ATTR_OSD_ADDRESS), None);

        host.set_pilot_attribute(2, ATTR_OSD_ADDRESS, "b2");
        assert_eq!(host.pilot_attribute(2, ATTR_OSD_ADDRESS).as_deref(), Some("b2"));
    }

    #[test]
    fn test_heat_slots_from_pilots() {
        let host = ConfigHost::new(config());
        let slots = host.heat_slots();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1], HeatSlot { seat: 1, pilot_id: Some(2) });
    }

    #[test]
    fn test_callsigns_and_rounds_from_config() {
        let mut cfg = config();
        cfg.race.completed_rounds = 2;
        let host = ConfigHost::new(cfg);
        assert_eq!(host.pilot_callsign(2).as_deref(), Some("Bravo"));
        assert_eq!(host.pilot_callsign(7), None);
        assert_eq!(host.completed_rounds(), 2);
    }

    #[test]
    fn test_results_overrides() {
        let mut cfg = config();
        cfg.race.win_condition = Some(WinCondition::FastestLap);
        let host = ConfigHost::new(cfg);
        assert!(host.race_snapshot().is_none());

        host.set_results(RaceSnapshot::default());
        let snapshot = host.race_snapshot().unwrap();
        assert_eq!(snapshot.meta.win_condition, WinCondition::FastestLap);
        assert_eq!(snapshot.meta.consecutives_base, 3);
    }

    #[test]
    fn test_read_results_errors() {
        assert!(matches!(
            read_results(Path::new("/nonexistent/results.json")),
            Err(OsdError::Io { .. })
        ));

        let path = std::env::temp_dir().join(format!("osd-bridge-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let result = read_results(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(OsdError::ResultsParse { .. })));
    }
}
