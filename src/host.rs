//! Capability interface to the race timing host
//!
//! Everything the OSD layer needs from the timing application goes through
//! [`Host`], injected at construction. The host owns the race: results,
//! heat seating, options and pilot attributes. We only read them, except for
//! the per-pilot device address which the UI field writes back.

use crate::constants::{
    ATTR_OSD_ADDRESS, OPTION_HOLESHOT_HEADER, OPTION_LAP_HEADER, OPTION_POSITION_HEADER,
    OPTION_PREVIOUS_LAP_HEADER, OPTION_REVISION, OPTION_SERIAL_PORT, OPTION_TIME_FORMAT,
};
use crate::race::{PilotId, RaceSnapshot, Seat, TimeFormat};
use tracing::info;

// =============================================================================
// Host capabilities
// =============================================================================

/// One seat of the current heat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatSlot {
    pub seat: Seat,
    /// `None` for an empty seat
    pub pilot_id: Option<PilotId>,
}

/// Services provided by the timing application
pub trait Host: Send + Sync {
    /// Current results, `None` when the host has nothing computed yet
    fn race_snapshot(&self) -> Option<RaceSnapshot>;

    /// Seating of the current heat
    fn heat_slots(&self) -> Vec<HeatSlot>;

    /// Configuration value by key
    fn option(&self, key: &str) -> Option<String>;

    fn pilot_attribute(&self, pilot: PilotId, name: &str) -> Option<String>;

    fn set_pilot_attribute(&self, pilot: PilotId, name: &str, value: &str);

    /// Display callsign of a pilot
    fn pilot_callsign(&self, pilot: PilotId) -> Option<String>;

    /// Rounds already run for the current heat
    fn completed_rounds(&self) -> u32 {
        0
    }

    /// Localized UI string
    fn translate(&self, text: &str) -> String {
        text.to_string()
    }

    /// Time pattern for OSD lines
    fn time_format(&self) -> TimeFormat {
        TimeFormat::from_option(self.option(OPTION_TIME_FORMAT).as_deref())
    }

    /// Short user-facing notice (result of a UI action)
    fn notify(&self, message: &str) {
        info!("{}", message);
    }
}

// =============================================================================
// Events
// =============================================================================

/// Host lifecycle events the OSD layer reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceEvent {
    /// Host finished starting up
    Startup,
    HeatSet { heat_name: String },
    RaceStage,
    RaceStart,
    RaceFinish,
    RaceStop,
    /// A pilot crossed the gate; `seat` may be missing from malformed events
    LapRecorded { seat: Option<Seat> },
    LapsCleared,
    /// Free text from the race director
    SendMessage { text: String },
}

/// Event names used for subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Startup,
    HeatSet,
    RaceStage,
    RaceStart,
    RaceFinish,
    RaceStop,
    LapRecorded,
    LapsCleared,
    SendMessage,
}

impl EventKind {
    /// Every event the controller must be registered for
    pub const ALL: [EventKind; 9] = [
        EventKind::Startup,
        EventKind::HeatSet,
        EventKind::RaceStage,
        EventKind::RaceStart,
        EventKind::RaceFinish,
        EventKind::RaceStop,
        EventKind::LapRecorded,
        EventKind::LapsCleared,
        EventKind::SendMessage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::HeatSet => "heat_set",
            Self::RaceStage => "race_stage",
            Self::RaceStart => "race_start",
            Self::RaceFinish => "race_finish",
            Self::RaceStop => "race_stop",
            Self::LapRecorded => "lap_recorded",
            Self::LapsCleared => "laps_cleared",
            Self::SendMessage => "send_message",
        }
    }
}

impl RaceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Startup => EventKind::Startup,
            Self::HeatSet { .. } => EventKind::HeatSet,
            Self::RaceStage => EventKind::RaceStage,
            Self::RaceStart => EventKind::RaceStart,
            Self::RaceFinish => EventKind::RaceFinish,
            Self::RaceStop => EventKind::RaceStop,
            Self::LapRecorded { .. } => EventKind::LapRecorded,
            Self::LapsCleared => EventKind::LapsCleared,
            Self::SendMessage { .. } => EventKind::SendMessage,
        }
    }
}

// =============================================================================
// UI descriptors
// =============================================================================

/// Where a field is shown in the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiPanel {
    /// Global settings
    Settings,
    /// Per-pilot attribute editor
    Pilot,
}

/// Text field exposed to the host UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiField {
    /// Option or attribute key
    pub key: &'static str,
    pub label: String,
    pub panel: UiPanel,
}

/// Button exposed to the host UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiAction {
    pub id: &'static str,
    pub label: String,
}

/// Id of the manual discovery action
pub const ACTION_DISCOVER: &str = "osd_discover";

/// Fields registered with the host, labels translated
pub fn ui_fields(host: &dyn Host) -> Vec<UiField> {
    let field = |key, label: &str, panel| UiField {
        key,
        label: host.translate(label),
        panel,
    };
    vec![
        field(ATTR_OSD_ADDRESS, "OSD Address", UiPanel::Pilot),
        field(OPTION_SERIAL_PORT, "OSD Serial Port", UiPanel::Settings),
        field(OPTION_LAP_HEADER, "OSD Lap Header", UiPanel::Settings),
        field(OPTION_HOLESHOT_HEADER, "OSD Holeshot Header", UiPanel::Settings),
        field(
            OPTION_PREVIOUS_LAP_HEADER,
            "OSD Previous Lap Header",
            UiPanel::Settings,
        ),
        field(OPTION_POSITION_HEADER, "OSD Position Header", UiPanel::Settings),
        field(OPTION_TIME_FORMAT, "OSD Time Format", UiPanel::Settings),
        field(OPTION_REVISION, "OSD Protocol Revision", UiPanel::Settings),
    ]
}

/// Actions registered with the host, labels translated
pub fn ui_actions(host: &dyn Host) -> Vec<UiAction> {
    vec![UiAction {
        id: ACTION_DISCOVER,
        label: host.translate("Find OSD Bridge"),
    }]
}
