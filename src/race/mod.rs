//! Race results as consumed from the timing host
//!
//! The host computes leaderboards; this module only models the read-only
//! snapshot handed to us on each event. The JSON shape follows the host's
//! results export:
//!
//! ```json
//! {
//!   "meta": { "win_condition": "FASTEST_LAP", "consecutives_base": 3 },
//!   "by_race_time": [ { "node": 0, "pilot_id": 4, "callsign": "Alpha", ... } ],
//!   "by_fastest_lap": [ ... ],
//!   "by_consecutives": [ ... ]
//! }
//! ```
//!
//! Numeric fields are parsed leniently: the host fills unknown values with
//! `null`, `"-"` or an empty string, which all become `None`.

pub mod gap;
pub mod time_format;
pub mod transform;

pub use gap::{compute_gap, GapInfo, NextRank};
pub use time_format::TimeFormat;
pub use transform::{Composer, HeaderOptions, HeatContext, Labels, Outgoing, Recipient};

use crate::constants::DEFAULT_CONSECUTIVES_BASE;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host physical slot index
pub type Seat = usize;

/// Host pilot identifier
pub type PilotId = u64;

/// How the active race is won; selects the leaderboard and message template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WinCondition {
    FastestLap,
    #[serde(alias = "FASTEST_3_CONSECUTIVE")]
    FastestConsecutive,
    MostLaps,
    FirstToLapX,
    #[default]
    None,
}

impl WinCondition {
    /// Conditions ranked by lap time rather than race progress
    pub fn is_time_trial(self) -> bool {
        matches!(self, Self::FastestLap | Self::FastestConsecutive)
    }
}

/// One pilot's row in a leaderboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankEntry {
    #[serde(alias = "node", deserialize_with = "lenient_index")]
    pub seat: Option<Seat>,
    #[serde(deserialize_with = "lenient_id")]
    pub pilot_id: Option<PilotId>,
    pub callsign: String,
    #[serde(deserialize_with = "lenient_int")]
    pub position: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub laps: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub last_lap_raw: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub previous_lap_raw: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub fastest_lap_raw: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub total_time_raw: Option<i64>,
    /// Sum of completed laps (excludes the holeshot)
    #[serde(deserialize_with = "lenient_int")]
    pub total_time_laps_raw: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub consecutives_raw: Option<i64>,
}

impl RankEntry {
    /// Completed laps, 0 when unknown
    pub fn lap_count(&self) -> i64 {
        self.laps.unwrap_or(0).max(0)
    }

    /// No full lap completed yet
    pub fn in_holeshot(&self) -> bool {
        self.lap_count() == 0
    }
}

/// Race-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceMeta {
    pub win_condition: WinCondition,
    /// Lap window of the consecutive-laps ranking
    pub consecutives_base: u32,
}

impl Default for RaceMeta {
    fn default() -> Self {
        Self {
            win_condition: WinCondition::None,
            consecutives_base: DEFAULT_CONSECUTIVES_BASE,
        }
    }
}

/// Read-only results view for one event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSnapshot {
    pub meta: RaceMeta,
    pub by_race_time: Vec<RankEntry>,
    pub by_fastest_lap: Vec<RankEntry>,
    pub by_consecutives: Vec<RankEntry>,
}

impl RaceSnapshot {
    /// Leaderboard ordering that matches the win condition
    pub fn leaderboard(&self) -> &[RankEntry] {
        match self.meta.win_condition {
            WinCondition::FastestConsecutive => &self.by_consecutives,
            WinCondition::FastestLap => &self.by_fastest_lap,
            WinCondition::MostLaps | WinCondition::FirstToLapX | WinCondition::None => {
                &self.by_race_time
            }
        }
    }
}

// =============================================================================
// Lenient number parsing
// =============================================================================

/// Accepts integers, integral floats and numeric strings; anything else is `None`
struct LenientInt;

impl<'de> Visitor<'de> for LenientInt {
    type Value = Option<i64>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer, a numeric string or null")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(i64::try_from(v).ok())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        let integral = v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64;
        Ok(integral.then_some(v as i64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.trim().parse().ok())
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_any(LenientInt)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<de::IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<de::IgnoredAny, de::IgnoredAny>()?.is_some() {}
        Ok(None)
    }
}

/// Deserialize a host number, mapping non-integers to `None`
pub fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    d.deserialize_any(LenientInt)
}

fn lenient_index<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Seat>, D::Error> {
    Ok(lenient_int(d)?.and_then(|v| Seat::try_from(v).ok()))
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PilotId>, D::Error> {
    Ok(lenient_int(d)?.and_then(|v| PilotId::try_from(v).ok()))
}
