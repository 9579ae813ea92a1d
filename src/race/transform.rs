//! Race events to OSD content
//!
//! A lap crossing produces a message for the crossing pilot and, in the
//! race-progress conditions, a second message for the pilot directly ahead:
//!
//! ```text
//!   crosser (P2)              pilot ahead (P1)
//!   LAP 0:21.100              LAP 0:20.800
//!   P1 +0:01.200              P2 -0:01.200
//!   Alpha                     Bravo
//! ```
//!
//! Line 1 is always `<LAP|HS> <time>`; lines 2 and 3 depend on the win
//! condition. Lifecycle events ignore standings. Heat-set and stage messages
//! greet each pilot by callsign; the others are the same for everyone.
//!
//! Everything here is pure: the composer reads a gap snapshot and returns
//! messages, the controller resolves addresses and sends them.

use super::gap::GapInfo;
use super::{PilotId, RaceMeta, RankEntry, Seat, WinCondition};
use crate::codec::display::TEXT_WIDTHS;
use crate::codec::DisplayMessage;
use crate::constants::{
    CALLSIGN_CLIP, DEFAULT_HOLESHOT_HEADER, DEFAULT_LAP_HEADER, DEFAULT_POSITION_HEADER,
    DEFAULT_PREVIOUS_LAP_HEADER,
};
use crate::host::RaceEvent;
use std::collections::VecDeque;

/// Text shown on the OSD, already localized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub lap_header: String,
    pub holeshot_header: String,
    pub previous_lap_header: String,
    pub position_header: String,
    pub leader: String,
    pub best_lap: String,
    pub round: String,
    pub ready: String,
    pub arm_now: String,
    pub go: String,
    pub time_expired: String,
    pub stopped: String,
    pub land_now: String,
}

/// Header overrides from host options
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderOptions<'a> {
    pub lap: Option<&'a str>,
    pub holeshot: Option<&'a str>,
    pub previous_lap: Option<&'a str>,
    pub position: Option<&'a str>,
}

impl Labels {
    /// Default labels passed through a translation function
    ///
    /// Headers are protocol-ish abbreviations and are not translated.
    pub fn localized(translate: impl Fn(&str) -> String) -> Self {
        Self {
            lap_header: DEFAULT_LAP_HEADER.to_string(),
            holeshot_header: DEFAULT_HOLESHOT_HEADER.to_string(),
            previous_lap_header: DEFAULT_PREVIOUS_LAP_HEADER.to_string(),
            position_header: DEFAULT_POSITION_HEADER.to_string(),
            leader: translate("Leader"),
            best_lap: translate("Best Lap"),
            round: translate("Round"),
            ready: translate("Ready"),
            arm_now: translate("Arm now"),
            go: translate("Go"),
            time_expired: translate("Time Expired"),
            stopped: translate("Race Stopped"),
            land_now: translate("Land Now"),
        }
    }

    /// Override the headers (blank values keep the defaults)
    pub fn with_headers(mut self, headers: HeaderOptions<'_>) -> Self {
        let slots = [
            (headers.lap, &mut self.lap_header),
            (headers.holeshot, &mut self.holeshot_header),
            (headers.previous_lap, &mut self.previous_lap_header),
            (headers.position, &mut self.position_header),
        ];
        for (value, label) in slots {
            if let Some(value) = value.map(str::trim).filter(|s| !s.is_empty()) {
                *label = value.to_string();
            }
        }
        self
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::localized(str::to_string)
    }
}

/// Whom a message is for, as known to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub seat: Option<Seat>,
    pub pilot_id: Option<PilotId>,
    pub callsign: String,
}

impl Recipient {
    fn of(entry: &RankEntry) -> Self {
        Self {
            seat: entry.seat,
            pilot_id: entry.pilot_id,
            callsign: entry.callsign.clone(),
        }
    }
}

/// One message bound for one pilot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub recipient: Recipient,
    pub message: DisplayMessage,
}

/// Who a lifecycle message is shown to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeatContext<'a> {
    pub callsign: &'a str,
    /// 1-based round of the heat being set
    pub round: u32,
}

/// Whether the lifecycle message for `event` differs per pilot
pub fn is_personal(event: &RaceEvent) -> bool {
    matches!(event, RaceEvent::HeatSet { .. } | RaceEvent::RaceStage)
}

/// Builds OSD messages from race state
pub struct Composer<'a> {
    labels: &'a Labels,
    format_time: &'a dyn Fn(i64) -> String,
}

impl<'a> Composer<'a> {
    pub fn new(labels: &'a Labels, format_time: &'a dyn Fn(i64) -> String) -> Self {
        Self {
            labels,
            format_time,
        }
    }

    fn time(&self, millis: i64) -> String {
        (self.format_time)(millis)
    }

    /// `<LAP|HS> <time>`; in the holeshot the time is the elapsed race time
    fn primary_line(&self, entry: &RankEntry) -> String {
        let (header, time) = if entry.in_holeshot() {
            (&self.labels.holeshot_header, entry.total_time_raw)
        } else {
            (&self.labels.lap_header, entry.last_lap_raw)
        };
        match time {
            Some(t) => format!("{} {}", header, self.time(t)),
            None => header.clone(),
        }
    }

    fn split_line(&self, position: Option<i64>, sign: char, split: i64) -> String {
        format!(
            "{}{} {}{}",
            self.labels.position_header,
            position.unwrap_or(0),
            sign,
            self.time(split)
        )
    }

    /// Message skeleton for a pilot: position, lap (0 in holeshot), line 1
    fn base_message(&self, entry: &RankEntry) -> DisplayMessage {
        let lap = if entry.in_holeshot() {
            Some(0)
        } else {
            entry.laps
        };
        let mut msg = DisplayMessage::new(entry.position, lap);
        msg.text1 = self.primary_line(entry);
        msg
    }

    /// Messages for one lap crossing, crosser first
    pub fn lap(&self, gap: &GapInfo<'_>, meta: &RaceMeta) -> Vec<Outgoing> {
        let current = gap.current;
        let mut msg = self.base_message(current);
        let mut out = Vec::with_capacity(2);
        let mut ahead_update = None;

        match meta.win_condition {
            WinCondition::FastestConsecutive => {
                let laps = current.lap_count();
                if laps >= 2 {
                    if let Some(prev) = current.previous_lap_raw {
                        msg.text2 =
                            format!("{} {}", self.labels.previous_lap_header, self.time(prev));
                    }
                    msg.text3 = self.consecutive_line(current, meta.consecutives_base);
                }
            }
            WinCondition::FastestLap => {
                if let Some(next) = gap.next_rank {
                    msg.text2 = self.split_line(next.entry.position, '+', next.split_raw);
                    msg.text3 = clip_callsign(&next.entry.callsign);
                } else if gap.is_best_lap {
                    msg.text2 = self.labels.leader.clone();
                    msg.text3 = self.labels.best_lap.clone();
                }
            }
            WinCondition::MostLaps | WinCondition::FirstToLapX | WinCondition::None => {
                match gap.next_rank {
                    Some(next) => {
                        msg.text2 = self.split_line(next.entry.position, '+', next.split_raw);
                        msg.text3 = clip_callsign(&next.entry.callsign);
                        if !next.is_self {
                            ahead_update = Some(self.ahead_message(current, next.entry, next.split_raw));
                        }
                    }
                    None => msg.text2 = self.labels.leader.clone(),
                }
            }
        }

        out.push(Outgoing {
            recipient: Recipient::of(current),
            message: msg,
        });
        out.extend(ahead_update);
        out
    }

    /// `<N>/  <time>` for the consecutive-laps ranking, N being the window
    ///
    /// Without a consecutive aggregate the sum of the laps flown is shown.
    fn consecutive_line(&self, entry: &RankEntry, base: u32) -> String {
        match entry.consecutives_raw.or(entry.total_time_laps_raw) {
            Some(time) => format!("{}/  {}", base, self.time(time)),
            None => String::new(),
        }
    }

    /// Tell the pilot ahead who is closing in
    fn ahead_message(&self, crosser: &RankEntry, ahead: &RankEntry, split: i64) -> Outgoing {
        let mut msg = self.base_message(ahead);
        msg.text2 = self.split_line(crosser.position, '-', split);
        msg.text3 = clip_callsign(&crosser.callsign);
        Outgoing {
            recipient: Recipient::of(ahead),
            message: msg,
        }
    }

    /// Lifecycle message for one pilot, `None` for events without one
    ///
    /// `heat` only matters for [`is_personal`] events.
    pub fn lifecycle(&self, event: &RaceEvent, heat: &HeatContext<'_>) -> Option<DisplayMessage> {
        let labels = self.labels;
        let blank = DisplayMessage::default();
        let msg = match event {
            RaceEvent::HeatSet { heat_name } => {
                let name = heat_name.trim();
                if name.is_empty() {
                    blank.with_lines(heat.callsign, "", &labels.ready)
                } else {
                    let round = format!("{} {}", labels.round, heat.round);
                    blank.with_lines(heat.callsign, &round, name)
                }
            }
            RaceEvent::RaceStage => blank.with_lines(heat.callsign, "", &labels.arm_now),
            RaceEvent::RaceStart => blank.with_lines("", "", &labels.go),
            RaceEvent::RaceFinish => blank.with_lines("", "", &labels.time_expired),
            RaceEvent::RaceStop => blank.with_lines("", &labels.stopped, &labels.land_now),
            RaceEvent::LapsCleared => blank,
            RaceEvent::SendMessage { text } => {
                let text = text.trim();
                if text.chars().count() <= TEXT_WIDTHS[2] {
                    blank.with_lines("", "", text)
                } else {
                    let [t1, t2, t3] = wrap_text(text, TEXT_WIDTHS);
                    blank.with_lines(t1, t2, t3)
                }
            }
            RaceEvent::Startup | RaceEvent::LapRecorded { .. } => return None,
        };
        Some(msg)
    }
}

fn clip_callsign(callsign: &str) -> String {
    callsign.chars().take(CALLSIGN_CLIP).collect()
}

/// Word-wrap free text over the three fields; words wider than a field are split
fn wrap_text(text: &str, widths: [usize; 3]) -> [String; 3] {
    let mut lines: [String; 3] = Default::default();
    let mut words: VecDeque<String> = text.split_whitespace().map(String::from).collect();

    for (line, &width) in lines.iter_mut().zip(widths.iter()) {
        while let Some(word) = words.pop_front() {
            let len = word.chars().count();
            let used = line.chars().count();
            let needed = if used == 0 { len } else { used + 1 + len };

            if needed <= width {
                if used > 0 {
                    line.push(' ');
                }
                line.push_str(&word);
            } else {
                if used == 0 {
                    line.extend(word.chars().take(width));
                    words.push_front(word.chars().skip(width).collect());
                } else {
                    words.push_front(word);
                }
                break;
            }
        }
    }
    lines
}
