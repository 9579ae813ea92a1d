//! Gap to the next faster rank
//!
//! For the crossing pilot we look one row up the active leaderboard and
//! compute the split the pilot must make up. What "split" means depends on
//! the win condition:
//!
//! | Condition              | Split                                   |
//! |------------------------|-----------------------------------------|
//! | FASTEST_CONSECUTIVE    | own consecutives - ahead's consecutives |
//! | FASTEST_LAP            | own last lap - ahead's fastest lap      |
//! | MOST_LAPS / X / NONE   | own total time - ahead's total time     |
//!
//! The leader has nobody ahead. In the time-trial conditions the leader is
//! instead compared to their own best lap when the lap just flown was slower.
//!
//! Only positive splits are reported.

use super::{RaceSnapshot, RankEntry, Seat, WinCondition};
use crate::error::{OsdError, Result};

/// Rank the crossing pilot is chasing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextRank<'a> {
    pub entry: &'a RankEntry,
    /// Milliseconds behind `entry`, always > 0
    pub split_raw: i64,
    /// `entry` is the crossing pilot (leader compared to own best)
    pub is_self: bool,
}

/// Crossing pilot with their standing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapInfo<'a> {
    pub current: &'a RankEntry,
    /// Row index in the active leaderboard
    pub rank_index: usize,
    /// Lap just flown equals the pilot's fastest lap
    pub is_best_lap: bool,
    pub next_rank: Option<NextRank<'a>>,
}

/// Build the gap view for a seat
///
/// Fails with `SeatNotRanked` when the seat is not in the active leaderboard.
pub fn compute_gap(snapshot: &RaceSnapshot, seat: Seat) -> Result<GapInfo<'_>> {
    let win_condition = snapshot.meta.win_condition;
    let board = snapshot.leaderboard();

    let rank_index = board
        .iter()
        .position(|entry| entry.seat == Some(seat))
        .ok_or(OsdError::SeatNotRanked { seat })?;
    let current = &board[rank_index];

    let is_best_lap = !current.in_holeshot()
        && current.fastest_lap_raw.is_some()
        && current.fastest_lap_raw == current.last_lap_raw;

    let ahead = rank_index
        .checked_sub(1)
        .map(|i| &board[i])
        .filter(|_| current.position.unwrap_or(0) > 1);

    let next_rank = match ahead {
        Some(ahead) => split_to_ahead(win_condition, current, ahead).map(|split_raw| NextRank {
            entry: ahead,
            split_raw,
            is_self: false,
        }),
        None => split_to_own_best(win_condition, current).map(|split_raw| NextRank {
            entry: current,
            split_raw,
            is_self: true,
        }),
    };

    Ok(GapInfo {
        current,
        rank_index,
        is_best_lap,
        next_rank,
    })
}

/// Split to the rank directly ahead
fn split_to_ahead(win: WinCondition, current: &RankEntry, ahead: &RankEntry) -> Option<i64> {
    // Ahead has no time yet: nothing meaningful to compare
    ahead.total_time_raw.filter(|&t| t != 0)?;

    let split = match win {
        WinCondition::FastestConsecutive => {
            current.consecutives_raw? - ahead.consecutives_raw?
        }
        WinCondition::FastestLap => current.last_lap_raw? - ahead.fastest_lap_raw?,
        WinCondition::MostLaps | WinCondition::FirstToLapX | WinCondition::None => {
            current.total_time_raw? - ahead.total_time_raw?
        }
    };

    (split > 0).then_some(split)
}

/// Leader in a time trial: how much slower the last lap was than their best
fn split_to_own_best(win: WinCondition, current: &RankEntry) -> Option<i64> {
    if !win.is_time_trial() || current.in_holeshot() {
        return None;
    }
    let split = current.last_lap_raw? - current.fastest_lap_raw?;
    (split > 0).then_some(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::RaceMeta;

    fn entry(seat: Seat, position: i64, laps: i64) -> RankEntry {
        RankEntry {
            seat: Some(seat),
            pilot_id: Some(seat as u64 + 100),
            callsign: format!("Pilot{}", seat),
            position: Some(position),
            laps: Some(laps),
            ..RankEntry::default()
        }
    }

    fn snapshot(win: WinCondition, board: Vec<RankEntry>) -> RaceSnapshot {
        let mut s = RaceSnapshot {
            meta: RaceMeta {
                win_condition: win,
                consecutives_base: 3,
            },
            ..RaceSnapshot::default()
        };
        match win {
            WinCondition::FastestLap => s.by_fastest_lap = board,
            WinCondition::FastestConsecutive => s.by_consecutives = board,
            _ => s.by_race_time = board,
        }
        s
    }

    #[test]
    fn test_unknown_seat_is_error() {
        let s = snapshot(WinCondition::MostLaps, vec![entry(0, 1, 2)]);
        assert!(matches!(
            compute_gap(&s, 5),
            Err(OsdError::SeatNotRanked { seat: 5 })
        ));
    }

    #[test]
    fn test_fastest_lap_split_to_ahead() {
        let mut leader = entry(0, 1, 3);
        leader.fastest_lap_raw = Some(20_000);
        leader.total_time_raw = Some(66_000);
        let mut second = entry(1, 2, 3);
        second.last_lap_raw = Some(20_350);
        second.fastest_lap_raw = Some(20_350);
        second.total_time_raw = Some(68_000);

        let s = snapshot(WinCondition::FastestLap, vec![leader, second]);
        let gap = compute_gap(&s, 1).unwrap();

        assert_eq!(gap.rank_index, 1);
        assert!(gap.is_best_lap);
        let next = gap.next_rank.unwrap();
        assert_eq!(next.entry.callsign, "Pilot0");
        assert_eq!(next.split_raw, 350);
        assert!(!next.is_self);
    }

    #[test]
    fn test_leader_compared_to_own_best() {
        let mut leader = entry(0, 1, 4);
        leader.fastest_lap_raw = Some(20_000);
        leader.last_lap_raw = Some(20_500);
        leader.total_time_raw = Some(90_000);

        let s = snapshot(WinCondition::FastestLap, vec![leader]);
        let gap = compute_gap(&s, 0).unwrap();
        assert!(!gap.is_best_lap);
        let next = gap.next_rank.unwrap();
        assert!(next.is_self);
        assert_eq!(next.split_raw, 500);
    }

    #[test]
    fn test_leader_on_best_lap_has_no_split() {
        let mut leader = entry(0, 1, 4);
        leader.fastest_lap_raw = Some(20_000);
        leader.last_lap_raw = Some(20_000);

        let s = snapshot(WinCondition::FastestLap, vec![leader]);
        let gap = compute_gap(&s, 0).unwrap();
        assert!(gap.is_best_lap);
        assert!(gap.next_rank.is_none());
    }

    #[test]
    fn test_race_time_split() {
        let mut leader = entry(0, 1, 3);
        leader.total_time_raw = Some(60_000);
        let mut second = entry(1, 2, 3);
        second.total_time_raw = Some(61_200);

        let s = snapshot(WinCondition::MostLaps, vec![leader, second]);
        let gap = compute_gap(&s, 1).unwrap();
        assert_eq!(gap.next_rank.unwrap().split_raw, 1_200);

        // Leader in a race-progress condition has no reference
        let gap = compute_gap(&s, 0).unwrap();
        assert!(gap.next_rank.is_none());
    }

    #[test]
    fn test_non_positive_split_is_dropped() {
        // Ahead has an extra lap, so a smaller total time
        let mut leader = entry(0, 1, 4);
        leader.total_time_raw = Some(80_000);
        let mut second = entry(1, 2, 3);
        second.total_time_raw = Some(62_000);

        let s = snapshot(WinCondition::MostLaps, vec![leader, second]);
        assert!(compute_gap(&s, 1).unwrap().next_rank.is_none());
    }

    #[test]
    fn test_ahead_without_time_has_no_split() {
        let leader = entry(0, 1, 0);
        let mut second = entry(1, 2, 0);
        second.total_time_raw = Some(3_000);

        let s = snapshot(WinCondition::MostLaps, vec![leader, second]);
        assert!(compute_gap(&s, 1).unwrap().next_rank.is_none());
    }

    #[test]
    fn test_consecutives_split_needs_both_values() {
        let mut leader = entry(0, 1, 3);
        leader.total_time_raw = Some(63_000);
        leader.consecutives_raw = Some(61_000);
        let mut second = entry(1, 2, 2);
        second.total_time_raw = Some(44_000);

        let s = snapshot(WinCondition::FastestConsecutive, vec![leader.clone(), second.clone()]);
        assert!(compute_gap(&s, 1).unwrap().next_rank.is_none());

        second.consecutives_raw = Some(62_500);
        let s = snapshot(WinCondition::FastestConsecutive, vec![leader, second]);
        assert_eq!(compute_gap(&s, 1).unwrap().next_rank.unwrap().split_raw, 1_500);
    }

    #[test]
    fn test_holeshot_is_never_best_lap() {
        let mut pilot = entry(0, 1, 0);
        pilot.fastest_lap_raw = Some(0);
        pilot.last_lap_raw = Some(0);

        let s = snapshot(WinCondition::FastestLap, vec![pilot]);
        let gap = compute_gap(&s, 0).unwrap();
        assert!(!gap.is_best_lap);
        assert!(gap.next_rank.is_none());
    }
}
