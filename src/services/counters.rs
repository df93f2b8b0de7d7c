use rust_decimal::Decimal;

use crate::models::KickResult;
use crate::services::classifier::{PassStat, ReturnKind, RushStat, SackStat, TargetStat};
use crate::utils::{add_opt, DistanceBand};

/// Passing counters shared by the player and team lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassingLine {
    pub attempts: i32,
    pub completions: i32,
    pub yards: i32,
    pub touchdowns: i32,
    pub interceptions: i32,
    pub sacks: i32,
    pub sack_yards: i32,
    pub sack_fumbles: i32,
    pub sack_fumbles_lost: i32,
    pub first_downs: i32,
    pub air_yards: i32,
    pub yac: i32,
    pub two_point_conversions: i32,
    pub scramble_dropbacks: i32,
    pub epa: Option<Decimal>,
    pub cpoe_sum: Option<Decimal>,
    pub cpoe_count: i32,
    pub successes: i32,
}

impl PassingLine {
    pub fn add_pass(&mut self, pass: &PassStat) {
        self.attempts += 1;
        self.completions += pass.complete as i32;
        self.yards += pass.yards;
        self.touchdowns += pass.touchdown as i32;
        self.interceptions += pass.interception as i32;
        self.first_downs += pass.first_down as i32;
        self.air_yards += pass.air_yards;
        self.yac += pass.yac;
        self.epa = add_opt(self.epa, pass.epa);
        if let Some(cpoe) = pass.cpoe {
            self.cpoe_sum = add_opt(self.cpoe_sum, Some(cpoe));
            self.cpoe_count += 1;
        }
        self.successes += pass.success as i32;
    }

    pub fn add_sack(&mut self, sack: &SackStat) {
        self.sacks += 1;
        self.sack_yards += sack.yards_lost;
        self.sack_fumbles += sack.fumble as i32;
        self.sack_fumbles_lost += sack.fumble_lost as i32;
        self.epa = add_opt(self.epa, sack.epa);
        self.successes += sack.success as i32;
    }

    /// Pass plays: attempts plus sacks.
    pub fn plays(&self) -> i32 {
        self.attempts + self.sacks
    }

    pub fn dropbacks(&self) -> i32 {
        self.attempts + self.sacks + self.scramble_dropbacks
    }

    pub fn is_empty(&self) -> bool {
        self.plays() == 0 && self.two_point_conversions == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RushingLine {
    pub attempts: i32,
    pub yards: i32,
    pub touchdowns: i32,
    pub long: Option<i32>,
    pub first_downs: i32,
    pub fumbles: i32,
    pub fumbles_lost: i32,
    pub two_point_conversions: i32,
    pub epa: Option<Decimal>,
    pub successes: i32,
}

impl RushingLine {
    pub fn add(&mut self, rush: &RushStat) {
        self.attempts += 1;
        self.yards += rush.yards;
        self.touchdowns += rush.touchdown as i32;
        self.long = running_max(self.long, rush.yards);
        self.first_downs += rush.first_down as i32;
        self.fumbles += rush.fumble as i32;
        self.fumbles_lost += rush.fumble_lost as i32;
        self.epa = add_opt(self.epa, rush.epa);
        self.successes += rush.success as i32;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceivingLine {
    pub targets: i32,
    pub receptions: i32,
    pub yards: i32,
    pub touchdowns: i32,
    pub long: Option<i32>,
    pub first_downs: i32,
    pub air_yards: i32,
    pub yac: i32,
    pub fumbles: i32,
    pub fumbles_lost: i32,
    pub two_point_conversions: i32,
    pub epa: Option<Decimal>,
    pub successes: i32,
}

impl ReceivingLine {
    pub fn add(&mut self, target: &TargetStat) {
        self.targets += 1;
        self.air_yards += target.air_yards;
        self.epa = add_opt(self.epa, target.epa);
        self.successes += target.success as i32;
        self.fumbles += target.fumble as i32;
        self.fumbles_lost += target.fumble_lost as i32;
        if target.complete {
            self.receptions += 1;
            self.yards += target.yards;
            self.yac += target.yac;
            self.touchdowns += target.touchdown as i32;
            self.first_downs += target.first_down as i32;
            self.long = running_max(self.long, target.yards);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnLine {
    pub punt_returns: i32,
    pub punt_return_yards: i32,
    pub kickoff_returns: i32,
    pub kickoff_return_yards: i32,
    pub touchdowns: i32,
}

impl ReturnLine {
    pub fn add(&mut self, kind: ReturnKind, yards: i32, touchdown: bool) {
        match kind {
            ReturnKind::Punt => {
                self.punt_returns += 1;
                self.punt_return_yards += yards;
            }
            ReturnKind::Kickoff => {
                self.kickoff_returns += 1;
                self.kickoff_return_yards += yards;
            }
        }
        self.touchdowns += touchdown as i32;
    }
}

/// Field goal or PAT tallies with per-band buckets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KickLine {
    pub made: i32,
    pub missed: i32,
    pub blocked: i32,
    pub long: Option<i32>,
    pub made_bands: [i32; 6],
    pub missed_bands: [i32; 6],
    pub blocked_bands: [i32; 6],
    pub made_distances: Vec<i32>,
    pub missed_distances: Vec<i32>,
    pub blocked_distances: Vec<i32>,
}

impl KickLine {
    pub fn add(&mut self, distance: Option<i32>, result: KickResult) {
        let (count, bands, distances) = match result {
            KickResult::Made => (&mut self.made, &mut self.made_bands, &mut self.made_distances),
            KickResult::Missed => (
                &mut self.missed,
                &mut self.missed_bands,
                &mut self.missed_distances,
            ),
            KickResult::Blocked => (
                &mut self.blocked,
                &mut self.blocked_bands,
                &mut self.blocked_distances,
            ),
        };
        *count += 1;
        if let Some(yards) = distance {
            bands[DistanceBand::from_distance(yards).index()] += 1;
            distances.push(yards);
            if result == KickResult::Made {
                self.long = running_max(self.long, yards);
            }
        }
    }

    pub fn attempts(&self) -> i32 {
        self.made + self.missed + self.blocked
    }
}

/// Longest-gain tracking only moves on positive gains.
fn running_max(current: Option<i32>, gain: i32) -> Option<i32> {
    if gain <= 0 {
        return current;
    }
    Some(current.map_or(gain, |long| long.max(gain)))
}
