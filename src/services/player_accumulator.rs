use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::KickResult;
use crate::services::classifier::{ClassifiedPlay, DefenderCredit, Stat, TwoPointRole};
use crate::services::counters::{PassingLine, ReceivingLine, ReturnLine, RushingLine};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefenseLine {
    pub tackles_solo: i32,
    pub tackle_assists: i32,
    pub tackles_for_loss: i32,
    pub sacks: Decimal,
    pub sack_yards: Decimal,
    pub qb_hits: i32,
    pub interceptions: i32,
    pub interception_yards: i32,
    pub pass_defended: i32,
    pub fumbles_forced: i32,
    pub touchdowns: i32,
}

impl DefenseLine {
    fn add(&mut self, credit: &DefenderCredit) {
        match credit {
            DefenderCredit::SoloTackle => self.tackles_solo += 1,
            DefenderCredit::AssistTackle => self.tackle_assists += 1,
            DefenderCredit::TackleForLoss => self.tackles_for_loss += 1,
            DefenderCredit::Sack { credit, yards } => {
                self.sacks += *credit;
                self.sack_yards += *yards;
            }
            DefenderCredit::QbHit => self.qb_hits += 1,
            DefenderCredit::Interception { return_yards } => {
                self.interceptions += 1;
                self.interception_yards += *return_yards;
            }
            DefenderCredit::PassDefended => self.pass_defended += 1,
            DefenderCredit::ForcedFumble => self.fumbles_forced += 1,
            DefenderCredit::Touchdown => self.touchdowns += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KickingLine {
    pub fg_made: i32,
    pub fg_att: i32,
    pub fg_long: Option<i32>,
    pub pat_made: i32,
    pub pat_att: i32,
}

/// Running counters for one player in one game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerLine {
    pub player_id: String,
    /// Every team the player was credited for; normally exactly one.
    pub teams: BTreeSet<String>,
    /// Offensive, kicking and return credits per team, excluding defensive ones.
    pub primary_credits: BTreeMap<String, u32>,
    pub passing: PassingLine,
    pub rushing: RushingLine,
    pub receiving: ReceivingLine,
    pub defense: DefenseLine,
    pub returns: ReturnLine,
    pub kicking: KickingLine,
}

impl PlayerLine {
    fn new(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            ..Self::default()
        }
    }

    /// The team the player's row is filed under: the one holding most of their primary
    /// credits, falling back to any credited team. Ties go to the smaller id.
    pub fn row_team(&self) -> Option<&str> {
        self.primary_credits
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(team, _)| team.as_str())
            .or_else(|| self.teams.iter().next().map(String::as_str))
    }

    fn credit(&mut self, team_id: &str, stat: &Stat) {
        self.teams.insert(team_id.to_string());
        if !matches!(stat, Stat::Defender(_)) {
            *self.primary_credits.entry(team_id.to_string()).or_default() += 1;
        }
        self.apply(stat);
    }

    fn apply(&mut self, stat: &Stat) {
        match stat {
            Stat::Pass(pass) => self.passing.add_pass(pass),
            Stat::Sacked(sack) => self.passing.add_sack(sack),
            Stat::Target(target) => self.receiving.add(target),
            Stat::Rush(rush) => {
                self.rushing.add(rush);
                self.passing.scramble_dropbacks += rush.dropback as i32;
            }
            Stat::TwoPoint { role, success } => {
                let converted = *success as i32;
                match role {
                    TwoPointRole::Passer => self.passing.two_point_conversions += converted,
                    TwoPointRole::Rusher => self.rushing.two_point_conversions += converted,
                    TwoPointRole::Receiver => self.receiving.two_point_conversions += converted,
                }
            }
            Stat::Defender(credit) => self.defense.add(credit),
            Stat::Return {
                kind,
                yards,
                touchdown,
            } => self.returns.add(*kind, *yards, *touchdown),
            Stat::FieldGoal {
                distance, result, ..
            } => {
                self.kicking.fg_att += 1;
                if *result == KickResult::Made {
                    self.kicking.fg_made += 1;
                    if let Some(yards) = distance {
                        self.kicking.fg_long =
                            Some(self.kicking.fg_long.map_or(*yards, |l| l.max(*yards)));
                    }
                }
            }
            Stat::ExtraPoint { result, .. } => {
                self.kicking.pat_att += 1;
                self.kicking.pat_made += (*result == KickResult::Made) as i32;
            }
            Stat::DefenseFaced(_)
            | Stat::Snap(_)
            | Stat::FumbleRecovery { .. }
            | Stat::ReturnTackles { .. }
            | Stat::Penalty { .. }
            | Stat::Timeout => {}
        }
    }
}

/// Folds classified plays into per-player lines for a single game.
#[derive(Debug, Default)]
pub struct PlayerAccumulator {
    lines: BTreeMap<String, PlayerLine>,
}

impl PlayerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, play: &ClassifiedPlay) {
        for contribution in &play.contributions {
            let Some(player_id) = contribution.player_id.as_deref() else {
                continue;
            };
            let line = self
                .lines
                .entry(player_id.to_string())
                .or_insert_with(|| PlayerLine::new(player_id));
            line.credit(&contribution.team_id, &contribution.stat);
        }
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerLine> {
        self.lines.get(player_id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in player id order.
    pub fn into_lines(self) -> impl Iterator<Item = PlayerLine> {
        self.lines.into_values()
    }
}
