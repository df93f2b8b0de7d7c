use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::services::classifier::{
    ClassifiedPlay, DefenseFaced, NeutralPlay, Stat, TwoPointRole,
};
use crate::services::counters::{KickLine, PassingLine, ReceivingLine, ReturnLine, RushingLine};
use crate::utils::add_opt;

/// Defensive counters from the team's view of the opponent's scrimmage plays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamDefenseLine {
    pub plays: i32,
    pub epa: Option<Decimal>,
    pub tackles_solo: i32,
    pub tackles_with_assist: i32,
    pub tackle_assists: i32,
    pub tackles_for_loss: i32,
    pub tackles_for_loss_yards: i32,
    pub fumbles_forced: i32,
    pub sacks: Decimal,
    pub sack_yards: i32,
    pub qb_hits: i32,
    pub interceptions: i32,
    pub interception_yards: i32,
    pub pass_defended: i32,
    pub touchdowns: i32,
    pub safeties: i32,
    pub fumbles: i32,
}

impl TeamDefenseLine {
    fn add(&mut self, faced: &DefenseFaced) {
        self.plays += 1;
        self.epa = add_opt(self.epa, faced.epa);
        self.add_tackles(faced.solo_tackles, faced.assist_tackles);
        if faced.tackle_for_loss {
            self.tackles_for_loss += 1;
            self.tackles_for_loss_yards += faced.tackle_for_loss_yards;
        }
        self.fumbles_forced += faced.forced_fumbles;
        if faced.sack {
            // One full sack per sack event, however the defenders split it.
            self.sacks += Decimal::ONE;
            self.sack_yards += faced.sack_yards;
        }
        self.qb_hits += faced.qb_hits;
        if faced.interception {
            self.interceptions += 1;
            self.interception_yards += faced.interception_yards;
        }
        self.pass_defended += faced.passes_defended;
        self.touchdowns += faced.touchdown as i32;
        self.safeties += faced.safety as i32;
        self.fumbles += faced.fumbles;
    }

    fn add_tackles(&mut self, solo: i32, assists: i32) {
        self.tackles_solo += solo;
        self.tackle_assists += assists;
        self.tackles_with_assist += (assists > 0) as i32;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FumbleRecoveryLine {
    pub own: i32,
    pub own_yards: i32,
    pub opp: i32,
    pub opp_yards: i32,
    pub touchdowns: i32,
}

impl FumbleRecoveryLine {
    /// Return yardage on every recovered fumble, own or opponent's.
    pub fn yards(&self) -> i32 {
        self.own_yards + self.opp_yards
    }
}

/// Running counters for one team in one game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamLine {
    pub team_id: String,
    pub passing: PassingLine,
    pub rushing: RushingLine,
    pub receiving: ReceivingLine,
    pub defense: TeamDefenseLine,
    pub fumble_recoveries: FumbleRecoveryLine,
    pub penalties: i32,
    pub penalty_yards: i32,
    pub timeouts: i32,
    pub returns: ReturnLine,
    pub field_goals: KickLine,
    /// Field goals that could decide the game; also counted in `field_goals`.
    pub game_winning_fgs: KickLine,
    pub pats: KickLine,
    pub drives: BTreeSet<u32>,
    pub neutral_dropbacks: i32,
    pub neutral_rushes: i32,
}

impl TeamLine {
    fn new(team_id: &str) -> Self {
        Self {
            team_id: team_id.to_string(),
            ..Self::default()
        }
    }

    /// Pass attempts, sacks and rush attempts.
    pub fn total_plays(&self) -> i32 {
        self.passing.plays() + self.rushing.attempts
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
            Stat::DefenseFaced(faced) => self.defense.add(faced),
            Stat::Snap(snap) => {
                if let Some(drive) = snap.drive {
                    self.drives.insert(drive);
                }
                match snap.neutral {
                    Some(NeutralPlay::Dropback) => self.neutral_dropbacks += 1,
                    Some(NeutralPlay::DesignedRush) => self.neutral_rushes += 1,
                    None => {}
                }
            }
            Stat::Return {
                kind,
                yards,
                touchdown,
            } => self.returns.add(*kind, *yards, *touchdown),
            Stat::FieldGoal {
                distance,
                result,
                game_winning,
            } => {
                self.field_goals.add(*distance, *result);
                if *game_winning {
                    self.game_winning_fgs.add(*distance, *result);
                }
            }
            Stat::ExtraPoint { distance, result } => self.pats.add(*distance, *result),
            Stat::FumbleRecovery {
                own,
                yards,
                touchdown,
            } => {
                let recoveries = &mut self.fumble_recoveries;
                if *own {
                    recoveries.own += 1;
                    recoveries.own_yards += yards;
                } else {
                    recoveries.opp += 1;
                    recoveries.opp_yards += yards;
                }
                recoveries.touchdowns += *touchdown as i32;
            }
            Stat::Penalty { yards } => {
                self.penalties += 1;
                self.penalty_yards += yards;
            }
            Stat::Timeout => self.timeouts += 1,
            Stat::ReturnTackles { solo, assists } => self.defense.add_tackles(*solo, *assists),
            // Individual defender credits roll up through `DefenseFaced` instead.
            Stat::Defender(_) => {}
        }
    }
}

/// Folds classified plays into per-team lines for a single game, offense and defense
/// from the same contributions the player accumulator sees.
#[derive(Debug, Default)]
pub struct TeamAccumulator {
    lines: BTreeMap<String, TeamLine>,
}

impl TeamAccumulator {
    /// Seed a line for each participant so both teams get a row even without plays.
    pub fn new<'a>(teams: impl IntoIterator<Item = &'a str>) -> Self {
        let lines = teams
            .into_iter()
            .map(|team| (team.to_string(), TeamLine::new(team)))
            .collect();
        Self { lines }
    }

    pub fn apply(&mut self, play: &ClassifiedPlay) {
        for contribution in &play.contributions {
            self.lines
                .entry(contribution.team_id.clone())
                .or_insert_with(|| TeamLine::new(&contribution.team_id))
                .apply(&contribution.stat);
        }
    }

    pub fn get(&self, team_id: &str) -> Option<&TeamLine> {
        self.lines.get(team_id)
    }

    pub fn lines(&self) -> impl Iterator<Item = &TeamLine> {
        self.lines.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{KickResult, PlayEvent, PlayType};
    use crate::services::classifier::classify;
    use crate::services::fixtures::{extra_point, field_goal, game, pass, run, sack};
    use crate::utils::DistanceBand;

    fn fold(events: &[PlayEvent]) -> TeamAccumulator {
        let game = game();
        let mut acc = TeamAccumulator::new(game.teams());
        for event in events {
            let play = classify(event, &game, &EngineConfig::default()).unwrap();
            acc.apply(&play);
        }
        acc
    }

    #[test]
    fn test_offense_and_defense_from_one_play() {
        let mut event = pass(1, "KC", "qb1", Some("wr1"), 10, true);
        event.qb_hit_player_ids = vec!["de1".to_string()];
        event.solo_tackle_player_ids = vec!["cb1".to_string()];
        let acc = fold(&[event]);

        let kc = acc.get("KC").unwrap();
        assert_eq!(kc.passing.yards, 10);
        assert_eq!(kc.receiving.targets, 1);
        assert_eq!(kc.defense.plays, 0);

        let buf = acc.get("BUF").unwrap();
        assert_eq!(buf.passing.attempts, 0);
        assert_eq!(buf.defense.plays, 1);
        assert_eq!(buf.defense.qb_hits, 1);
        assert_eq!(buf.defense.tackles_solo, 1);
        assert_eq!(buf.defense.sacks, Decimal::ZERO);
    }

    #[test]
    fn test_shared_sack_is_one_team_sack() {
        let acc = fold(&[sack(1, "KC", "qb1", -7, &["de1", "lb1", "dt1"])]);
        let buf = acc.get("BUF").unwrap();
        assert_eq!(buf.defense.sacks, Decimal::ONE);
        assert_eq!(buf.defense.sack_yards, 7);
        assert_eq!(acc.get("KC").unwrap().passing.sacks, 1);
    }

    #[test]
    fn test_field_goal_boundary_buckets() {
        let acc = fold(&[
            field_goal(1, "KC", "k1", 50, KickResult::Made),
            field_goal(2, "KC", "k1", 49, KickResult::Missed),
            field_goal(3, "KC", "k1", 60, KickResult::Blocked),
            extra_point(4, "KC", "k1", KickResult::Made),
        ]);
        let fg = &acc.get("KC").unwrap().field_goals;
        assert_eq!(fg.made_bands[DistanceBand::Fifties.index()], 1);
        assert_eq!(fg.made_bands[DistanceBand::Forties.index()], 0);
        assert_eq!(fg.missed_bands[DistanceBand::Forties.index()], 1);
        assert_eq!(fg.blocked_bands[DistanceBand::SixtyPlus.index()], 1);

        let pats = &acc.get("KC").unwrap().pats;
        assert_eq!(pats.made, 1);
        assert_eq!(pats.made_bands[DistanceBand::Under20.index()], 0);
        assert_eq!(pats.made_bands[DistanceBand::Twenties.index()], 0);
        assert_eq!(pats.made_bands[DistanceBand::Thirties.index()], 1);
    }

    #[test]
    fn test_penalties_drives_and_neutral_plays() {
        let mut late = run(3, "KC", "rb1", 5);
        late.qtr = Some(4);
        late.drive = Some(2);
        let penalty = PlayEvent {
            game_id: game().game_id,
            play_id: 4,
            posteam: Some("KC".to_string()),
            play_type: Some(PlayType::NoPlay),
            penalty: true,
            penalty_team: Some("KC".to_string()),
            penalty_yards: 10,
            ..PlayEvent::default()
        };
        let acc = fold(&[
            pass(1, "KC", "qb1", Some("wr1"), 6, true),
            run(2, "KC", "rb1", 3),
            late,
            penalty,
        ]);

        let kc = acc.get("KC").unwrap();
        assert_eq!(kc.penalties, 1);
        assert_eq!(kc.penalty_yards, 10);
        assert_eq!(kc.drives.len(), 2);
        assert_eq!(kc.neutral_dropbacks, 1);
        assert_eq!(kc.neutral_rushes, 1);
        assert_eq!(kc.total_plays(), 3);
        assert!(acc.get("BUF").unwrap().drives.is_empty());
    }

    #[test]
    fn test_takeaway_fumble_and_recovery_yards() {
        let mut pick = pass(1, "KC", "qb1", Some("wr1"), 0, false);
        pick.interception = true;
        pick.interception_player_id = Some("cb1".to_string());
        pick.fumble = true;
        pick.fumbled_player_id = Some("cb1".to_string());
        pick.fumble_recovery_team = Some("KC".to_string());
        pick.fumble_recovery_yards = 4;
        pick.assist_tackle_player_ids = vec!["wr1".to_string(), "te1".to_string()];

        let mut strip = run(2, "BUF", "rb2", 1);
        strip.fumble = true;
        strip.fumble_lost = true;
        strip.fumbled_player_id = Some("rb2".to_string());
        strip.fumble_recovery_team = Some("KC".to_string());
        strip.fumble_recovery_yards = 9;

        let acc = fold(&[pick, strip]);
        let buf = acc.get("BUF").unwrap();
        assert_eq!(buf.defense.fumbles, 1);
        assert_eq!(buf.defense.interceptions, 1);
        assert_eq!(buf.defense.tackle_assists, 0);

        let kc = acc.get("KC").unwrap();
        assert_eq!(kc.defense.tackle_assists, 2);
        assert_eq!(kc.defense.tackles_with_assist, 1);
        assert_eq!(kc.defense.fumbles, 0);
        assert_eq!(kc.fumble_recoveries.yards(), 13);
    }
}
