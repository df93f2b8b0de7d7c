use rust_decimal::Decimal;

use crate::config::{EngineConfig, SackCreditPolicy};
use crate::error::EngineWarning;
use crate::models::{GameInfo, KickResult, PlayEvent, PlayType};
use crate::utils::to_decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayCategory {
    Pass,
    Rush,
    SpecialTeams,
    TwoPoint,
    PenaltyOnly,
    Timeout,
    NonStatistical,
}

/// One credited line item produced by a play. `player_id` is `None` for team-only items.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub team_id: String,
    pub player_id: Option<String>,
    pub stat: Stat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stat {
    Pass(PassStat),
    Sacked(SackStat),
    Target(TargetStat),
    Rush(RushStat),
    TwoPoint { role: TwoPointRole, success: bool },
    Defender(DefenderCredit),
    DefenseFaced(DefenseFaced),
    Snap(SnapStat),
    Return { kind: ReturnKind, yards: i32, touchdown: bool },
    FieldGoal { distance: Option<i32>, result: KickResult, game_winning: bool },
    ExtraPoint { distance: Option<i32>, result: KickResult },
    FumbleRecovery { own: bool, yards: i32, touchdown: bool },
    /// Tackles made on a play where the tackling team never faced a snap, such as
    /// bringing down an interception returner.
    ReturnTackles { solo: i32, assists: i32 },
    Penalty { yards: i32 },
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassStat {
    pub complete: bool,
    pub yards: i32,
    pub air_yards: i32,
    pub yac: i32,
    pub touchdown: bool,
    pub interception: bool,
    pub first_down: bool,
    pub epa: Option<Decimal>,
    pub cpoe: Option<Decimal>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SackStat {
    pub yards_lost: i32,
    pub fumble: bool,
    pub fumble_lost: bool,
    pub epa: Option<Decimal>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetStat {
    pub complete: bool,
    pub yards: i32,
    pub air_yards: i32,
    pub yac: i32,
    pub touchdown: bool,
    pub first_down: bool,
    pub fumble: bool,
    pub fumble_lost: bool,
    pub epa: Option<Decimal>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RushStat {
    pub yards: i32,
    pub touchdown: bool,
    pub first_down: bool,
    pub fumble: bool,
    pub fumble_lost: bool,
    pub epa: Option<Decimal>,
    pub success: bool,
    pub scramble: bool,
    /// Scrambles count as dropbacks only when the policy says so.
    pub dropback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoPointRole {
    Passer,
    Rusher,
    Receiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Punt,
    Kickoff,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefenderCredit {
    SoloTackle,
    AssistTackle,
    TackleForLoss,
    Sack { credit: Decimal, yards: Decimal },
    QbHit,
    Interception { return_yards: i32 },
    PassDefended,
    ForcedFumble,
    Touchdown,
}

/// The defense's view of one opponent scrimmage play, credited once to the team.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefenseFaced {
    pub epa: Option<Decimal>,
    pub sack: bool,
    pub sack_yards: i32,
    pub qb_hits: i32,
    pub interception: bool,
    pub interception_yards: i32,
    pub passes_defended: i32,
    pub solo_tackles: i32,
    pub assist_tackles: i32,
    pub tackle_for_loss: bool,
    pub tackle_for_loss_yards: i32,
    pub forced_fumbles: i32,
    /// Fumbles by the defense after taking the ball away.
    pub fumbles: i32,
    pub touchdown: bool,
    pub safety: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeutralPlay {
    Dropback,
    DesignedRush,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapStat {
    pub drive: Option<u32>,
    pub neutral: Option<NeutralPlay>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPlay {
    pub play_id: u32,
    pub category: PlayCategory,
    pub contributions: Vec<Contribution>,
}

impl ClassifiedPlay {
    pub fn for_player<'a>(&'a self, player_id: &'a str) -> impl Iterator<Item = &'a Contribution> {
        self.contributions
            .iter()
            .filter(move |c| c.player_id.as_deref() == Some(player_id))
    }

    pub fn for_team<'a>(&'a self, team_id: &'a str) -> impl Iterator<Item = &'a Contribution> {
        self.contributions.iter().filter(move |c| c.team_id == team_id)
    }
}

/// Split one sack between its credited defenders according to `policy`.
pub fn sack_credits(defenders: usize, policy: SackCreditPolicy) -> Vec<Decimal> {
    match (policy, defenders) {
        (_, 0) => Vec::new(),
        (_, 1) => vec![Decimal::ONE],
        (SackCreditPolicy::Half, n) => vec![Decimal::new(5, 1); n],
        (SackCreditPolicy::Split, n) => {
            let count = Decimal::from(n as u64);
            let share = Decimal::ONE / count;
            let mut credits = vec![share; n];
            // Decimal division rounds; the remainder goes to the first-listed defender.
            credits[0] += Decimal::ONE - share * count;
            credits
        }
    }
}

/// Sack yardage per defender, rounded to four places. The first-listed defender absorbs
/// the rounding so the shares add back to `credits` times the yards lost.
pub fn sack_yard_credits(credits: &[Decimal], yards_lost: i32) -> Vec<Decimal> {
    let yards = Decimal::from(yards_lost);
    let mut shares: Vec<Decimal> = credits.iter().map(|c| (*c * yards).round_dp(4)).collect();
    if let Some(first) = shares.first().copied() {
        let total: Decimal = credits.iter().copied().sum::<Decimal>() * yards;
        let rounded: Decimal = shares.iter().copied().sum();
        shares[0] = first + (total - rounded);
    }
    shares
}

/// Tag a play event with its category and every (role, player, team) line it feeds.
pub fn classify(
    event: &PlayEvent,
    game: &GameInfo,
    config: &EngineConfig,
) -> Result<ClassifiedPlay, EngineWarning> {
    let reject = |reason: String| EngineWarning::MalformedPlayEvent {
        game_id: game.game_id.clone(),
        play_id: event.play_id,
        reason,
    };

    if event.game_id != game.game_id {
        return Err(reject(format!("event belongs to game '{}'", event.game_id)));
    }
    let play_type = match event.play_type {
        None => return Err(reject("missing play type".to_string())),
        Some(PlayType::Unsupported) => return Err(reject("unsupported play type".to_string())),
        Some(play_type) => play_type,
    };
    let posteam = event
        .posteam
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| reject("missing possessing team".to_string()))?;
    let defteam = match (event.defteam.as_deref(), game.opponent_of(posteam)) {
        (_, None) => {
            return Err(reject(format!("team '{}' is not playing in this game", posteam)));
        }
        (Some(given), Some(opponent)) if given != opponent => {
            return Err(reject(format!(
                "defteam '{}' does not oppose '{}'",
                given, posteam
            )));
        }
        (_, Some(opponent)) => opponent,
    };
    let tacklers = match event.tackle_team.as_deref() {
        Some(team) if team == posteam || team == defteam => team,
        Some(team) => {
            return Err(reject(format!("tackling team '{}' is not playing", team)));
        }
        // After a takeaway the listed tackles were made on the returner.
        None if event.interception || event.fumble_lost => posteam,
        None => defteam,
    };

    let mut out = Vec::new();

    if event.penalty {
        match event.penalty_team.as_deref() {
            Some(team) if game.involves(team) => out.push(Contribution {
                team_id: team.to_string(),
                player_id: None,
                stat: Stat::Penalty {
                    yards: event.penalty_yards,
                },
            }),
            Some(team) => {
                return Err(reject(format!("penalized team '{}' is not playing", team)));
            }
            None if play_type == PlayType::NoPlay => {
                return Err(reject("penalty without a penalized team".to_string()));
            }
            None => {}
        }
    }
    if let Some(team) = event.timeout_team.as_deref() {
        if game.involves(team) {
            out.push(Contribution {
                team_id: team.to_string(),
                player_id: None,
                stat: Stat::Timeout,
            });
        }
    }

    let scorer = touchdown_team(event, play_type, posteam, defteam);
    let offense_td = scorer == Some(posteam);
    let defense_td = scorer == Some(defteam);
    let epa = to_decimal(event.epa);
    let success = event.is_success();

    let category = match play_type {
        PlayType::Pass | PlayType::Run | PlayType::QbKneel | PlayType::QbSpike
            if event.two_point_attempt =>
        {
            classify_two_point(event, play_type, posteam, &mut out).map_err(reject)?;
            PlayCategory::TwoPoint
        }
        PlayType::Pass | PlayType::QbSpike => {
            let passer = event
                .passer_id
                .clone()
                .ok_or_else(|| reject("pass play without a passer".to_string()))?;
            let mut faced = DefenseFaced {
                epa,
                ..DefenseFaced::default()
            };

            if event.sack {
                let yards_lost = (-event.yards_gained).max(0);
                let fumble = event.fumble && event.fumbled_player_id.as_ref() == Some(&passer);
                out.push(Contribution {
                    team_id: posteam.to_string(),
                    player_id: Some(passer),
                    stat: Stat::Sacked(SackStat {
                        yards_lost,
                        fumble,
                        fumble_lost: fumble && event.fumble_lost,
                        epa,
                        success,
                    }),
                });
                let credits = sack_credits(event.sack_player_ids.len(), config.sack_credit);
                let yards = sack_yard_credits(&credits, yards_lost);
                for ((defender, credit), yards) in
                    event.sack_player_ids.iter().zip(credits).zip(yards)
                {
                    push_defender(
                        &mut out,
                        defteam,
                        defender,
                        DefenderCredit::Sack { credit, yards },
                    );
                }
                faced.sack = true;
                faced.sack_yards = yards_lost;
            } else {
                let complete = event.complete_pass && !event.interception;
                let air_yards = event.air_yards.unwrap_or(0);
                let yards = if complete { event.yards_gained } else { 0 };
                let yac = if complete {
                    event.yards_after_catch.unwrap_or(0)
                } else {
                    0
                };
                let first_down = complete && event.first_down;
                let touchdown = complete && offense_td;

                out.push(Contribution {
                    team_id: posteam.to_string(),
                    player_id: Some(passer),
                    stat: Stat::Pass(PassStat {
                        complete,
                        yards,
                        air_yards,
                        yac,
                        touchdown,
                        interception: event.interception,
                        first_down,
                        epa,
                        cpoe: to_decimal(event.cpoe),
                        success,
                    }),
                });

                if let Some(receiver) = event.receiver_id.clone() {
                    let fumble = event.fumble && event.fumbled_player_id.as_ref() == Some(&receiver);
                    out.push(Contribution {
                        team_id: posteam.to_string(),
                        player_id: Some(receiver),
                        stat: Stat::Target(TargetStat {
                            complete,
                            yards,
                            air_yards,
                            yac,
                            touchdown,
                            first_down,
                            fumble,
                            fumble_lost: fumble && event.fumble_lost,
                            epa,
                            success,
                        }),
                    });
                }

                if event.interception {
                    faced.interception = true;
                    faced.interception_yards = event.return_yards;
                    faced.fumbles = event.fumble as i32;
                    if let Some(defender) = event.interception_player_id.as_deref() {
                        push_defender(
                            &mut out,
                            defteam,
                            defender,
                            DefenderCredit::Interception {
                                return_yards: event.return_yards,
                            },
                        );
                        if defense_td {
                            push_defender(&mut out, defteam, defender, DefenderCredit::Touchdown);
                        }
                    }
                }
                for defender in &event.pass_defense_player_ids {
                    push_defender(&mut out, defteam, defender, DefenderCredit::PassDefended);
                }
                faced.passes_defended = event.pass_defense_player_ids.len() as i32;
            }

            let scrimmage = Scrimmage {
                posteam,
                defteam,
                tacklers,
                neutral: Some(NeutralPlay::Dropback),
                scorer,
            };
            scrimmage.finish(event, faced, &mut out);
            PlayCategory::Pass
        }
        PlayType::Run | PlayType::QbKneel => {
            let rusher = event
                .rusher_id
                .clone()
                .ok_or_else(|| reject("run play without a rusher".to_string()))?;
            let fumble = event.fumble && event.fumbled_player_id.as_ref() == Some(&rusher);
            let dropback = event.scramble && config.scrambles_as_dropbacks;
            out.push(Contribution {
                team_id: posteam.to_string(),
                player_id: Some(rusher),
                stat: Stat::Rush(RushStat {
                    yards: event.yards_gained,
                    touchdown: offense_td,
                    first_down: event.first_down,
                    fumble,
                    fumble_lost: fumble && event.fumble_lost,
                    epa,
                    success,
                    scramble: event.scramble,
                    dropback,
                }),
            });
            let faced = DefenseFaced {
                epa,
                ..DefenseFaced::default()
            };
            // A scramble that is not a dropback is not a designed rush either.
            let neutral = match (dropback, event.scramble) {
                (true, _) => Some(NeutralPlay::Dropback),
                (false, true) => None,
                (false, false) => Some(NeutralPlay::DesignedRush),
            };
            let scrimmage = Scrimmage {
                posteam,
                defteam,
                tacklers,
                neutral,
                scorer,
            };
            scrimmage.finish(event, faced, &mut out);
            PlayCategory::Rush
        }
        PlayType::Punt | PlayType::Kickoff => {
            if let Some(returner) = event.returner_id.clone() {
                let kind = if play_type == PlayType::Punt {
                    ReturnKind::Punt
                } else {
                    ReturnKind::Kickoff
                };
                out.push(Contribution {
                    team_id: defteam.to_string(),
                    player_id: Some(returner),
                    stat: Stat::Return {
                        kind,
                        yards: event.return_yards,
                        touchdown: defense_td,
                    },
                });
            }
            PlayCategory::SpecialTeams
        }
        PlayType::FieldGoal | PlayType::ExtraPoint => {
            let result = event
                .kick_result
                .ok_or_else(|| reject("kick without a result".to_string()))?;
            let stat = if play_type == PlayType::FieldGoal {
                Stat::FieldGoal {
                    distance: event.kick_distance,
                    result,
                    game_winning: game_winning_attempt(event, game, posteam),
                }
            } else {
                Stat::ExtraPoint {
                    distance: event.kick_distance,
                    result,
                }
            };
            out.push(Contribution {
                team_id: posteam.to_string(),
                player_id: event.kicker_id.clone(),
                stat,
            });
            PlayCategory::SpecialTeams
        }
        PlayType::Unsupported => return Err(reject("unsupported play type".to_string())),
        PlayType::NoPlay => {
            if event.penalty {
                PlayCategory::PenaltyOnly
            } else if event.timeout_team.is_some() {
                PlayCategory::Timeout
            } else {
                PlayCategory::NonStatistical
            }
        }
    };

    Ok(ClassifiedPlay {
        play_id: event.play_id,
        category,
        contributions: out,
    })
}

/// Two-point tries feed only the 2pt counters, never yardage or touchdowns.
fn classify_two_point(
    event: &PlayEvent,
    play_type: PlayType,
    posteam: &str,
    out: &mut Vec<Contribution>,
) -> Result<(), String> {
    let success = event.two_point_success;
    let mut credit = |player: &str, role: TwoPointRole| {
        out.push(Contribution {
            team_id: posteam.to_string(),
            player_id: Some(player.to_string()),
            stat: Stat::TwoPoint { role, success },
        })
    };

    match play_type {
        PlayType::Pass | PlayType::QbSpike => {
            let passer = event
                .passer_id
                .as_deref()
                .ok_or_else(|| "two-point pass without a passer".to_string())?;
            credit(passer, TwoPointRole::Passer);
            if let Some(receiver) = event.receiver_id.as_deref() {
                credit(receiver, TwoPointRole::Receiver);
            }
        }
        _ => {
            let rusher = event
                .rusher_id
                .as_deref()
                .ok_or_else(|| "two-point run without a rusher".to_string())?;
            credit(rusher, TwoPointRole::Rusher);
        }
    }
    Ok(())
}

/// Who did what on a scrimmage play, beyond the ball carrier's own line.
struct Scrimmage<'a> {
    posteam: &'a str,
    defteam: &'a str,
    tacklers: &'a str,
    /// How the play counts toward the neutral-situation pass rate, if at all.
    neutral: Option<NeutralPlay>,
    scorer: Option<&'a str>,
}

impl Scrimmage<'_> {
    /// Credits shared by every scrimmage play: tackles, hits, fumbles, safeties, pace.
    fn finish(&self, event: &PlayEvent, mut faced: DefenseFaced, out: &mut Vec<Contribution>) {
        let (posteam, defteam) = (self.posteam, self.defteam);

        for tackler in &event.solo_tackle_player_ids {
            push_defender(out, self.tacklers, tackler, DefenderCredit::SoloTackle);
        }
        for tackler in &event.assist_tackle_player_ids {
            push_defender(out, self.tacklers, tackler, DefenderCredit::AssistTackle);
        }
        for defender in &event.tackle_for_loss_player_ids {
            push_defender(out, defteam, defender, DefenderCredit::TackleForLoss);
        }
        for defender in &event.qb_hit_player_ids {
            push_defender(out, defteam, defender, DefenderCredit::QbHit);
        }
        for defender in &event.forced_fumble_player_ids {
            push_defender(out, defteam, defender, DefenderCredit::ForcedFumble);
        }

        let solo = event.solo_tackle_player_ids.len() as i32;
        let assists = event.assist_tackle_player_ids.len() as i32;
        if self.tacklers == defteam {
            faced.solo_tackles = solo;
            faced.assist_tackles = assists;
        } else if solo + assists > 0 {
            out.push(Contribution {
                team_id: self.tacklers.to_string(),
                player_id: None,
                stat: Stat::ReturnTackles { solo, assists },
            });
        }
        faced.qb_hits = event.qb_hit_player_ids.len() as i32;
        faced.forced_fumbles = event.forced_fumble_player_ids.len() as i32;
        if !event.tackle_for_loss_player_ids.is_empty() {
            faced.tackle_for_loss = true;
            faced.tackle_for_loss_yards = (-event.yards_gained).max(0);
        }
        faced.touchdown = self.scorer == Some(defteam);
        faced.safety = event.safety;

        if event.fumble {
            if let Some(recovering) = event.fumble_recovery_team.as_deref() {
                if recovering == posteam || recovering == defteam {
                    out.push(Contribution {
                        team_id: recovering.to_string(),
                        player_id: None,
                        stat: Stat::FumbleRecovery {
                            own: recovering == posteam,
                            yards: event.fumble_recovery_yards,
                            touchdown: self.scorer == Some(recovering),
                        },
                    });
                }
            }
        }

        let in_window = match (event.qtr, event.score_differential) {
            (Some(qtr), Some(diff)) => qtr <= 3 && diff.abs() <= 7,
            _ => false,
        };
        out.push(Contribution {
            team_id: posteam.to_string(),
            player_id: None,
            stat: Stat::Snap(SnapStat {
                drive: event.drive,
                neutral: self.neutral.filter(|_| in_window),
            }),
        });
        out.push(Contribution {
            team_id: defteam.to_string(),
            player_id: None,
            stat: Stat::DefenseFaced(faced),
        });
    }
}

/// A kick that can decide the game: fourth quarter or later, the kicking team tied or
/// down by at most two, and a final margin within three when the score is known.
fn game_winning_attempt(event: &PlayEvent, game: &GameInfo, posteam: &str) -> bool {
    let late = event.qtr.is_some_and(|qtr| qtr >= 4);
    let go_ahead = event
        .score_differential
        .is_some_and(|diff| (-2..=0).contains(&diff));
    let close_finish = game
        .score_for(posteam)
        .map_or(true, |(points_for, points_against)| (points_for - points_against).abs() <= 3);
    late && go_ahead && close_finish
}

fn push_defender(out: &mut Vec<Contribution>, team: &str, player: &str, credit: DefenderCredit) {
    out.push(Contribution {
        team_id: team.to_string(),
        player_id: Some(player.to_string()),
        stat: Stat::Defender(credit),
    });
}

/// Which team scored the play's touchdown. Without an explicit `td_team`, returns and
/// turnovers score for the defense and everything else for the offense.
fn touchdown_team<'a>(
    event: &'a PlayEvent,
    play_type: PlayType,
    posteam: &'a str,
    defteam: &'a str,
) -> Option<&'a str> {
    if !event.touchdown {
        return None;
    }
    let kick = matches!(play_type, PlayType::Punt | PlayType::Kickoff);
    match event.td_team.as_deref() {
        Some(team) => Some(team),
        None if kick && event.returner_id.is_some() => Some(defteam),
        None if event.interception || event.fumble_lost => Some(defteam),
        None => Some(posteam),
    }
}
