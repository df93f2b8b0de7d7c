use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{info, info_span, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineWarning};
use crate::models::{GameInput, GameReport, GameStatus, SnapCount};
use crate::services::assembler::{player_row, team_row, RowAssembler, TeamContext};
use crate::services::classifier::classify;
use crate::services::player_accumulator::PlayerAccumulator;
use crate::services::team_accumulator::TeamAccumulator;

/// Aggregate one game into player and team rows.
///
/// This is a pure fold over the game's plays: no I/O, and the same input with the same
/// `now` always yields the same report.
pub fn aggregate_game(input: &GameInput, config: &EngineConfig, now: DateTime<Utc>) -> GameReport {
    let game = &input.game;
    let span = info_span!("game", game_id = %game.game_id);
    let _guard = span.enter();

    let Some(plays) = input.plays.as_ref() else {
        let error = EngineError::MissingPlayStream(game.game_id.clone());
        return failed(game.game_id.clone(), error, Vec::new());
    };

    let mut warnings = Vec::new();
    let mut players = PlayerAccumulator::new();
    let mut teams = TeamAccumulator::new(game.teams());
    let mut accepted = 0usize;

    for event in plays {
        match classify(event, game, config) {
            Ok(play) => {
                players.apply(&play);
                teams.apply(&play);
                accepted += 1;
            }
            Err(warning) => {
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    if accepted == 0 {
        let error = EngineError::NoValidPlays {
            game_id: game.game_id.clone(),
            rejected: plays.len(),
        };
        return failed(game.game_id.clone(), error, warnings);
    }

    let snaps: HashMap<&str, &SnapCount> = input
        .snaps
        .iter()
        .map(|s| (s.player_id.as_str(), s))
        .collect();

    let mut player_rows = Vec::with_capacity(players.len());
    for line in players.into_lines() {
        let Some(team_id) = line.row_team().map(str::to_string) else {
            continue;
        };
        if line.teams.len() > 1 {
            let conflict = EngineWarning::PlayerTeamConflict {
                player_id: line.player_id.clone(),
                teams: line.teams.iter().cloned().collect(),
                kept: team_id.clone(),
            };
            warn!("{}", conflict);
            warnings.push(conflict);
        }
        let Some(context) = TeamContext::resolve(game, &team_id) else {
            continue;
        };
        player_rows.push(player_row(
            game,
            &context,
            &line,
            teams.get(&team_id),
            snaps.get(line.player_id.as_str()).copied(),
            &config.scoring,
            &mut warnings,
            now,
        ));
    }

    let team_rows: Vec<_> = teams
        .lines()
        .filter_map(|line| {
            let context = TeamContext::resolve(game, &line.team_id)?;
            Some(team_row(game, &context, line, now))
        })
        .collect();

    info!(
        plays = plays.len(),
        skipped = warnings
            .iter()
            .filter(|w| matches!(w, EngineWarning::MalformedPlayEvent { .. }))
            .count(),
        players = player_rows.len(),
        teams = team_rows.len(),
        "Aggregated game"
    );

    GameReport {
        game_id: game.game_id.clone(),
        status: GameStatus::Succeeded,
        warnings,
        player_rows,
        team_rows,
    }
}

fn failed(game_id: String, error: EngineError, warnings: Vec<EngineWarning>) -> GameReport {
    warn!(%game_id, "{}", error);
    GameReport {
        game_id,
        status: GameStatus::Failed {
            reason: error.to_string(),
        },
        warnings,
        player_rows: Vec::new(),
        team_rows: Vec::new(),
    }
}

/// Runs games through the aggregation fold and keeps the latest rows per key.
pub struct StatsEngine {
    config: EngineConfig,
    assembler: RowAssembler,
}

impl StatsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            assembler: RowAssembler::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn assembler(&self) -> &RowAssembler {
        &self.assembler
    }

    pub fn process_game(&mut self, input: &GameInput) -> GameReport {
        self.process_game_at(input, Utc::now())
    }

    pub fn process_game_at(&mut self, input: &GameInput, now: DateTime<Utc>) -> GameReport {
        let report = aggregate_game(input, &self.config, now);
        self.assembler.admit(report)
    }

    /// Aggregate games in parallel; rows are admitted in input order afterwards.
    pub fn process_games(&mut self, inputs: &[GameInput]) -> Vec<GameReport> {
        let now = Utc::now();
        let config = &self.config;
        let reports: Vec<GameReport> = inputs
            .par_iter()
            .map(|input| aggregate_game(input, config, now))
            .collect();

        let succeeded = reports.iter().filter(|r| r.succeeded()).count();
        info!(
            games = inputs.len(),
            succeeded,
            failed = inputs.len() - succeeded,
            "Processed game batch"
        );

        reports
            .into_iter()
            .map(|report| self.assembler.admit(report))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SackCreditPolicy;
    use crate::models::{KickResult, PlayEvent, PlayerGameStat, TeamGameStat};
    use crate::services::fixtures::{field_goal, input, pass, run, sample_plays};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 9, 3, 0, 0).unwrap()
    }

    fn aggregate(plays: Vec<PlayEvent>) -> GameReport {
        aggregate_game(&input(plays), &EngineConfig::default(), at())
    }

    fn player<'a>(report: &'a GameReport, id: &str) -> &'a PlayerGameStat {
        report
            .player_rows
            .iter()
            .find(|r| r.player_id == id)
            .unwrap()
    }

    fn team<'a>(report: &'a GameReport, id: &str) -> &'a TeamGameStat {
        report.team_rows.iter().find(|r| r.team_id == id).unwrap()
    }

    #[test]
    fn test_sample_game_rows() {
        let report = aggregate(sample_plays());
        assert!(report.succeeded());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.team_rows.len(), 2);

        let qb = player(&report, "qb_kc");
        assert_eq!(qb.team_id, "KC");
        assert_eq!(qb.opponent_team_id, "BUF");
        assert_eq!(qb.pass_att, 2);
        assert_eq!(qb.pass_cmp, 2);
        assert_eq!(qb.pass_yards, 54);
        assert_eq!(qb.pass_td, 1);
        assert_eq!(qb.rush_att, 1);
        assert_eq!(qb.dropbacks, 3);
        assert_eq!(qb.snaps_offense, Some(64));

        let kc = team(&report, "KC");
        assert_eq!(kc.point_diff, Some(7));
        assert_eq!(kc.def_sacks, 1.0);
        assert_eq!(kc.def_interceptions, 1);
        assert_eq!(kc.def_interception_yards, 12);
        assert_eq!(kc.fumble_recovery_opp, 1);
        assert_eq!(kc.def_fumbles_forced, 1);
        assert_eq!(kc.punt_returns, 1);
        assert_eq!(kc.pat_made, 1);
        assert_eq!(kc.total_plays, 5);
        assert_eq!(kc.total_drives, 3);

        let buf = team(&report, "BUF");
        assert_eq!(buf.fg_made_50_59, 1);
        assert_eq!(buf.fg_made_40_49, 0);
        assert_eq!(buf.fg_made_list.as_deref(), Some("50"));
        assert_eq!(buf.sacks_suffered, 1);
        assert_eq!(buf.sack_yards_lost, 7);
        assert_eq!(buf.rushing_fumbles_lost, 1);
        assert_eq!(buf.def_tackles_for_loss, 1);
        assert_eq!(buf.def_tackles_for_loss_yards, 2);

        let de = player(&report, "de_kc");
        let lb = player(&report, "lb_kc");
        assert_eq!(de.def_sacks, 0.5);
        assert_eq!(lb.def_sacks, 0.5);
        assert_eq!(de.def_sacks + lb.def_sacks, kc.def_sacks);
    }

    #[test]
    fn test_player_totals_reconcile_with_team_rows() {
        let report = aggregate(sample_plays());
        for team_row in &report.team_rows {
            let rows: Vec<_> = report
                .player_rows
                .iter()
                .filter(|p| p.team_id == team_row.team_id)
                .collect();
            let targets: i32 = rows.iter().map(|p| p.targets).sum();
            let pass_att: i32 = rows.iter().map(|p| p.pass_att).sum();
            let rush_att: i32 = rows.iter().map(|p| p.rush_att).sum();
            assert_eq!(targets, team_row.targets);
            assert_eq!(pass_att, team_row.attempts);
            assert_eq!(rush_att, team_row.carries);
            for p in rows {
                assert_eq!(p.team_targets, Some(team_row.targets));
                assert_eq!(p.team_pass_att, Some(team_row.attempts));
                assert_eq!(p.team_rush_att, Some(team_row.carries));
            }
        }
    }

    #[test]
    fn test_null_ratios_for_non_passers() {
        let report = aggregate(sample_plays());
        let wr = player(&report, "wr_kc");
        assert_eq!(wr.pass_att, 0);
        assert_eq!(wr.passer_rating, None);
        assert_eq!(wr.pass_yards_per_att, None);
        assert_eq!(wr.pass_any_a, None);
        assert_eq!(wr.rush_yards_per_carry, None);
        assert_eq!(wr.target_share, Some(1.0));
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(aggregate(sample_plays()), aggregate(sample_plays()));
    }

    #[test]
    fn test_reversed_order_is_identical() {
        let mut reversed = sample_plays();
        reversed.reverse();
        assert_eq!(aggregate(sample_plays()), aggregate(reversed));
    }

    #[test]
    fn test_malformed_event_is_skipped() {
        let mut plays = sample_plays();
        let mut bad = run(99, "KC", "rb_kc", 30);
        bad.posteam = None;
        plays.push(bad);

        let report = aggregate(plays);
        assert!(report.succeeded());
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            report.warnings[0],
            EngineWarning::MalformedPlayEvent { play_id: 99, .. }
        ));
        assert_eq!(player(&report, "rb_kc").rush_yards, 3);
    }

    #[test]
    fn test_missing_stream_fails_without_rows() {
        let mut missing = input(Vec::new());
        missing.plays = None;
        let report = aggregate_game(&missing, &EngineConfig::default(), at());
        assert!(!report.succeeded());
        assert!(report.player_rows.is_empty());
        assert!(report.team_rows.is_empty());

        let empty = aggregate(Vec::new());
        assert!(!empty.succeeded());

        let mut only_bad = run(1, "KC", "rb_kc", 3);
        only_bad.play_type = None;
        let report = aggregate(vec![only_bad]);
        assert!(matches!(report.status, GameStatus::Failed { .. }));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_player_team_conflict_tie_keeps_smallest_team() {
        let plays = vec![
            run(1, "KC", "rb_x", 4),
            run(2, "BUF", "rb_x", 6),
        ];
        let report = aggregate(plays);
        let row = player(&report, "rb_x");
        assert_eq!(row.team_id, "BUF");
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, EngineWarning::PlayerTeamConflict { .. })));
    }

    #[test]
    fn test_half_policy_still_one_team_sack() {
        let config = EngineConfig {
            sack_credit: SackCreditPolicy::Half,
            ..EngineConfig::default()
        };
        let report = aggregate_game(&input(sample_plays()), &config, at());
        assert_eq!(team(&report, "KC").def_sacks, 1.0);
        assert_eq!(player(&report, "de_kc").def_sacks, 0.5);
    }

    #[test]
    fn test_batch_processing_and_recompute() {
        let mut engine = StatsEngine::new(EngineConfig::default());
        let mut other = input(vec![pass(1, "NYJ", "qb_nyj", Some("wr_nyj"), 9, true)]);
        other.game.game_id = "2024_01_NYJ_SF".to_string();
        other.game.home_team = "SF".to_string();
        other.game.away_team = "NYJ".to_string();
        other.plays = other.plays.map(|plays| {
            plays
                .into_iter()
                .map(|mut p| {
                    p.game_id = "2024_01_NYJ_SF".to_string();
                    p
                })
                .collect()
        });
        let mut absent = input(Vec::new());
        absent.game.game_id = "2024_01_DAL_NYG".to_string();
        absent.plays = None;

        let reports = engine.process_games(&[input(sample_plays()), other, absent]);
        assert_eq!(reports.len(), 3);
        assert!(reports[0].succeeded());
        assert!(reports[1].succeeded());
        assert!(!reports[2].succeeded());
        assert!(engine.assembler().player_row("qb_nyj", "2024_01_NYJ_SF").is_some());

        let again = engine.process_game(&input(sample_plays()));
        assert!(again
            .warnings
            .iter()
            .all(|w| matches!(w, EngineWarning::DuplicateGameRow { .. })));
        assert_eq!(
            again.warnings.len(),
            again.player_rows.len() + again.team_rows.len()
        );
        assert_eq!(engine.assembler().team_rows().count(), 4);
    }

    #[test]
    fn test_tackle_after_interception_stays_with_the_passer_team() {
        let mut pick = pass(2, "KC", "qb_kc", Some("wr_kc"), 0, false);
        pick.interception = true;
        pick.interception_player_id = Some("cb_buf".to_string());
        pick.return_yards = 20;
        pick.solo_tackle_player_ids = vec!["qb_kc".to_string()];
        let plays = vec![pass(1, "KC", "qb_kc", Some("wr_kc"), 12, true), pick];

        let report = aggregate(plays);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let qb = player(&report, "qb_kc");
        assert_eq!(qb.team_id, "KC");
        assert_eq!(qb.pass_att, 2);
        assert_eq!(qb.interceptions, 1);
        assert_eq!(qb.def_tackles_solo, 1);
        assert_eq!(qb.team_pass_att, Some(2));

        let kc = team(&report, "KC");
        let buf = team(&report, "BUF");
        assert_eq!(kc.attempts, 2);
        assert_eq!(kc.def_tackles_solo, 1);
        assert_eq!(buf.def_tackles_solo, 0);
        assert_eq!(buf.def_interceptions, 1);
        assert_eq!(player(&report, "cb_buf").team_id, "BUF");
    }

    #[test]
    fn test_unknown_play_type_skips_only_that_event() {
        let raw = r#"{
            "game": {
                "game_id": "2024_01_BUF_KC", "season": 2024, "week": 1, "season_type": "REG",
                "home_team": "KC", "away_team": "BUF", "home_score": 27, "away_score": 20
            },
            "plays": [
                {"game_id": "2024_01_BUF_KC", "play_id": 1, "posteam": "KC", "play_type": "run",
                 "rusher_id": "rb_kc", "yards_gained": 6, "epa": 0.4},
                {"game_id": "2024_01_BUF_KC", "play_id": 2, "posteam": "KC", "play_type": "timeout"},
                {"game_id": "2024_01_BUF_KC", "play_id": 3, "posteam": "KC",
                 "play_type": "field_goal", "kicker_id": "k_kc", "kick_result": "doinked"}
            ]
        }"#;
        let game: GameInput = serde_json::from_str(raw).unwrap();

        let report = aggregate_game(&game, &EngineConfig::default(), at());
        assert!(report.succeeded());
        let skipped: Vec<u32> = report
            .warnings
            .iter()
            .filter_map(|w| match w {
                EngineWarning::MalformedPlayEvent { play_id, .. } => Some(*play_id),
                _ => None,
            })
            .collect();
        assert_eq!(skipped, vec![2, 3]);
        assert_eq!(player(&report, "rb_kc").rush_yards, 6);
    }

    #[test]
    fn test_punt_return_touchdown_without_td_team() {
        let mut punt = run(1, "BUF", "p_buf", 0);
        punt.play_type = Some(crate::models::PlayType::Punt);
        punt.rusher_id = None;
        punt.returner_id = Some("pr_kc".to_string());
        punt.return_yards = 70;
        punt.touchdown = true;

        let report = aggregate(vec![punt]);
        let pr = player(&report, "pr_kc");
        assert_eq!(pr.team_id, "KC");
        assert_eq!(pr.special_teams_tds, 1);
        assert_eq!(pr.fantasy_points, 6.0);
        assert_eq!(team(&report, "KC").special_teams_tds, 1);
        assert_eq!(team(&report, "BUF").special_teams_tds, 0);
    }

    #[test]
    fn test_scramble_outside_dropbacks_is_not_a_designed_rush() {
        let config = EngineConfig {
            scrambles_as_dropbacks: false,
            ..EngineConfig::default()
        };
        let mut scramble = run(2, "KC", "qb_kc", 8);
        scramble.scramble = true;
        let plays = vec![pass(1, "KC", "qb_kc", Some("wr_kc"), 10, true), scramble];

        let off = aggregate_game(&input(plays.clone()), &config, at());
        assert_eq!(team(&off, "KC").neutral_pass_rate, Some(1.0));
        assert_eq!(team(&off, "KC").dropbacks, 1);

        let on = aggregate(plays);
        assert_eq!(team(&on, "KC").neutral_pass_rate, Some(1.0));
        assert_eq!(team(&on, "KC").dropbacks, 2);

        let designed = aggregate(vec![
            pass(1, "KC", "qb_kc", Some("wr_kc"), 10, true),
            run(2, "KC", "rb_kc", 3),
        ]);
        assert_eq!(team(&designed, "KC").neutral_pass_rate, Some(0.5));
    }

    #[test]
    fn test_game_winning_field_goals() {
        let mut game_input = input(Vec::new());
        game_input.game.home_score = Some(23);
        game_input.game.away_score = Some(20);

        let mut winner = field_goal(1, "KC", "k_kc", 44, KickResult::Made);
        winner.qtr = Some(4);
        winner.score_differential = Some(0);
        let mut early = field_goal(2, "KC", "k_kc", 30, KickResult::Made);
        early.qtr = Some(2);
        let mut blocked = field_goal(3, "BUF", "k_buf", 52, KickResult::Blocked);
        blocked.qtr = Some(5);
        blocked.score_differential = Some(-2);
        game_input.plays = Some(vec![winner, early, blocked]);

        let report = aggregate_game(&game_input, &EngineConfig::default(), at());
        let kc = team(&report, "KC");
        assert_eq!(kc.fg_att, 2);
        assert_eq!(kc.gwfg_att, 1);
        assert_eq!(kc.gwfg_made, 1);
        assert_eq!(kc.gwfg_distance, Some(44));

        let buf = team(&report, "BUF");
        assert_eq!(buf.gwfg_att, 1);
        assert_eq!(buf.gwfg_blocked, 1);
        assert_eq!(buf.gwfg_made, 0);
    }

    proptest! {
        #[test]
        fn prop_play_order_does_not_change_rows(seed in any::<u64>()) {
            let mut plays = sample_plays();
            // Fisher-Yates driven by a simple LCG so proptest controls the permutation.
            let mut state = seed;
            for i in (1..plays.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                plays.swap(i, j);
            }
            prop_assert_eq!(aggregate(sample_plays()), aggregate(plays));
        }
    }
}
