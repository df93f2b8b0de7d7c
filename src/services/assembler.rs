use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::FantasyScoring;
use crate::error::EngineWarning;
use crate::models::{
    GameInfo, GameReport, GameResult, HomeAway, PlayerGameStat, SnapCount, TeamGameStat,
};
use crate::services::counters::KickLine;
use crate::services::metrics::{
    epa_per_play, epa_total, fantasy_points, kick_pct, neutral_pass_rate, passing_metrics,
    receiving_metrics, rushing_metrics, usage_shares,
};
use crate::services::player_accumulator::PlayerLine;
use crate::services::team_accumulator::TeamLine;
use crate::utils::{decimal_to_f64, distance_list, DistanceBand};

pub const PLAYER_TABLE: &str = "player_game_stats";
pub const TEAM_TABLE: &str = "team_game_stats";

/// Stable row id derived from the uniqueness key, so recomputation keeps the same id.
pub fn row_id(table: &str, entity_id: &str, game_id: &str) -> String {
    let key = format!("{}:{}:{}", table, entity_id, game_id);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

/// Which side of the game a team is on.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamContext {
    pub team_id: String,
    pub opponent_team_id: String,
    pub home_away: HomeAway,
}

impl TeamContext {
    pub fn resolve(game: &GameInfo, team_id: &str) -> Option<Self> {
        Some(Self {
            team_id: team_id.to_string(),
            opponent_team_id: game.opponent_of(team_id)?.to_string(),
            home_away: game.home_away(team_id)?,
        })
    }
}

#[allow(clippy::too_many_arguments)]
pub fn player_row(
    game: &GameInfo,
    context: &TeamContext,
    line: &PlayerLine,
    team: Option<&TeamLine>,
    snaps: Option<&SnapCount>,
    scoring: &FantasyScoring,
    warnings: &mut Vec<EngineWarning>,
    now: DateTime<Utc>,
) -> PlayerGameStat {
    let passing = passing_metrics(&line.passing);
    let rushing = rushing_metrics(&line.rushing);
    let receiving = receiving_metrics(&line.receiving);
    let shares = usage_shares(line, team, warnings);
    let (fantasy_points, fantasy_points_ppr) = fantasy_points(line, scoring);

    let p = &line.passing;
    let r = &line.rushing;
    let rec = &line.receiving;
    let d = &line.defense;

    PlayerGameStat {
        id: row_id(PLAYER_TABLE, &line.player_id, &game.game_id),
        player_id: line.player_id.clone(),
        game_id: game.game_id.clone(),
        season: game.season,
        week: game.week,
        season_type: game.season_type,
        team_id: context.team_id.clone(),
        opponent_team_id: context.opponent_team_id.clone(),
        home_away: context.home_away,

        snaps_offense: snaps.and_then(|s| s.offense_snaps),
        snaps_offense_pct: snaps.and_then(|s| s.offense_pct),
        snaps_defense: snaps.and_then(|s| s.defense_snaps),
        snaps_defense_pct: snaps.and_then(|s| s.defense_pct),
        snaps_st: snaps.and_then(|s| s.st_snaps),
        snaps_st_pct: snaps.and_then(|s| s.st_pct),

        pass_att: p.attempts,
        pass_cmp: p.completions,
        pass_yards: p.yards,
        pass_td: p.touchdowns,
        interceptions: p.interceptions,
        sacks: p.sacks,
        sack_yards: p.sack_yards,
        sack_fumbles: p.sack_fumbles,
        sack_fumbles_lost: p.sack_fumbles_lost,
        pass_first_downs: p.first_downs,
        pass_air_yards: p.air_yards,
        pass_yac_yards: p.yac,
        pass_2pt: p.two_point_conversions,
        dropbacks: p.dropbacks(),
        pass_yards_per_att: passing.yards_per_att,
        pass_any_a: passing.any_a,
        passer_rating: passing.passer_rating,
        cpoe: passing.cpoe,
        pass_epa_total: passing.epa_total,
        pass_epa_per_play: passing.epa_per_play,
        pass_success_rate: passing.success_rate,

        rush_att: r.attempts,
        rush_yards: r.yards,
        rush_td: r.touchdowns,
        rush_long: r.long,
        rush_first_downs: r.first_downs,
        rush_fumbles: r.fumbles,
        rush_fumbles_lost: r.fumbles_lost,
        rush_2pt: r.two_point_conversions,
        rush_yards_per_carry: rushing.yards_per_carry,
        rush_epa_total: rushing.epa_total,
        rush_epa_per_carry: rushing.epa_per_carry,
        rush_success_rate: rushing.success_rate,

        targets: rec.targets,
        receptions: rec.receptions,
        rec_yards: rec.yards,
        rec_td: rec.touchdowns,
        rec_long: rec.long,
        rec_first_downs: rec.first_downs,
        rec_air_yards: rec.air_yards,
        rec_yac_yards: rec.yac,
        rec_fumbles: rec.fumbles,
        rec_fumbles_lost: rec.fumbles_lost,
        rec_2pt: rec.two_point_conversions,
        rec_epa_total: receiving.epa_total,
        rec_epa_per_target: receiving.epa_per_target,
        rec_success_rate: receiving.success_rate,

        def_tackles_solo: d.tackles_solo,
        def_tackle_assists: d.tackle_assists,
        def_tackles_for_loss: d.tackles_for_loss,
        def_sacks: decimal_to_f64(d.sacks),
        def_sack_yards: decimal_to_f64(d.sack_yards),
        def_qb_hits: d.qb_hits,
        def_interceptions: d.interceptions,
        def_interception_yards: d.interception_yards,
        def_pass_defended: d.pass_defended,
        def_fumbles_forced: d.fumbles_forced,
        def_tds: d.touchdowns,

        punt_returns: line.returns.punt_returns,
        punt_return_yards: line.returns.punt_return_yards,
        kickoff_returns: line.returns.kickoff_returns,
        kickoff_return_yards: line.returns.kickoff_return_yards,
        special_teams_tds: line.returns.touchdowns,

        fg_made: line.kicking.fg_made,
        fg_att: line.kicking.fg_att,
        fg_long: line.kicking.fg_long,
        pat_made: line.kicking.pat_made,
        pat_att: line.kicking.pat_att,

        team_pass_att: shares.team_pass_att,
        team_rush_att: shares.team_rush_att,
        team_targets: shares.team_targets,
        team_air_yards: shares.team_air_yards,
        target_share: shares.target_share,
        air_yards_share: shares.air_yards_share,
        rush_attempt_share: shares.rush_attempt_share,

        fantasy_points,
        fantasy_points_ppr,

        created_at: now,
        updated_at: now,
    }
}

fn band(line: &[i32; 6], band: DistanceBand) -> i32 {
    line[band.index()]
}

fn distance_sum(distances: &[i32]) -> Option<i32> {
    if distances.is_empty() {
        None
    } else {
        Some(distances.iter().sum())
    }
}

fn game_result(points_for: i32, points_against: i32) -> GameResult {
    match points_for.cmp(&points_against) {
        std::cmp::Ordering::Greater => GameResult::Win,
        std::cmp::Ordering::Less => GameResult::Loss,
        std::cmp::Ordering::Equal => GameResult::Tie,
    }
}

pub fn team_row(
    game: &GameInfo,
    context: &TeamContext,
    line: &TeamLine,
    now: DateTime<Utc>,
) -> TeamGameStat {
    let score = game.score_for(&context.team_id);
    let passing = passing_metrics(&line.passing);
    let rushing = rushing_metrics(&line.rushing);
    let p = &line.passing;
    let r = &line.rushing;
    let rec = &line.receiving;
    let d = &line.defense;
    let fr = &line.fumble_recoveries;
    let fg: &KickLine = &line.field_goals;
    let gw: &KickLine = &line.game_winning_fgs;
    let pat: &KickLine = &line.pats;

    use DistanceBand::*;

    TeamGameStat {
        id: row_id(TEAM_TABLE, &context.team_id, &game.game_id),
        game_id: game.game_id.clone(),
        team_id: context.team_id.clone(),
        opponent_team_id: context.opponent_team_id.clone(),
        season: game.season,
        week: game.week,
        season_type: game.season_type,
        home_away: context.home_away,

        points_for: score.map(|(pf, _)| pf),
        points_against: score.map(|(_, pa)| pa),
        point_diff: score.map(|(pf, pa)| pf - pa),
        result: score.map(|(pf, pa)| game_result(pf, pa)),

        total_plays: line.total_plays(),
        total_drives: line.drives.len() as i32,

        completions: p.completions,
        attempts: p.attempts,
        passing_yards: p.yards,
        passing_tds: p.touchdowns,
        passing_interceptions: p.interceptions,
        sacks_suffered: p.sacks,
        sack_yards_lost: p.sack_yards,
        sack_fumbles: p.sack_fumbles,
        sack_fumbles_lost: p.sack_fumbles_lost,
        passing_air_yards: p.air_yards,
        passing_yards_after_catch: p.yac,
        passing_first_downs: p.first_downs,
        passing_epa: passing.epa_total,
        passing_cpoe: passing.cpoe,
        passing_2pt_conversions: p.two_point_conversions,
        pass_yards_per_att: passing.yards_per_att,
        pass_epa_per_play: passing.epa_per_play,
        pass_success_rate: passing.success_rate,
        dropbacks: p.dropbacks(),
        neutral_pass_rate: neutral_pass_rate(line.neutral_dropbacks, line.neutral_rushes),

        carries: r.attempts,
        rushing_yards: r.yards,
        rushing_tds: r.touchdowns,
        rushing_fumbles: r.fumbles,
        rushing_fumbles_lost: r.fumbles_lost,
        rushing_first_downs: r.first_downs,
        rushing_epa: rushing.epa_total,
        rushing_2pt_conversions: r.two_point_conversions,
        rush_yards_per_carry: rushing.yards_per_carry,
        rush_epa_per_carry: rushing.epa_per_carry,
        rush_success_rate: rushing.success_rate,

        receptions: rec.receptions,
        targets: rec.targets,
        receiving_yards: rec.yards,
        receiving_tds: rec.touchdowns,
        receiving_fumbles: rec.fumbles,
        receiving_fumbles_lost: rec.fumbles_lost,
        receiving_air_yards: rec.air_yards,
        receiving_yards_after_catch: rec.yac,
        receiving_first_downs: rec.first_downs,
        receiving_epa: epa_total(rec.epa),
        receiving_2pt_conversions: rec.two_point_conversions,

        def_tackles_solo: d.tackles_solo,
        def_tackles_with_assist: d.tackles_with_assist,
        def_tackle_assists: d.tackle_assists,
        def_tackles_for_loss: d.tackles_for_loss,
        def_tackles_for_loss_yards: d.tackles_for_loss_yards,
        def_fumbles_forced: d.fumbles_forced,
        def_sacks: decimal_to_f64(d.sacks),
        def_sack_yards: d.sack_yards,
        def_qb_hits: d.qb_hits,
        def_interceptions: d.interceptions,
        def_interception_yards: d.interception_yards,
        def_pass_defended: d.pass_defended,
        def_tds: d.touchdowns,
        def_safeties: d.safeties,
        def_fumbles: d.fumbles,
        defense_epa_total: epa_total(d.epa),
        defense_epa_per_play: epa_per_play(d.epa, d.plays),

        fumble_recovery_own: fr.own,
        fumble_recovery_yards_own: fr.own_yards,
        fumble_recovery_opp: fr.opp,
        fumble_recovery_yards_opp: fr.opp_yards,
        fumble_recovery_tds: fr.touchdowns,
        misc_yards: fr.yards(),

        penalties: line.penalties,
        penalty_yards: line.penalty_yards,
        timeouts: line.timeouts,

        punt_returns: line.returns.punt_returns,
        punt_return_yards: line.returns.punt_return_yards,
        kickoff_returns: line.returns.kickoff_returns,
        kickoff_return_yards: line.returns.kickoff_return_yards,
        special_teams_tds: line.returns.touchdowns,

        fg_made: fg.made,
        fg_att: fg.attempts(),
        fg_missed: fg.missed,
        fg_blocked: fg.blocked,
        fg_long: fg.long,
        fg_pct: kick_pct(fg),
        fg_made_0_19: band(&fg.made_bands, Under20),
        fg_made_20_29: band(&fg.made_bands, Twenties),
        fg_made_30_39: band(&fg.made_bands, Thirties),
        fg_made_40_49: band(&fg.made_bands, Forties),
        fg_made_50_59: band(&fg.made_bands, Fifties),
        fg_made_60_: band(&fg.made_bands, SixtyPlus),
        fg_missed_0_19: band(&fg.missed_bands, Under20),
        fg_missed_20_29: band(&fg.missed_bands, Twenties),
        fg_missed_30_39: band(&fg.missed_bands, Thirties),
        fg_missed_40_49: band(&fg.missed_bands, Forties),
        fg_missed_50_59: band(&fg.missed_bands, Fifties),
        fg_missed_60_: band(&fg.missed_bands, SixtyPlus),
        fg_blocked_0_19: band(&fg.blocked_bands, Under20),
        fg_blocked_20_29: band(&fg.blocked_bands, Twenties),
        fg_blocked_30_39: band(&fg.blocked_bands, Thirties),
        fg_blocked_40_49: band(&fg.blocked_bands, Forties),
        fg_blocked_50_59: band(&fg.blocked_bands, Fifties),
        fg_blocked_60_: band(&fg.blocked_bands, SixtyPlus),
        fg_made_list: distance_list(&fg.made_distances),
        fg_missed_list: distance_list(&fg.missed_distances),
        fg_blocked_list: distance_list(&fg.blocked_distances),
        fg_made_distance: distance_sum(&fg.made_distances),
        fg_missed_distance: distance_sum(&fg.missed_distances),
        fg_blocked_distance: distance_sum(&fg.blocked_distances),

        gwfg_made: gw.made,
        gwfg_att: gw.attempts(),
        gwfg_missed: gw.missed,
        gwfg_blocked: gw.blocked,
        gwfg_distance: distance_sum(
            &[
                &gw.made_distances[..],
                &gw.missed_distances[..],
                &gw.blocked_distances[..],
            ]
            .concat(),
        ),

        pat_made: pat.made,
        pat_att: pat.attempts(),
        pat_missed: pat.missed,
        pat_blocked: pat.blocked,
        pat_pct: kick_pct(pat),
        pat_made_0_19: band(&pat.made_bands, Under20),
        pat_made_20_29: band(&pat.made_bands, Twenties),
        pat_made_30_39: band(&pat.made_bands, Thirties),
        pat_made_40_49: band(&pat.made_bands, Forties),
        pat_made_50_59: band(&pat.made_bands, Fifties),
        pat_made_60_: band(&pat.made_bands, SixtyPlus),
        pat_missed_0_19: band(&pat.missed_bands, Under20),
        pat_missed_20_29: band(&pat.missed_bands, Twenties),
        pat_missed_30_39: band(&pat.missed_bands, Thirties),
        pat_missed_40_49: band(&pat.missed_bands, Forties),
        pat_missed_50_59: band(&pat.missed_bands, Fifties),
        pat_missed_60_: band(&pat.missed_bands, SixtyPlus),

        created_at: now,
        updated_at: now,
    }
}

/// Rows the ledger can replace by (entity, game) key.
trait LedgerRow: Clone {
    const TABLE: &'static str;
    fn entity_id(&self) -> &str;
    fn game_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn set_created_at(&mut self, at: DateTime<Utc>);
}

impl LedgerRow for PlayerGameStat {
    const TABLE: &'static str = PLAYER_TABLE;
    fn entity_id(&self) -> &str {
        &self.player_id
    }
    fn game_id(&self) -> &str {
        &self.game_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }
}

impl LedgerRow for TeamGameStat {
    const TABLE: &'static str = TEAM_TABLE;
    fn entity_id(&self) -> &str {
        &self.team_id
    }
    fn game_id(&self) -> &str {
        &self.game_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }
}

type Key = (String, String);

/// Holds the latest rows per uniqueness key. Recomputing a game replaces all of that
/// game's rows at once; a replaced key keeps its original `created_at`.
#[derive(Debug, Default)]
pub struct RowAssembler {
    players: BTreeMap<Key, PlayerGameStat>,
    teams: BTreeMap<Key, TeamGameStat>,
}

impl RowAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a game's rows. Failed games leave previously admitted rows untouched.
    pub fn admit(&mut self, mut report: GameReport) -> GameReport {
        if !report.succeeded() {
            return report;
        }
        replace_game(
            &mut self.players,
            &report.game_id,
            &mut report.player_rows,
            &mut report.warnings,
        );
        replace_game(
            &mut self.teams,
            &report.game_id,
            &mut report.team_rows,
            &mut report.warnings,
        );
        report
    }

    pub fn player_row(&self, player_id: &str, game_id: &str) -> Option<&PlayerGameStat> {
        self.players
            .get(&(player_id.to_string(), game_id.to_string()))
    }

    pub fn team_row(&self, team_id: &str, game_id: &str) -> Option<&TeamGameStat> {
        self.teams.get(&(team_id.to_string(), game_id.to_string()))
    }

    pub fn player_rows(&self) -> impl Iterator<Item = &PlayerGameStat> {
        self.players.values()
    }

    pub fn team_rows(&self) -> impl Iterator<Item = &TeamGameStat> {
        self.teams.values()
    }
}

fn replace_game<R: LedgerRow>(
    ledger: &mut BTreeMap<Key, R>,
    game_id: &str,
    rows: &mut [R],
    warnings: &mut Vec<EngineWarning>,
) {
    let mut previous: BTreeMap<Key, R> = BTreeMap::new();
    ledger.retain(|key, row| {
        if key.1 == game_id {
            previous.insert(key.clone(), row.clone());
            false
        } else {
            true
        }
    });

    for row in rows.iter_mut() {
        let key = (row.entity_id().to_string(), row.game_id().to_string());
        if let Some(existing) = previous.get(&key) {
            row.set_created_at(existing.created_at());
            tracing::debug!(
                table = R::TABLE,
                entity_id = %key.0,
                game_id = %key.1,
                "Replacing row on recomputation"
            );
            warnings.push(EngineWarning::DuplicateGameRow {
                table: R::TABLE,
                entity_id: key.0.clone(),
                game_id: key.1.clone(),
            });
        }
        ledger.insert(key, row.clone());
    }
}
