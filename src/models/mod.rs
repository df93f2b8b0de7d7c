use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayType {
    Pass,
    #[serde(alias = "rush")]
    Run,
    Punt,
    Kickoff,
    FieldGoal,
    ExtraPoint,
    QbKneel,
    QbSpike,
    NoPlay,
    /// Any play type outside the set above. Such events are skipped, not the whole bundle.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KickResult {
    #[serde(alias = "good")]
    Made,
    #[serde(alias = "failed")]
    Missed,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeasonType {
    Pre,
    Reg,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HomeAway {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
    #[serde(rename = "T")]
    Tie,
}

/// One snap of the play-by-play feed.
///
/// For scrimmage plays `posteam` is the offense. For punts, kickoffs, field goals and
/// PATs it is the kicking team, and returners belong to `defteam`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayEvent {
    pub game_id: String,
    pub play_id: u32,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub play_type: Option<PlayType>,
    pub qtr: Option<u8>,
    pub drive: Option<u32>,
    /// Score margin from the possessing team's perspective at the snap.
    pub score_differential: Option<i32>,

    pub passer_id: Option<String>,
    pub rusher_id: Option<String>,
    pub receiver_id: Option<String>,
    pub kicker_id: Option<String>,
    pub returner_id: Option<String>,

    pub sack_player_ids: Vec<String>,
    pub qb_hit_player_ids: Vec<String>,
    pub pass_defense_player_ids: Vec<String>,
    pub solo_tackle_player_ids: Vec<String>,
    pub assist_tackle_player_ids: Vec<String>,
    pub tackle_for_loss_player_ids: Vec<String>,
    pub forced_fumble_player_ids: Vec<String>,
    /// Team of the listed tacklers. Defaults to the defense, or to the offense when the
    /// ball changed hands on the play.
    pub tackle_team: Option<String>,
    pub interception_player_id: Option<String>,
    pub fumbled_player_id: Option<String>,
    pub fumble_recovery_team: Option<String>,

    pub yards_gained: i32,
    pub air_yards: Option<i32>,
    pub yards_after_catch: Option<i32>,
    pub return_yards: i32,
    pub fumble_recovery_yards: i32,
    pub penalty_yards: i32,
    pub kick_distance: Option<i32>,
    pub epa: Option<f64>,
    pub cpoe: Option<f64>,
    /// Positive-EPA flag. Falls back to `epa > 0` when the feed leaves it out.
    pub success: Option<bool>,

    pub complete_pass: bool,
    pub interception: bool,
    pub sack: bool,
    pub scramble: bool,
    pub touchdown: bool,
    pub td_team: Option<String>,
    pub first_down: bool,
    pub fumble: bool,
    pub fumble_lost: bool,
    pub safety: bool,
    pub penalty: bool,
    pub penalty_team: Option<String>,
    pub two_point_attempt: bool,
    pub two_point_success: bool,
    #[serde(deserialize_with = "lenient_enum")]
    pub kick_result: Option<KickResult>,
    pub timeout_team: Option<String>,
}

/// Read an optional enum, treating values outside the known set as absent.
fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl PlayEvent {
    pub fn is_success(&self) -> bool {
        self.success
            .unwrap_or_else(|| self.epa.is_some_and(|epa| epa > 0.0))
    }
}

/// Reference data for one game, owned by the schedule collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub game_id: String,
    pub season: i32,
    pub week: i32,
    pub season_type: SeasonType,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_score: Option<i32>,
    #[serde(default)]
    pub away_score: Option<i32>,
}

impl GameInfo {
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        if team == self.home_team {
            Some(&self.away_team)
        } else if team == self.away_team {
            Some(&self.home_team)
        } else {
            None
        }
    }

    pub fn home_away(&self, team: &str) -> Option<HomeAway> {
        if team == self.home_team {
            Some(HomeAway::Home)
        } else if team == self.away_team {
            Some(HomeAway::Away)
        } else {
            None
        }
    }

    /// Final (points_for, points_against) from `team`'s perspective, when the score is known.
    pub fn score_for(&self, team: &str) -> Option<(i32, i32)> {
        let (home, away) = (self.home_score?, self.away_score?);
        match self.home_away(team)? {
            HomeAway::Home => Some((home, away)),
            HomeAway::Away => Some((away, home)),
        }
    }

    pub fn teams(&self) -> [&str; 2] {
        [&self.home_team, &self.away_team]
    }
}

/// Externally supplied snap participation, passed straight through to the player row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapCount {
    pub player_id: String,
    pub offense_snaps: Option<i32>,
    pub offense_pct: Option<f64>,
    pub defense_snaps: Option<i32>,
    pub defense_pct: Option<f64>,
    pub st_snaps: Option<i32>,
    pub st_pct: Option<f64>,
}

/// Everything needed to aggregate one game, fully materialised up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInput {
    pub game: GameInfo,
    /// `None` means the upstream stream was absent altogether.
    #[serde(default)]
    pub plays: Option<Vec<PlayEvent>>,
    #[serde(default)]
    pub snaps: Vec<SnapCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameStat {
    pub id: String,
    pub player_id: String,
    pub game_id: String,
    pub season: i32,
    pub week: i32,
    pub season_type: SeasonType,
    pub team_id: String,
    pub opponent_team_id: String,
    pub home_away: HomeAway,

    pub snaps_offense: Option<i32>,
    pub snaps_offense_pct: Option<f64>,
    pub snaps_defense: Option<i32>,
    pub snaps_defense_pct: Option<f64>,
    pub snaps_st: Option<i32>,
    pub snaps_st_pct: Option<f64>,

    pub pass_att: i32,
    pub pass_cmp: i32,
    pub pass_yards: i32,
    pub pass_td: i32,
    pub interceptions: i32,
    pub sacks: i32,
    pub sack_yards: i32,
    pub sack_fumbles: i32,
    pub sack_fumbles_lost: i32,
    pub pass_first_downs: i32,
    pub pass_air_yards: i32,
    pub pass_yac_yards: i32,
    pub pass_2pt: i32,
    pub dropbacks: i32,
    pub pass_yards_per_att: Option<f64>,
    pub pass_any_a: Option<f64>,
    pub passer_rating: Option<f64>,
    pub cpoe: Option<f64>,
    pub pass_epa_total: Option<f64>,
    pub pass_epa_per_play: Option<f64>,
    pub pass_success_rate: Option<f64>,

    pub rush_att: i32,
    pub rush_yards: i32,
    pub rush_td: i32,
    pub rush_long: Option<i32>,
    pub rush_first_downs: i32,
    pub rush_fumbles: i32,
    pub rush_fumbles_lost: i32,
    pub rush_2pt: i32,
    pub rush_yards_per_carry: Option<f64>,
    pub rush_epa_total: Option<f64>,
    pub rush_epa_per_carry: Option<f64>,
    pub rush_success_rate: Option<f64>,

    pub targets: i32,
    pub receptions: i32,
    pub rec_yards: i32,
    pub rec_td: i32,
    pub rec_long: Option<i32>,
    pub rec_first_downs: i32,
    pub rec_air_yards: i32,
    pub rec_yac_yards: i32,
    pub rec_fumbles: i32,
    pub rec_fumbles_lost: i32,
    pub rec_2pt: i32,
    pub rec_epa_total: Option<f64>,
    pub rec_epa_per_target: Option<f64>,
    pub rec_success_rate: Option<f64>,

    pub def_tackles_solo: i32,
    pub def_tackle_assists: i32,
    pub def_tackles_for_loss: i32,
    pub def_sacks: f64,
    pub def_sack_yards: f64,
    pub def_qb_hits: i32,
    pub def_interceptions: i32,
    pub def_interception_yards: i32,
    pub def_pass_defended: i32,
    pub def_fumbles_forced: i32,
    pub def_tds: i32,

    pub punt_returns: i32,
    pub punt_return_yards: i32,
    pub kickoff_returns: i32,
    pub kickoff_return_yards: i32,
    pub special_teams_tds: i32,

    pub fg_made: i32,
    pub fg_att: i32,
    pub fg_long: Option<i32>,
    pub pat_made: i32,
    pub pat_att: i32,

    pub team_pass_att: Option<i32>,
    pub team_rush_att: Option<i32>,
    pub team_targets: Option<i32>,
    pub team_air_yards: Option<i32>,
    pub target_share: Option<f64>,
    pub air_yards_share: Option<f64>,
    pub rush_attempt_share: Option<f64>,

    pub fantasy_points: f64,
    pub fantasy_points_ppr: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGameStat {
    pub id: String,
    pub game_id: String,
    pub team_id: String,
    pub opponent_team_id: String,
    pub season: i32,
    pub week: i32,
    pub season_type: SeasonType,
    pub home_away: HomeAway,

    pub points_for: Option<i32>,
    pub points_against: Option<i32>,
    pub point_diff: Option<i32>,
    pub result: Option<GameResult>,

    pub total_plays: i32,
    pub total_drives: i32,

    pub completions: i32,
    pub attempts: i32,
    pub passing_yards: i32,
    pub passing_tds: i32,
    pub passing_interceptions: i32,
    pub sacks_suffered: i32,
    pub sack_yards_lost: i32,
    pub sack_fumbles: i32,
    pub sack_fumbles_lost: i32,
    pub passing_air_yards: i32,
    pub passing_yards_after_catch: i32,
    pub passing_first_downs: i32,
    pub passing_epa: Option<f64>,
    pub passing_cpoe: Option<f64>,
    pub passing_2pt_conversions: i32,
    pub pass_yards_per_att: Option<f64>,
    pub pass_epa_per_play: Option<f64>,
    pub pass_success_rate: Option<f64>,
    pub dropbacks: i32,
    pub neutral_pass_rate: Option<f64>,

    pub carries: i32,
    pub rushing_yards: i32,
    pub rushing_tds: i32,
    pub rushing_fumbles: i32,
    pub rushing_fumbles_lost: i32,
    pub rushing_first_downs: i32,
    pub rushing_epa: Option<f64>,
    pub rushing_2pt_conversions: i32,
    pub rush_yards_per_carry: Option<f64>,
    pub rush_epa_per_carry: Option<f64>,
    pub rush_success_rate: Option<f64>,

    pub receptions: i32,
    pub targets: i32,
    pub receiving_yards: i32,
    pub receiving_tds: i32,
    pub receiving_fumbles: i32,
    pub receiving_fumbles_lost: i32,
    pub receiving_air_yards: i32,
    pub receiving_yards_after_catch: i32,
    pub receiving_first_downs: i32,
    pub receiving_epa: Option<f64>,
    pub receiving_2pt_conversions: i32,

    pub def_tackles_solo: i32,
    pub def_tackles_with_assist: i32,
    pub def_tackle_assists: i32,
    pub def_tackles_for_loss: i32,
    pub def_tackles_for_loss_yards: i32,
    pub def_fumbles_forced: i32,
    pub def_sacks: f64,
    pub def_sack_yards: i32,
    pub def_qb_hits: i32,
    pub def_interceptions: i32,
    pub def_interception_yards: i32,
    pub def_pass_defended: i32,
    pub def_tds: i32,
    pub def_safeties: i32,
    pub def_fumbles: i32,
    pub defense_epa_total: Option<f64>,
    pub defense_epa_per_play: Option<f64>,

    pub fumble_recovery_own: i32,
    pub fumble_recovery_yards_own: i32,
    pub fumble_recovery_opp: i32,
    pub fumble_recovery_yards_opp: i32,
    pub fumble_recovery_tds: i32,
    pub misc_yards: i32,

    pub penalties: i32,
    pub penalty_yards: i32,
    pub timeouts: i32,

    pub punt_returns: i32,
    pub punt_return_yards: i32,
    pub kickoff_returns: i32,
    pub kickoff_return_yards: i32,
    pub special_teams_tds: i32,

    pub fg_made: i32,
    pub fg_att: i32,
    pub fg_missed: i32,
    pub fg_blocked: i32,
    pub fg_long: Option<i32>,
    pub fg_pct: Option<f64>,
    pub fg_made_0_19: i32,
    pub fg_made_20_29: i32,
    pub fg_made_30_39: i32,
    pub fg_made_40_49: i32,
    pub fg_made_50_59: i32,
    pub fg_made_60_: i32,
    pub fg_missed_0_19: i32,
    pub fg_missed_20_29: i32,
    pub fg_missed_30_39: i32,
    pub fg_missed_40_49: i32,
    pub fg_missed_50_59: i32,
    pub fg_missed_60_: i32,
    pub fg_blocked_0_19: i32,
    pub fg_blocked_20_29: i32,
    pub fg_blocked_30_39: i32,
    pub fg_blocked_40_49: i32,
    pub fg_blocked_50_59: i32,
    pub fg_blocked_60_: i32,
    pub fg_made_list: Option<String>,
    pub fg_missed_list: Option<String>,
    pub fg_blocked_list: Option<String>,
    pub fg_made_distance: Option<i32>,
    pub fg_missed_distance: Option<i32>,
    pub fg_blocked_distance: Option<i32>,

    pub gwfg_made: i32,
    pub gwfg_att: i32,
    pub gwfg_missed: i32,
    pub gwfg_blocked: i32,
    pub gwfg_distance: Option<i32>,

    pub pat_made: i32,
    pub pat_att: i32,
    pub pat_missed: i32,
    pub pat_blocked: i32,
    pub pat_pct: Option<f64>,
    pub pat_made_0_19: i32,
    pub pat_made_20_29: i32,
    pub pat_made_30_39: i32,
    pub pat_made_40_49: i32,
    pub pat_made_50_59: i32,
    pub pat_made_60_: i32,
    pub pat_missed_0_19: i32,
    pub pat_missed_20_29: i32,
    pub pat_missed_30_39: i32,
    pub pat_missed_40_49: i32,
    pub pat_missed_50_59: i32,
    pub pat_missed_60_: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-game outcome handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GameStatus {
    Succeeded,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameReport {
    pub game_id: String,
    pub status: GameStatus,
    pub warnings: Vec<crate::error::EngineWarning>,
    pub player_rows: Vec<PlayerGameStat>,
    pub team_rows: Vec<TeamGameStat>,
}

impl GameReport {
    pub fn succeeded(&self) -> bool {
        self.status == GameStatus::Succeeded
    }
}
