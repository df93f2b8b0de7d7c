use rust_decimal::Decimal;

use crate::config::FantasyScoring;
use crate::error::EngineWarning;
use crate::services::counters::{KickLine, PassingLine, ReceivingLine, RushingLine};
use crate::services::player_accumulator::PlayerLine;
use crate::services::team_accumulator::TeamLine;
use crate::utils::{clamp, decimal_to_f64, ratio, safe_div, share};

const RATING_COMPONENT_MAX: f64 = 2.375;

/// NFL passer rating. Each of the four components is clamped to [0, 2.375].
pub fn passer_rating(att: i32, cmp: i32, yards: i32, td: i32, int: i32) -> Option<f64> {
    if att <= 0 {
        return None;
    }
    let att = att as f64;
    let a = (cmp as f64 / att - 0.3) * 5.0;
    let b = (yards as f64 / att - 3.0) * 0.25;
    let c = td as f64 / att * 20.0;
    let d = RATING_COMPONENT_MAX - int as f64 / att * 25.0;

    let sum: f64 = [a, b, c, d]
        .iter()
        .map(|v| clamp(*v, 0.0, RATING_COMPONENT_MAX))
        .sum();
    Some(sum / 6.0 * 100.0)
}

/// Adjusted net yards per attempt, over attempts plus sacks.
pub fn any_a(yards: i32, td: i32, int: i32, sack_yards: i32, att: i32, sacks: i32) -> Option<f64> {
    let numerator = yards + 20 * td - 45 * int - sack_yards;
    ratio(numerator, att + sacks)
}

pub fn success_rate(successes: i32, plays: i32) -> Option<f64> {
    ratio(successes, plays)
}

pub fn epa_total(epa: Option<Decimal>) -> Option<f64> {
    epa.map(decimal_to_f64)
}

/// Mean EPA. Null when there are no plays or no play carried an EPA value.
pub fn epa_per_play(epa: Option<Decimal>, plays: i32) -> Option<f64> {
    if plays <= 0 {
        return None;
    }
    epa.map(|total| decimal_to_f64(total / Decimal::from(plays)))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassingMetrics {
    pub yards_per_att: Option<f64>,
    pub any_a: Option<f64>,
    pub passer_rating: Option<f64>,
    pub cpoe: Option<f64>,
    pub epa_total: Option<f64>,
    pub epa_per_play: Option<f64>,
    pub success_rate: Option<f64>,
}

pub fn passing_metrics(line: &PassingLine) -> PassingMetrics {
    let cpoe = match (line.cpoe_sum, line.cpoe_count) {
        (Some(sum), count) if count > 0 => Some(decimal_to_f64(sum / Decimal::from(count))),
        _ => None,
    };
    PassingMetrics {
        yards_per_att: ratio(line.yards, line.attempts),
        any_a: any_a(
            line.yards,
            line.touchdowns,
            line.interceptions,
            line.sack_yards,
            line.attempts,
            line.sacks,
        ),
        passer_rating: passer_rating(
            line.attempts,
            line.completions,
            line.yards,
            line.touchdowns,
            line.interceptions,
        ),
        cpoe,
        epa_total: epa_total(line.epa),
        epa_per_play: epa_per_play(line.epa, line.plays()),
        success_rate: success_rate(line.successes, line.plays()),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RushingMetrics {
    pub yards_per_carry: Option<f64>,
    pub epa_total: Option<f64>,
    pub epa_per_carry: Option<f64>,
    pub success_rate: Option<f64>,
}

pub fn rushing_metrics(line: &RushingLine) -> RushingMetrics {
    RushingMetrics {
        yards_per_carry: ratio(line.yards, line.attempts),
        epa_total: epa_total(line.epa),
        epa_per_carry: epa_per_play(line.epa, line.attempts),
        success_rate: success_rate(line.successes, line.attempts),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceivingMetrics {
    pub epa_total: Option<f64>,
    pub epa_per_target: Option<f64>,
    pub success_rate: Option<f64>,
}

pub fn receiving_metrics(line: &ReceivingLine) -> ReceivingMetrics {
    ReceivingMetrics {
        epa_total: epa_total(line.epa),
        epa_per_target: epa_per_play(line.epa, line.targets),
        success_rate: success_rate(line.successes, line.targets),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageShares {
    pub team_pass_att: Option<i32>,
    pub team_rush_att: Option<i32>,
    pub team_targets: Option<i32>,
    pub team_air_yards: Option<i32>,
    pub target_share: Option<f64>,
    pub air_yards_share: Option<f64>,
    pub rush_attempt_share: Option<f64>,
}

/// Player shares of the same-game team totals. A share whose team total is missing or not
/// positive is null, and a warning is raised when the player still has a nonzero numerator.
pub fn usage_shares(
    player: &PlayerLine,
    team: Option<&TeamLine>,
    warnings: &mut Vec<EngineWarning>,
) -> UsageShares {
    let team_pass_att = team.map(|t| t.passing.attempts);
    let team_rush_att = team.map(|t| t.rushing.attempts);
    let team_targets = team.map(|t| t.receiving.targets);
    let team_air_yards = team.map(|t| t.receiving.air_yards);

    let mut checked = |field: &'static str, numerator: i32, denominator: Option<i32>| {
        let value = denominator.and_then(|d| share(numerator, d));
        if value.is_none() && numerator != 0 {
            tracing::warn!(
                player_id = %player.player_id,
                field,
                numerator,
                ?denominator,
                "Share denominator inconsistent with player total"
            );
            warnings.push(EngineWarning::InconsistentShareDenominator {
                player_id: player.player_id.clone(),
                field,
                numerator,
                denominator,
            });
        }
        value
    };

    let target_share = checked("target_share", player.receiving.targets, team_targets);
    let air_yards_share = checked("air_yards_share", player.receiving.air_yards, team_air_yards);
    let rush_attempt_share = checked("rush_attempt_share", player.rushing.attempts, team_rush_att);

    UsageShares {
        team_pass_att,
        team_rush_att,
        team_targets,
        team_air_yards,
        target_share,
        air_yards_share,
        rush_attempt_share,
    }
}

/// Standard and PPR fantasy totals. Never null: missing counters are zeros here.
pub fn fantasy_points(player: &PlayerLine, scoring: &FantasyScoring) -> (f64, f64) {
    let passing = &player.passing;
    let rushing = &player.rushing;
    let receiving = &player.receiving;

    let fumbles_lost = rushing.fumbles_lost + receiving.fumbles_lost + passing.sack_fumbles_lost;
    let two_points = passing.two_point_conversions
        + rushing.two_point_conversions
        + receiving.two_point_conversions;

    let standard = passing.yards as f64 / scoring.passing_yd_per_point
        + passing.touchdowns as f64 * scoring.passing_td_points
        + passing.interceptions as f64 * scoring.interception_points
        + rushing.yards as f64 / scoring.rushing_yd_per_point
        + receiving.yards as f64 / scoring.receiving_yd_per_point
        + rushing.touchdowns as f64 * scoring.rushing_td_points
        + receiving.touchdowns as f64 * scoring.receiving_td_points
        + fumbles_lost as f64 * scoring.fumble_lost_points
        + player.returns.touchdowns as f64 * scoring.special_teams_td_points
        + two_points as f64 * scoring.two_point_conversion_points;
    let ppr = standard + receiving.receptions as f64 * scoring.reception_points;

    (standard, ppr)
}

pub fn kick_pct(line: &KickLine) -> Option<f64> {
    ratio(line.made, line.attempts())
}

/// Share of neutral-situation plays that were dropbacks.
pub fn neutral_pass_rate(dropbacks: i32, designed_rushes: i32) -> Option<f64> {
    safe_div(dropbacks as f64, (dropbacks + designed_rushes) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: Option<f64>, expected: f64) {
        let value = actual.unwrap();
        assert!((value - expected).abs() < 1e-9, "{} != {}", value, expected);
    }

    #[test]
    fn test_passer_rating_bounds() {
        approx(passer_rating(10, 10, 200, 10, 0), 158.333_333_333_333_3);
        approx(passer_rating(10, 0, 0, 0, 5), 0.0);
        // 20/30, 250 yds, 2 TD, 1 INT
        approx(passer_rating(30, 20, 250, 2, 1), 100.694_444_444_444_4);
        assert_eq!(passer_rating(0, 0, 0, 0, 0), None);
    }

    #[test]
    fn test_any_a() {
        approx(any_a(300, 2, 1, 20, 30, 2), (300.0 + 40.0 - 45.0 - 20.0) / 32.0);
        assert_eq!(any_a(0, 0, 0, 0, 0, 0), None);
        approx(any_a(0, 0, 0, 9, 0, 1), -9.0);
    }

    #[test]
    fn test_null_vs_zero() {
        let line = PassingLine::default();
        let metrics = passing_metrics(&line);
        assert_eq!(metrics.passer_rating, None);
        assert_eq!(metrics.yards_per_att, None);
        assert_eq!(metrics.any_a, None);
        assert_eq!(metrics.success_rate, None);

        let zero = PassingLine {
            attempts: 4,
            ..PassingLine::default()
        };
        let metrics = passing_metrics(&zero);
        assert_eq!(metrics.yards_per_att, Some(0.0));
        assert_eq!(metrics.success_rate, Some(0.0));
        assert_eq!(metrics.epa_per_play, None);
    }

    #[test]
    fn test_epa_per_play() {
        let total = Some(Decimal::new(15, 1));
        assert_eq!(epa_per_play(total, 3), Some(0.5));
        assert_eq!(epa_per_play(total, 0), None);
        assert_eq!(epa_per_play(None, 3), None);
    }

    #[test]
    fn test_fantasy_scoring_example() {
        let mut player = PlayerLine::default();
        player.passing.yards = 300;
        player.passing.touchdowns = 3;
        player.passing.interceptions = 1;
        let (standard, ppr) = fantasy_points(&player, &FantasyScoring::default());
        assert_eq!(standard, 22.0);
        assert_eq!(ppr, 22.0);
    }

    #[test]
    fn test_ppr_adds_receptions() {
        let mut player = PlayerLine::default();
        player.receiving.receptions = 6;
        player.receiving.yards = 85;
        player.receiving.touchdowns = 1;
        player.rushing.fumbles_lost = 1;
        let (standard, ppr) = fantasy_points(&player, &FantasyScoring::default());
        approx(Some(standard), 8.5 + 6.0 - 2.0);
        approx(Some(ppr), 8.5 + 6.0 - 2.0 + 6.0);
    }

    #[test]
    fn test_share_with_missing_team_total_warns() {
        let mut player = PlayerLine {
            player_id: "wr1".to_string(),
            ..PlayerLine::default()
        };
        player.receiving.targets = 3;
        let mut warnings = Vec::new();
        let shares = usage_shares(&player, None, &mut warnings);
        assert_eq!(shares.target_share, None);
        assert_eq!(shares.rush_attempt_share, None);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            EngineWarning::InconsistentShareDenominator { field: "target_share", numerator: 3, .. }
        ));
    }

    #[test]
    fn test_shares_against_team_totals() {
        let mut player = PlayerLine::default();
        player.receiving.targets = 2;
        player.receiving.air_yards = 30;
        let mut team = TeamLine::default();
        team.receiving.targets = 8;
        team.receiving.air_yards = 120;
        team.rushing.attempts = 20;
        let mut warnings = Vec::new();
        let shares = usage_shares(&player, Some(&team), &mut warnings);
        assert_eq!(shares.target_share, Some(0.25));
        assert_eq!(shares.air_yards_share, Some(0.25));
        assert_eq!(shares.rush_attempt_share, Some(0.0));
        assert_eq!(shares.team_rush_att, Some(20));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_negative_team_air_yards_still_divide() {
        let mut player = PlayerLine::default();
        player.receiving.targets = 1;
        player.receiving.air_yards = -4;
        let mut team = TeamLine::default();
        team.receiving.targets = 2;
        team.receiving.air_yards = -2;
        let mut warnings = Vec::new();
        let shares = usage_shares(&player, Some(&team), &mut warnings);
        assert_eq!(shares.air_yards_share, Some(2.0));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_neutral_pass_rate() {
        assert_eq!(neutral_pass_rate(3, 1), Some(0.75));
        assert_eq!(neutral_pass_rate(0, 0), None);
    }
}
