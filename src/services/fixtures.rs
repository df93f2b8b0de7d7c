//! Play builders shared by the engine tests.

use crate::models::{GameInfo, GameInput, KickResult, PlayEvent, PlayType, SeasonType, SnapCount};

pub const GAME_ID: &str = "2024_01_BUF_KC";

pub fn game() -> GameInfo {
    GameInfo {
        game_id: GAME_ID.to_string(),
        season: 2024,
        week: 1,
        season_type: SeasonType::Reg,
        home_team: "KC".to_string(),
        away_team: "BUF".to_string(),
        home_score: Some(27),
        away_score: Some(20),
    }
}

fn snap(play_id: u32, posteam: &str, play_type: PlayType) -> PlayEvent {
    PlayEvent {
        game_id: GAME_ID.to_string(),
        play_id,
        posteam: Some(posteam.to_string()),
        play_type: Some(play_type),
        qtr: Some(1),
        drive: Some(1),
        score_differential: Some(0),
        ..PlayEvent::default()
    }
}

pub fn pass(
    play_id: u32,
    posteam: &str,
    passer: &str,
    receiver: Option<&str>,
    yards: i32,
    complete: bool,
) -> PlayEvent {
    PlayEvent {
        passer_id: Some(passer.to_string()),
        receiver_id: receiver.map(str::to_string),
        yards_gained: yards,
        air_yards: Some(yards.max(0) / 2),
        yards_after_catch: complete.then(|| yards - yards.max(0) / 2),
        complete_pass: complete,
        epa: Some(if complete { 0.75 } else { -0.5 }),
        cpoe: Some(if complete { 12.5 } else { -30.0 }),
        ..snap(play_id, posteam, PlayType::Pass)
    }
}

pub fn run(play_id: u32, posteam: &str, rusher: &str, yards: i32) -> PlayEvent {
    PlayEvent {
        rusher_id: Some(rusher.to_string()),
        yards_gained: yards,
        epa: Some(yards as f64 / 10.0 - 0.25),
        ..snap(play_id, posteam, PlayType::Run)
    }
}

pub fn sack(play_id: u32, posteam: &str, passer: &str, yards: i32, defenders: &[&str]) -> PlayEvent {
    PlayEvent {
        passer_id: Some(passer.to_string()),
        sack: true,
        yards_gained: yards,
        sack_player_ids: defenders.iter().map(|d| d.to_string()).collect(),
        epa: Some(-1.5),
        ..snap(play_id, posteam, PlayType::Pass)
    }
}

pub fn field_goal(
    play_id: u32,
    posteam: &str,
    kicker: &str,
    distance: i32,
    result: KickResult,
) -> PlayEvent {
    PlayEvent {
        kicker_id: Some(kicker.to_string()),
        kick_distance: Some(distance),
        kick_result: Some(result),
        ..snap(play_id, posteam, PlayType::FieldGoal)
    }
}

pub fn extra_point(play_id: u32, posteam: &str, kicker: &str, result: KickResult) -> PlayEvent {
    PlayEvent {
        kicker_id: Some(kicker.to_string()),
        kick_distance: Some(33),
        kick_result: Some(result),
        ..snap(play_id, posteam, PlayType::ExtraPoint)
    }
}

/// A short two-sided game touching most stat categories.
pub fn sample_plays() -> Vec<PlayEvent> {
    let mut td = pass(3, "KC", "qb_kc", Some("wr_kc"), 42, true);
    td.touchdown = true;
    td.first_down = true;
    td.drive = Some(1);

    let mut scramble = run(4, "KC", "qb_kc", 9);
    scramble.scramble = true;
    scramble.drive = Some(2);

    let mut int = pass(8, "BUF", "qb_buf", Some("wr_buf"), 0, false);
    int.interception = true;
    int.interception_player_id = Some("cb_kc".to_string());
    int.return_yards = 12;
    int.drive = Some(3);

    let mut fumble = run(9, "BUF", "rb_buf", 2);
    fumble.fumble = true;
    fumble.fumble_lost = true;
    fumble.fumbled_player_id = Some("rb_buf".to_string());
    fumble.fumble_recovery_team = Some("KC".to_string());
    fumble.forced_fumble_player_ids = vec!["lb_kc".to_string()];
    fumble.drive = Some(4);

    let mut punt = snap(10, "BUF", PlayType::Punt);
    punt.returner_id = Some("pr_kc".to_string());
    punt.return_yards = 15;

    let mut tackle = run(11, "KC", "rb_kc", -2);
    tackle.solo_tackle_player_ids = vec!["lb_buf".to_string()];
    tackle.tackle_for_loss_player_ids = vec!["lb_buf".to_string()];
    tackle.qtr = Some(4);
    tackle.score_differential = Some(14);
    tackle.drive = Some(5);

    vec![
        pass(1, "KC", "qb_kc", Some("wr_kc"), 12, true),
        run(2, "KC", "rb_kc", 5),
        td,
        extra_point(5, "KC", "k_kc", KickResult::Made),
        scramble,
        sack(6, "BUF", "qb_buf", -7, &["de_kc", "lb_kc"]),
        pass(7, "BUF", "qb_buf", Some("te_buf"), 8, true),
        int,
        fumble,
        punt,
        tackle,
        field_goal(12, "BUF", "k_buf", 50, KickResult::Made),
    ]
}

pub fn input(plays: Vec<PlayEvent>) -> GameInput {
    GameInput {
        game: game(),
        plays: Some(plays),
        snaps: vec![SnapCount {
            player_id: "qb_kc".to_string(),
            offense_snaps: Some(64),
            offense_pct: Some(1.0),
            ..SnapCount::default()
        }],
    }
}
