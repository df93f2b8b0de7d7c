use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Column, QueryBuilder, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::env;
use std::str::FromStr;

use crate::models::{GameReport, PlayerGameStat, TeamGameStat};

pub async fn create_pool() -> Result<SqlitePool> {
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data/nflstats.db".to_string());

    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(&database_url);

    if let Some(parent) = std::path::Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database() -> Result<()> {
    let pool = create_pool().await?;
    init_database_with_pool(&pool).await
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_PLAYER_GAME_STATS).execute(pool).await?;
    sqlx::query(CREATE_TEAM_GAME_STATS).execute(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_player_game_stats_game ON player_game_stats(game_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_team_game_stats_game ON team_game_stats(game_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

/// Where a row kind lives and which columns make up its uniqueness key.
struct TableSpec {
    name: &'static str,
    entity_column: &'static str,
    /// Columns the database computes itself.
    generated: &'static [&'static str],
}

const PLAYER_TABLE: TableSpec = TableSpec {
    name: "player_game_stats",
    entity_column: "player_id",
    generated: &[],
};

const TEAM_TABLE: TableSpec = TableSpec {
    name: "team_game_stats",
    entity_column: "team_id",
    generated: &["point_diff"],
};

/// Write one game's rows in a single transaction. Existing rows for the same key are
/// replaced in full (keeping their stored `created_at`), and rows of that game that the
/// recomputation no longer produces are removed.
pub async fn persist_report(pool: &SqlitePool, report: &GameReport) -> Result<()> {
    if !report.succeeded() {
        tracing::warn!(game_id = %report.game_id, "Not persisting failed game");
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let players: Vec<&str> = report.player_rows.iter().map(|r| r.player_id.as_str()).collect();
    delete_stale(&mut tx, &PLAYER_TABLE, &report.game_id, &players).await?;
    for row in &report.player_rows {
        upsert_row(&mut tx, &PLAYER_TABLE, row).await?;
    }

    let teams: Vec<&str> = report.team_rows.iter().map(|r| r.team_id.as_str()).collect();
    delete_stale(&mut tx, &TEAM_TABLE, &report.game_id, &teams).await?;
    for row in &report.team_rows {
        upsert_row(&mut tx, &TEAM_TABLE, row).await?;
    }

    tx.commit().await?;

    tracing::info!(
        game_id = %report.game_id,
        players = report.player_rows.len(),
        teams = report.team_rows.len(),
        "Persisted game rows"
    );
    Ok(())
}

async fn delete_stale(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    table: &TableSpec,
    game_id: &str,
    keep: &[&str],
) -> Result<()> {
    let mut query = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE game_id = ", table.name));
    query.push_bind(game_id.to_string());
    if !keep.is_empty() {
        query.push(format!(" AND {} NOT IN (", table.entity_column));
        let mut ids = query.separated(", ");
        for id in keep {
            ids.push_bind(id.to_string());
        }
        ids.push_unseparated(")");
    }
    query.build().execute(&mut **tx).await?;
    Ok(())
}

async fn upsert_row<T: Serialize>(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    table: &TableSpec,
    row: &T,
) -> Result<()> {
    let Value::Object(mut fields) = serde_json::to_value(row)? else {
        anyhow::bail!("{} row did not serialize to an object", table.name);
    };
    for column in table.generated {
        fields.remove(*column);
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (", table.name));
    {
        let mut columns = query.separated(", ");
        for column in fields.keys() {
            columns.push(column.as_str());
        }
    }
    query.push(") VALUES (");
    {
        let mut values = query.separated(", ");
        for value in fields.values() {
            match value {
                Value::Null => values.push_bind(None::<i64>),
                Value::Bool(b) => values.push_bind(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => values.push_bind(i),
                    None => values.push_bind(n.as_f64()),
                },
                Value::String(s) => values.push_bind(s.clone()),
                other => values.push_bind(other.to_string()),
            };
        }
    }
    query.push(format!(
        ") ON CONFLICT({}, game_id) DO UPDATE SET ",
        table.entity_column
    ));
    {
        let mut updates = query.separated(", ");
        for column in fields.keys() {
            if column == "id" || column == "created_at" {
                continue;
            }
            updates.push(format!("{0} = excluded.{0}", column));
        }
    }

    query.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn get_player_game_stats(pool: &SqlitePool, player_id: &str) -> Result<Vec<PlayerGameStat>> {
    let rows = sqlx::query("SELECT * FROM player_game_stats WHERE player_id = ? ORDER BY season, week, game_id")
        .bind(player_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(decode_row::<PlayerGameStat>).collect()
}

pub async fn get_team_game_stats(pool: &SqlitePool, team_id: &str) -> Result<Vec<TeamGameStat>> {
    let rows = sqlx::query("SELECT * FROM team_game_stats WHERE team_id = ? ORDER BY season, week, game_id")
        .bind(team_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(decode_row::<TeamGameStat>).collect()
}

pub async fn get_game_team_stats(pool: &SqlitePool, game_id: &str) -> Result<Vec<TeamGameStat>> {
    let rows = sqlx::query("SELECT * FROM team_game_stats WHERE game_id = ? ORDER BY team_id")
        .bind(game_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(decode_row::<TeamGameStat>).collect()
}

/// Rebuild a row struct from its columns, by way of the same JSON shape used to write it.
fn decode_row<T: DeserializeOwned>(row: &SqliteRow) -> Result<T> {
    let mut fields = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let kind = raw.type_info().name().to_string();
            match kind.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(i)?),
                "REAL" | "NUMERIC" => Value::from(row.try_get::<f64, _>(i)?),
                _ => Value::from(row.try_get::<String, _>(i)?),
            }
        };
        fields.insert(column.name().to_string(), value);
    }
    serde_json::from_value(Value::Object(fields)).context("Stored stats row has an unexpected shape")
}

const CREATE_PLAYER_GAME_STATS: &str = r#"
CREATE TABLE IF NOT EXISTS player_game_stats (
    id TEXT PRIMARY KEY,
    player_id TEXT NOT NULL,
    game_id TEXT NOT NULL,
    season INTEGER NOT NULL DEFAULT 0,
    week INTEGER NOT NULL DEFAULT 0,
    season_type TEXT NOT NULL,
    team_id TEXT NOT NULL,
    opponent_team_id TEXT NOT NULL,
    home_away TEXT NOT NULL,
    snaps_offense INTEGER,
    snaps_offense_pct REAL,
    snaps_defense INTEGER,
    snaps_defense_pct REAL,
    snaps_st INTEGER,
    snaps_st_pct REAL,
    pass_att INTEGER NOT NULL DEFAULT 0,
    pass_cmp INTEGER NOT NULL DEFAULT 0,
    pass_yards INTEGER NOT NULL DEFAULT 0,
    pass_td INTEGER NOT NULL DEFAULT 0,
    interceptions INTEGER NOT NULL DEFAULT 0,
    sacks INTEGER NOT NULL DEFAULT 0,
    sack_yards INTEGER NOT NULL DEFAULT 0,
    sack_fumbles INTEGER NOT NULL DEFAULT 0,
    sack_fumbles_lost INTEGER NOT NULL DEFAULT 0,
    pass_first_downs INTEGER NOT NULL DEFAULT 0,
    pass_air_yards INTEGER NOT NULL DEFAULT 0,
    pass_yac_yards INTEGER NOT NULL DEFAULT 0,
    pass_2pt INTEGER NOT NULL DEFAULT 0,
    dropbacks INTEGER NOT NULL DEFAULT 0,
    pass_yards_per_att REAL,
    pass_any_a REAL,
    passer_rating REAL,
    cpoe REAL,
    pass_epa_total REAL,
    pass_epa_per_play REAL,
    pass_success_rate REAL,
    rush_att INTEGER NOT NULL DEFAULT 0,
    rush_yards INTEGER NOT NULL DEFAULT 0,
    rush_td INTEGER NOT NULL DEFAULT 0,
    rush_long INTEGER,
    rush_first_downs INTEGER NOT NULL DEFAULT 0,
    rush_fumbles INTEGER NOT NULL DEFAULT 0,
    rush_fumbles_lost INTEGER NOT NULL DEFAULT 0,
    rush_2pt INTEGER NOT NULL DEFAULT 0,
    rush_yards_per_carry REAL,
    rush_epa_total REAL,
    rush_epa_per_carry REAL,
    rush_success_rate REAL,
    targets INTEGER NOT NULL DEFAULT 0,
    receptions INTEGER NOT NULL DEFAULT 0,
    rec_yards INTEGER NOT NULL DEFAULT 0,
    rec_td INTEGER NOT NULL DEFAULT 0,
    rec_long INTEGER,
    rec_first_downs INTEGER NOT NULL DEFAULT 0,
    rec_air_yards INTEGER NOT NULL DEFAULT 0,
    rec_yac_yards INTEGER NOT NULL DEFAULT 0,
    rec_fumbles INTEGER NOT NULL DEFAULT 0,
    rec_fumbles_lost INTEGER NOT NULL DEFAULT 0,
    rec_2pt INTEGER NOT NULL DEFAULT 0,
    rec_epa_total REAL,
    rec_epa_per_target REAL,
    rec_success_rate REAL,
    def_tackles_solo INTEGER NOT NULL DEFAULT 0,
    def_tackle_assists INTEGER NOT NULL DEFAULT 0,
    def_tackles_for_loss INTEGER NOT NULL DEFAULT 0,
    def_sacks REAL NOT NULL DEFAULT 0,
    def_sack_yards REAL NOT NULL DEFAULT 0,
    def_qb_hits INTEGER NOT NULL DEFAULT 0,
    def_interceptions INTEGER NOT NULL DEFAULT 0,
    def_interception_yards INTEGER NOT NULL DEFAULT 0,
    def_pass_defended INTEGER NOT NULL DEFAULT 0,
    def_fumbles_forced INTEGER NOT NULL DEFAULT 0,
    def_tds INTEGER NOT NULL DEFAULT 0,
    punt_returns INTEGER NOT NULL DEFAULT 0,
    punt_return_yards INTEGER NOT NULL DEFAULT 0,
    kickoff_returns INTEGER NOT NULL DEFAULT 0,
    kickoff_return_yards INTEGER NOT NULL DEFAULT 0,
    special_teams_tds INTEGER NOT NULL DEFAULT 0,
    fg_made INTEGER NOT NULL DEFAULT 0,
    fg_att INTEGER NOT NULL DEFAULT 0,
    fg_long INTEGER,
    pat_made INTEGER NOT NULL DEFAULT 0,
    pat_att INTEGER NOT NULL DEFAULT 0,
    team_pass_att INTEGER,
    team_rush_att INTEGER,
    team_targets INTEGER,
    team_air_yards INTEGER,
    target_share REAL,
    air_yards_share REAL,
    rush_attempt_share REAL,
    fantasy_points REAL NOT NULL DEFAULT 0,
    fantasy_points_ppr REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (player_id, game_id)
)
"#;

const CREATE_TEAM_GAME_STATS: &str = r#"
CREATE TABLE IF NOT EXISTS team_game_stats (
    id TEXT PRIMARY KEY,
    game_id TEXT NOT NULL,
    team_id TEXT NOT NULL,
    opponent_team_id TEXT NOT NULL,
    season INTEGER NOT NULL DEFAULT 0,
    week INTEGER NOT NULL DEFAULT 0,
    season_type TEXT NOT NULL,
    home_away TEXT NOT NULL,
    points_for INTEGER,
    points_against INTEGER,
    point_diff INTEGER GENERATED ALWAYS AS (points_for - points_against) STORED,
    result TEXT,
    total_plays INTEGER NOT NULL DEFAULT 0,
    total_drives INTEGER NOT NULL DEFAULT 0,
    completions INTEGER NOT NULL DEFAULT 0,
    attempts INTEGER NOT NULL DEFAULT 0,
    passing_yards INTEGER NOT NULL DEFAULT 0,
    passing_tds INTEGER NOT NULL DEFAULT 0,
    passing_interceptions INTEGER NOT NULL DEFAULT 0,
    sacks_suffered INTEGER NOT NULL DEFAULT 0,
    sack_yards_lost INTEGER NOT NULL DEFAULT 0,
    sack_fumbles INTEGER NOT NULL DEFAULT 0,
    sack_fumbles_lost INTEGER NOT NULL DEFAULT 0,
    passing_air_yards INTEGER NOT NULL DEFAULT 0,
    passing_yards_after_catch INTEGER NOT NULL DEFAULT 0,
    passing_first_downs INTEGER NOT NULL DEFAULT 0,
    passing_epa REAL,
    passing_cpoe REAL,
    passing_2pt_conversions INTEGER NOT NULL DEFAULT 0,
    pass_yards_per_att REAL,
    pass_epa_per_play REAL,
    pass_success_rate REAL,
    dropbacks INTEGER NOT NULL DEFAULT 0,
    neutral_pass_rate REAL,
    carries INTEGER NOT NULL DEFAULT 0,
    rushing_yards INTEGER NOT NULL DEFAULT 0,
    rushing_tds INTEGER NOT NULL DEFAULT 0,
    rushing_fumbles INTEGER NOT NULL DEFAULT 0,
    rushing_fumbles_lost INTEGER NOT NULL DEFAULT 0,
    rushing_first_downs INTEGER NOT NULL DEFAULT 0,
    rushing_epa REAL,
    rushing_2pt_conversions INTEGER NOT NULL DEFAULT 0,
    rush_yards_per_carry REAL,
    rush_epa_per_carry REAL,
    rush_success_rate REAL,
    receptions INTEGER NOT NULL DEFAULT 0,
    targets INTEGER NOT NULL DEFAULT 0,
    receiving_yards INTEGER NOT NULL DEFAULT 0,
    receiving_tds INTEGER NOT NULL DEFAULT 0,
    receiving_fumbles INTEGER NOT NULL DEFAULT 0,
    receiving_fumbles_lost INTEGER NOT NULL DEFAULT 0,
    receiving_air_yards INTEGER NOT NULL DEFAULT 0,
    receiving_yards_after_catch INTEGER NOT NULL DEFAULT 0,
    receiving_first_downs INTEGER NOT NULL DEFAULT 0,
    receiving_epa REAL,
    receiving_2pt_conversions INTEGER NOT NULL DEFAULT 0,
    def_tackles_solo INTEGER NOT NULL DEFAULT 0,
    def_tackles_with_assist INTEGER NOT NULL DEFAULT 0,
    def_tackle_assists INTEGER NOT NULL DEFAULT 0,
    def_tackles_for_loss INTEGER NOT NULL DEFAULT 0,
    def_tackles_for_loss_yards INTEGER NOT NULL DEFAULT 0,
    def_fumbles_forced INTEGER NOT NULL DEFAULT 0,
    def_sacks REAL NOT NULL DEFAULT 0,
    def_sack_yards INTEGER NOT NULL DEFAULT 0,
    def_qb_hits INTEGER NOT NULL DEFAULT 0,
    def_interceptions INTEGER NOT NULL DEFAULT 0,
    def_interception_yards INTEGER NOT NULL DEFAULT 0,
    def_pass_defended INTEGER NOT NULL DEFAULT 0,
    def_tds INTEGER NOT NULL DEFAULT 0,
    def_safeties INTEGER NOT NULL DEFAULT 0,
    def_fumbles INTEGER NOT NULL DEFAULT 0,
    defense_epa_total REAL,
    defense_epa_per_play REAL,
    fumble_recovery_own INTEGER NOT NULL DEFAULT 0,
    fumble_recovery_yards_own INTEGER NOT NULL DEFAULT 0,
    fumble_recovery_opp INTEGER NOT NULL DEFAULT 0,
    fumble_recovery_yards_opp INTEGER NOT NULL DEFAULT 0,
    fumble_recovery_tds INTEGER NOT NULL DEFAULT 0,
    misc_yards INTEGER NOT NULL DEFAULT 0,
    penalties INTEGER NOT NULL DEFAULT 0,
    penalty_yards INTEGER NOT NULL DEFAULT 0,
    timeouts INTEGER NOT NULL DEFAULT 0,
    punt_returns INTEGER NOT NULL DEFAULT 0,
    punt_return_yards INTEGER NOT NULL DEFAULT 0,
    kickoff_returns INTEGER NOT NULL DEFAULT 0,
    kickoff_return_yards INTEGER NOT NULL DEFAULT 0,
    special_teams_tds INTEGER NOT NULL DEFAULT 0,
    fg_made INTEGER NOT NULL DEFAULT 0,
    fg_att INTEGER NOT NULL DEFAULT 0,
    fg_missed INTEGER NOT NULL DEFAULT 0,
    fg_blocked INTEGER NOT NULL DEFAULT 0,
    fg_long INTEGER,
    fg_pct REAL,
    fg_made_0_19 INTEGER NOT NULL DEFAULT 0,
    fg_made_20_29 INTEGER NOT NULL DEFAULT 0,
    fg_made_30_39 INTEGER NOT NULL DEFAULT 0,
    fg_made_40_49 INTEGER NOT NULL DEFAULT 0,
    fg_made_50_59 INTEGER NOT NULL DEFAULT 0,
    fg_made_60_ INTEGER NOT NULL DEFAULT 0,
    fg_missed_0_19 INTEGER NOT NULL DEFAULT 0,
    fg_missed_20_29 INTEGER NOT NULL DEFAULT 0,
    fg_missed_30_39 INTEGER NOT NULL DEFAULT 0,
    fg_missed_40_49 INTEGER NOT NULL DEFAULT 0,
    fg_missed_50_59 INTEGER NOT NULL DEFAULT 0,
    fg_missed_60_ INTEGER NOT NULL DEFAULT 0,
    fg_blocked_0_19 INTEGER NOT NULL DEFAULT 0,
    fg_blocked_20_29 INTEGER NOT NULL DEFAULT 0,
    fg_blocked_30_39 INTEGER NOT NULL DEFAULT 0,
    fg_blocked_40_49 INTEGER NOT NULL DEFAULT 0,
    fg_blocked_50_59 INTEGER NOT NULL DEFAULT 0,
    fg_blocked_60_ INTEGER NOT NULL DEFAULT 0,
    fg_made_list TEXT,
    fg_missed_list TEXT,
    fg_blocked_list TEXT,
    fg_made_distance INTEGER,
    fg_missed_distance INTEGER,
    fg_blocked_distance INTEGER,
    gwfg_made INTEGER NOT NULL DEFAULT 0,
    gwfg_att INTEGER NOT NULL DEFAULT 0,
    gwfg_missed INTEGER NOT NULL DEFAULT 0,
    gwfg_blocked INTEGER NOT NULL DEFAULT 0,
    gwfg_distance INTEGER,
    pat_made INTEGER NOT NULL DEFAULT 0,
    pat_att INTEGER NOT NULL DEFAULT 0,
    pat_missed INTEGER NOT NULL DEFAULT 0,
    pat_blocked INTEGER NOT NULL DEFAULT 0,
    pat_pct REAL,
    pat_made_0_19 INTEGER NOT NULL DEFAULT 0,
    pat_made_20_29 INTEGER NOT NULL DEFAULT 0,
    pat_made_30_39 INTEGER NOT NULL DEFAULT 0,
    pat_made_40_49 INTEGER NOT NULL DEFAULT 0,
    pat_made_50_59 INTEGER NOT NULL DEFAULT 0,
    pat_made_60_ INTEGER NOT NULL DEFAULT 0,
    pat_missed_0_19 INTEGER NOT NULL DEFAULT 0,
    pat_missed_20_29 INTEGER NOT NULL DEFAULT 0,
    pat_missed_30_39 INTEGER NOT NULL DEFAULT 0,
    pat_missed_40_49 INTEGER NOT NULL DEFAULT 0,
    pat_missed_50_59 INTEGER NOT NULL DEFAULT 0,
    pat_missed_60_ INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (team_id, game_id)
)
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::services::engine::aggregate_game;
    use crate::services::fixtures::{input, run, sample_plays, GAME_ID};
    use chrono::{TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_database_with_pool(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_persist_and_read_back() {
        let pool = memory_pool().await;
        let now = Utc.with_ymd_and_hms(2024, 9, 9, 3, 0, 0).unwrap();
        let report = aggregate_game(&input(sample_plays()), &EngineConfig::default(), now);
        persist_report(&pool, &report).await.unwrap();

        let stored = get_player_game_stats(&pool, "qb_kc").await.unwrap();
        assert_eq!(stored.len(), 1);
        let expected = report
            .player_rows
            .iter()
            .find(|r| r.player_id == "qb_kc")
            .unwrap();
        assert_eq!(&stored[0], expected);

        let teams = get_game_team_stats(&pool, GAME_ID).await.unwrap();
        assert_eq!(teams.len(), 2);
        let kc = teams.iter().find(|t| t.team_id == "KC").unwrap();
        assert_eq!(kc.point_diff, Some(7));
        assert_eq!(kc.result, report.team_rows.iter().find(|t| t.team_id == "KC").unwrap().result);
    }

    #[tokio::test]
    async fn test_recompute_replaces_rows() {
        let pool = memory_pool().await;
        let first = Utc.with_ymd_and_hms(2024, 9, 9, 3, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 9, 10, 3, 0, 0).unwrap();

        let report = aggregate_game(&input(sample_plays()), &EngineConfig::default(), first);
        persist_report(&pool, &report).await.unwrap();

        let corrected = aggregate_game(
            &input(vec![run(1, "KC", "rb_kc", 11)]),
            &EngineConfig::default(),
            second,
        );
        persist_report(&pool, &corrected).await.unwrap();

        let rb = get_player_game_stats(&pool, "rb_kc").await.unwrap();
        assert_eq!(rb.len(), 1);
        assert_eq!(rb[0].rush_att, 1);
        assert_eq!(rb[0].rush_yards, 11);
        assert_eq!(rb[0].created_at, first);
        assert_eq!(rb[0].updated_at, second);

        // Players the corrected stream no longer credits are gone.
        assert!(get_player_game_stats(&pool, "qb_kc").await.unwrap().is_empty());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM team_game_stats")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_failed_report_is_not_persisted() {
        let pool = memory_pool().await;
        let mut missing = input(Vec::new());
        missing.plays = None;
        let report = aggregate_game(&missing, &EngineConfig::default(), Utc::now());
        persist_report(&pool, &report).await.unwrap();
        assert!(get_team_game_stats(&pool, "KC").await.unwrap().is_empty());
    }
}
