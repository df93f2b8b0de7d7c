use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::config::EngineConfig;
use crate::db::{
    create_pool, get_player_game_stats, get_team_game_stats, init_database_with_pool,
    persist_report,
};
use crate::models::{GameInput, GameStatus};
use crate::services::StatsEngine;

/// Aggregate every game in a JSON bundle, print the per-game status report, and
/// optionally export CSV and persist the rows.
pub async fn aggregate(input: &Path, csv_dir: Option<&Path>, persist: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let games: Vec<GameInput> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse game bundle {}", input.display()))?;

    let config = EngineConfig::from_env()?;
    let mut engine = StatsEngine::new(config);

    println!("🏈 Aggregating {} games...", games.len());
    let reports = engine.process_games(&games);

    for report in &reports {
        match &report.status {
            GameStatus::Succeeded => println!(
                "✅ {}: {} player rows, {} team rows",
                report.game_id,
                report.player_rows.len(),
                report.team_rows.len()
            ),
            GameStatus::Failed { reason } => println!("❌ {}: {}", report.game_id, reason),
        }
        for warning in &report.warnings {
            println!("   ⚠️  {}", warning);
        }
    }

    if let Some(dir) = csv_dir {
        tokio::fs::create_dir_all(dir).await?;
        let players = dir.join("player_game_stats.csv");
        let teams = dir.join("team_game_stats.csv");
        write_csv(&players, engine.assembler().player_rows())?;
        write_csv(&teams, engine.assembler().team_rows())?;
        println!("📄 Wrote {} and {}", players.display(), teams.display());
    }

    if persist {
        let pool = create_pool().await?;
        init_database_with_pool(&pool).await?;
        for report in reports.iter().filter(|r| r.succeeded()) {
            persist_report(&pool, report).await?;
        }
        println!("💾 Persisted rows to the database");
    }

    let failed = reports.iter().filter(|r| !r.succeeded()).count();
    if failed > 0 {
        println!("\n⚠️  {} of {} games failed", failed, reports.len());
    }

    Ok(())
}

fn write_csv<'a, T, I>(path: &Path, rows: I) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub async fn query_player(player_id: &str) -> Result<()> {
    let pool = create_pool().await?;

    println!("🔍 Game log for player: {}", player_id);

    let rows = get_player_game_stats(&pool, player_id).await?;
    if rows.is_empty() {
        println!("❌ No games found for '{}'", player_id);
        return Ok(());
    }

    for row in rows {
        println!(
            "   {} wk{:>2} {} vs {}",
            row.season, row.week, row.team_id, row.opponent_team_id
        );
        if row.pass_att > 0 {
            println!(
                "      Passing: {}/{} {} yds {} TD {} INT, rating {}",
                row.pass_cmp,
                row.pass_att,
                row.pass_yards,
                row.pass_td,
                row.interceptions,
                fmt_opt(row.passer_rating)
            );
        }
        if row.rush_att > 0 {
            println!(
                "      Rushing: {} car {} yds {} TD",
                row.rush_att, row.rush_yards, row.rush_td
            );
        }
        if row.targets > 0 {
            println!(
                "      Receiving: {}/{} {} yds {} TD, target share {}",
                row.receptions,
                row.targets,
                row.rec_yards,
                row.rec_td,
                fmt_opt(row.target_share)
            );
        }
        println!(
            "      Fantasy: {:.1} std | {:.1} PPR",
            row.fantasy_points, row.fantasy_points_ppr
        );
    }

    Ok(())
}

pub async fn query_team(team_id: &str) -> Result<()> {
    let pool = create_pool().await?;

    println!("🔍 Game log for team: {}", team_id);

    let rows = get_team_game_stats(&pool, team_id).await?;
    if rows.is_empty() {
        println!("❌ No games found for '{}'", team_id);
        return Ok(());
    }

    for row in rows {
        let score = match (row.points_for, row.points_against) {
            (Some(pf), Some(pa)) => format!("{}-{}", pf, pa),
            _ => "(TBD)".to_string(),
        };
        let venue = match row.home_away {
            crate::models::HomeAway::Home => "vs",
            crate::models::HomeAway::Away => "at",
        };
        println!(
            "   {} wk{:>2} {} {} {}",
            row.season, row.week, venue, row.opponent_team_id, score
        );
        println!(
            "      {} plays, {} pass yds, {} rush yds, {} sacks, FG {}/{}",
            row.total_plays,
            row.passing_yards,
            row.rushing_yards,
            row.def_sacks,
            row.fg_made,
            row.fg_att
        );
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or("-".to_string(), |v| format!("{:.1}", v))
}
