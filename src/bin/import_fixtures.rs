use anyhow::anyhow;
use chrono::DateTime;
use clap::Parser;
use diesel::SqliteConnection;
use prediction_league::db::{raw_diesel_cxn_from_env, run_migrations};
use prediction_league::models::fixtures::NewFixture;
use prediction_league::models::stages::{Stage, StageKind};
use prediction_league::models::teams::{NewTeam, Team};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load fixtures from a CSV file")]
struct Args {
    /// columns: match_number,stage,home,away,home_group,away_group,kickoff
    #[arg(short, long)]
    file: PathBuf,
}

#[derive(Debug, serde::Deserialize)]
struct FixtureRow {
    match_number: i32,
    stage: String,
    home: String,
    away: String,
    home_group: Option<String>,
    away_group: Option<String>,
    /// RFC 3339
    kickoff: String,
}

/// `?Winner Group A` style cells are placeholders, anything else is a team name
enum Side {
    Team(Team),
    Placeholder(String),
}

fn side(cell: &str, group: Option<&str>, conn: &mut SqliteConnection) -> anyhow::Result<Side> {
    let cell = cell.trim();
    if let Some(label) = cell.strip_prefix('?') {
        return Ok(Side::Placeholder(label.trim().to_string()));
    }
    if cell.is_empty() {
        return Err(anyhow!("Empty team cell"));
    }
    match Team::get_by_name(cell, conn)? {
        Some(t) => Ok(Side::Team(t)),
        None => {
            let group = group.map(str::trim).filter(|g| !g.is_empty());
            let t = NewTeam::new(cell, group).save(conn)?;
            println!("Added team {} ({:?})", t.name, t.group_label);
            Ok(Side::Team(t))
        }
    }
}

fn import_row(row: &FixtureRow, conn: &mut SqliteConnection) -> anyhow::Result<()> {
    let kind =
        StageKind::from_slug(row.stage.trim()).ok_or(anyhow!("Unknown stage {}", row.stage))?;
    let stage = Stage::get_by_kind(kind, conn)?.ok_or(anyhow!("Stage {} is not seeded", row.stage))?;
    let kickoff = DateTime::parse_from_rfc3339(row.kickoff.trim())?;
    let home = side(&row.home, row.home_group.as_deref(), conn)?;
    let away = side(&row.away, row.away_group.as_deref(), conn)?;

    let mut nf = NewFixture::new(row.match_number, &stage, &kickoff);
    let mut placeholders = (None, None);
    match home {
        Side::Team(t) => nf = nf.with_home_team(&t),
        Side::Placeholder(p) => placeholders.0 = Some(p),
    }
    match away {
        Side::Team(t) => nf = nf.with_away_team(&t),
        Side::Placeholder(p) => placeholders.1 = Some(p),
    }
    let f = nf.with_placeholders(placeholders.0, placeholders.1).save(conn)?;
    println!("Added fixture {} (match {})", f.id, f.match_number);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let mut db = raw_diesel_cxn_from_env()?;
    run_migrations(&mut db)?;

    let mut rdr = csv::Reader::from_path(&args.file)?;
    let rows = rdr
        .deserialize::<FixtureRow>()
        .collect::<Result<Vec<_>, _>>()?;
    db.immediate_transaction(|c| {
        for row in &rows {
            import_row(row, c).map_err(|e| anyhow!("match {}: {e}", row.match_number))?;
        }
        Ok::<_, anyhow::Error>(())
    })?;
    println!("Imported {} fixtures", rows.len());
    Ok(())
}
