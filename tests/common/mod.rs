#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use diesel::SqliteConnection;
use prediction_league::admin::ConfiguredAdmins;
use prediction_league::db::{establish, run_migrations};
use prediction_league::models::fixtures::{Fixture, NewFixture};
use prediction_league::models::stages::{Stage, StageKind};
use prediction_league::models::users::{Identity, User};

pub const ADMIN: &str = "admin|1";

pub fn start_db() -> Result<SqliteConnection, anyhow::Error> {
    let mut db = establish(":memory:")?;
    run_migrations(&mut db)?;
    Ok(db)
}

pub fn admins() -> ConfiguredAdmins {
    ConfiguredAdmins::new(vec![ADMIN.to_string()])
}

/// 2026-06-11T19:00:00Z, the opening match
pub fn opening_kickoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 11, 19, 0, 0).unwrap()
}

pub fn before_kickoff() -> DateTime<Utc> {
    opening_kickoff() - Duration::hours(2)
}

pub fn user(id: &str, db: &mut SqliteConnection) -> Result<User, anyhow::Error> {
    Ok(User::sync_identity(
        &Identity {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            display_name: id.to_string(),
        },
        db,
    )?)
}

/// group stage fixture `match_number`, kicking off that many days after the opener
pub fn group_fixture(match_number: i32, db: &mut SqliteConnection) -> Result<Fixture, anyhow::Error> {
    let stage = Stage::get_by_kind(StageKind::Group, db)?
        .ok_or(anyhow::anyhow!("Group stage not seeded"))?;
    let when = opening_kickoff() + Duration::days((match_number - 1) as i64);
    Ok(NewFixture::new(match_number, &stage, &when).save(db)?)
}
