use chrono::{DateTime, TimeZone, Utc};
use diesel::SqliteConnection;

use crate::db::{establish, run_migrations};
use crate::models::fixtures::{Fixture, FixtureStatus, NewFixture};
use crate::models::stages::{Stage, StageKind};
use crate::models::users::{NewUser, User};

pub fn setup_db() -> Result<SqliteConnection, anyhow::Error> {
    let mut db = establish(":memory:")?;
    run_migrations(&mut db)?;
    Ok(db)
}

/// 2026-06-11T19:00:00Z
pub fn kickoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 11, 19, 0, 0).unwrap()
}

pub fn new_user(id: &str, db: &mut SqliteConnection) -> Result<User, anyhow::Error> {
    Ok(NewUser::new(id.to_string(), format!("{id}@example.com"), id.to_string()).save(db)?)
}

pub fn fixture_in(
    kind: StageKind,
    match_number: i32,
    when: DateTime<Utc>,
    db: &mut SqliteConnection,
) -> Result<Fixture, anyhow::Error> {
    let stage =
        Stage::get_by_kind(kind, db)?.ok_or(anyhow::anyhow!("Stage {kind:?} wasn't seeded"))?;
    Ok(NewFixture::new(match_number, &stage, &when).save(db)?)
}

/// a group stage fixture kicking off at [kickoff]
pub fn scheduled_fixture(match_number: i32, db: &mut SqliteConnection) -> Result<Fixture, anyhow::Error> {
    fixture_in(StageKind::Group, match_number, kickoff(), db)
}

pub fn finish_fixture(
    fixture: &mut Fixture,
    home: i32,
    away: i32,
    db: &mut SqliteConnection,
) -> Result<(), anyhow::Error> {
    fixture.set_status(FixtureStatus::Finished);
    fixture.set_scores(Some(home), Some(away));
    fixture.update(db)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{new_user, setup_db};
    use diesel::dsl::count;
    use diesel::prelude::*;

    #[test]
    fn test_database_init() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        new_user("u1", &mut db)?;
        let count = crate::schema::users::table
            .select(count(crate::schema::users::id))
            .get_result::<i64>(&mut db)?;
        assert_eq!(1, count);
        Ok(())
    }

    #[test]
    fn test_database_init_is_isolated() -> anyhow::Result<()> {
        // this is just a separate test to make sure that the user created in the previous test doesn't carry over
        let mut db = setup_db()?;
        new_user("u1", &mut db)?;
        let count = crate::schema::users::table
            .select(count(crate::schema::users::id))
            .get_result::<i64>(&mut db)?;
        assert_eq!(1, count);
        Ok(())
    }
}
