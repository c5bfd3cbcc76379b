use crate::models::predictions::Outcome;
use crate::models::stages::Stage;
use crate::models::teams::Team;
use crate::schema::fixtures;
use crate::utils::timestamp_to_datetime;
use crate::{save_fn, update_fn, PredictionError};
use chrono::{DateTime, TimeZone, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use serde::Serialize;

#[derive(serde::Serialize, serde::Deserialize, Eq, PartialEq, Debug, Clone, Copy)]
pub enum FixtureStatus {
    Scheduled,
    Live,
    Finished,
}

impl FixtureStatus {
    fn to_column(self) -> String {
        serde_json::to_string(&self).unwrap_or("Unknown".to_string())
    }
}

#[derive(Queryable, Identifiable, AsChangeset, Debug, Serialize, Clone)]
#[diesel(treat_none_as_null = true)]
pub struct Fixture {
    pub id: i32,
    pub match_number: i32,
    pub stage_id: i32,
    pub home_team_id: Option<i32>,
    pub away_team_id: Option<i32>,
    pub home_placeholder: Option<String>,
    pub away_placeholder: Option<String>,
    pub scheduled_at: i64,
    status: String,
    home_score: Option<i32>,
    away_score: Option<i32>,
    home_penalties: Option<i32>,
    away_penalties: Option<i32>,
}

/// narrows [Fixture::list]; every field left as None matches everything
#[derive(Default, Debug, Clone)]
pub struct FixtureFilter {
    pub stage_id: Option<i32>,
    pub status: Option<FixtureStatus>,
}

impl Fixture {
    pub fn get_by_id(id: i32, conn: &mut SqliteConnection) -> Result<Option<Self>, diesel::result::Error> {
        fixtures::table.find(id).first(conn).optional()
    }

    /// like [Fixture::get_by_id] but missing fixtures are a [PredictionError::NotFound]
    pub fn get(id: i32, conn: &mut SqliteConnection) -> Result<Self, PredictionError> {
        Self::get_by_id(id, conn)?.ok_or_else(|| PredictionError::not_found("Fixture", id))
    }

    /// ordered by kickoff, then match number
    pub fn list(
        filter: &FixtureFilter,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        let mut q = fixtures::table.into_boxed();
        if let Some(sid) = filter.stage_id {
            q = q.filter(fixtures::stage_id.eq(sid));
        }
        if let Some(st) = filter.status {
            q = q.filter(fixtures::status.eq(st.to_column()));
        }
        q.order((fixtures::scheduled_at.asc(), fixtures::match_number.asc()))
            .load(conn)
    }

    /// scheduled fixtures kicking off at or before `cutoff`
    pub fn scheduled_starting_before(
        cutoff: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        fixtures::table
            .filter(fixtures::status.eq(FixtureStatus::Scheduled.to_column()))
            .filter(fixtures::scheduled_at.le(cutoff))
            .order(fixtures::scheduled_at.asc())
            .load(conn)
    }

    /// An unparseable status column means the row was written by something other than us;
    /// treating it as not-scheduled keeps it closed for predictions.
    pub fn status(&self) -> FixtureStatus {
        serde_json::from_str(&self.status).unwrap_or(FixtureStatus::Live)
    }

    pub fn is_scheduled(&self) -> bool {
        self.status() == FixtureStatus::Scheduled
    }

    pub fn is_finished(&self) -> bool {
        self.status() == FixtureStatus::Finished
    }

    pub fn kickoff(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.scheduled_at)
    }

    /// (home, away) as entered so far; may be partial while live
    pub fn scores(&self) -> (Option<i32>, Option<i32>) {
        (self.home_score, self.away_score)
    }

    pub fn penalties(&self) -> Option<(i32, i32)> {
        self.home_penalties.zip(self.away_penalties)
    }

    /// the result, only once the fixture is finished with both scores in
    pub fn final_score(&self) -> Option<(i32, i32)> {
        if !self.is_finished() {
            return None;
        }
        self.home_score.zip(self.away_score)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.final_score().map(|(h, a)| Outcome::from_scores(h, a))
    }

    pub fn stage(&self, conn: &mut SqliteConnection) -> Result<Stage, PredictionError> {
        Stage::get_by_id(self.stage_id, conn)?
            .ok_or_else(|| PredictionError::not_found("Stage", self.stage_id))
    }

    /// team names where known, otherwise the placeholder labels
    pub fn display_names(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(String, String), diesel::result::Error> {
        let name_for = |team_id: Option<i32>,
                        placeholder: &Option<String>,
                        conn: &mut SqliteConnection|
         -> Result<String, diesel::result::Error> {
            if let Some(tid) = team_id {
                if let Some(team) = Team::get_by_id(tid, conn)? {
                    return Ok(team.name);
                }
            }
            Ok(placeholder.clone().unwrap_or("TBD".to_string()))
        };
        Ok((
            name_for(self.home_team_id, &self.home_placeholder, conn)?,
            name_for(self.away_team_id, &self.away_placeholder, conn)?,
        ))
    }

    pub(crate) fn set_status(&mut self, status: FixtureStatus) {
        self.status = status.to_column();
    }

    pub(crate) fn set_scores(&mut self, home: Option<i32>, away: Option<i32>) {
        self.home_score = home;
        self.away_score = away;
    }

    pub(crate) fn set_penalties(&mut self, penalties: Option<(i32, i32)>) {
        self.home_penalties = penalties.map(|p| p.0);
        self.away_penalties = penalties.map(|p| p.1);
    }

    update_fn! {}
}

#[derive(Insertable)]
#[diesel(table_name=fixtures)]
pub struct NewFixture {
    match_number: i32,
    stage_id: i32,
    home_team_id: Option<i32>,
    away_team_id: Option<i32>,
    home_placeholder: Option<String>,
    away_placeholder: Option<String>,
    scheduled_at: i64,
    status: String,
}

impl NewFixture {
    pub fn new<T: TimeZone>(match_number: i32, stage: &Stage, kickoff: &DateTime<T>) -> Self {
        Self {
            match_number,
            stage_id: stage.id,
            home_team_id: None,
            away_team_id: None,
            home_placeholder: None,
            away_placeholder: None,
            scheduled_at: kickoff.timestamp(),
            status: FixtureStatus::Scheduled.to_column(),
        }
    }

    pub fn with_teams(mut self, home: &Team, away: &Team) -> Self {
        self.home_team_id = Some(home.id);
        self.away_team_id = Some(away.id);
        self
    }

    pub fn with_home_team(mut self, home: &Team) -> Self {
        self.home_team_id = Some(home.id);
        self
    }

    pub fn with_away_team(mut self, away: &Team) -> Self {
        self.away_team_id = Some(away.id);
        self
    }

    pub fn with_placeholders<S: Into<String>>(mut self, home: Option<S>, away: Option<S>) -> Self {
        self.home_placeholder = home.map(Into::into);
        self.away_placeholder = away.map(Into::into);
        self
    }

    save_fn!(fixtures::table, Fixture);
}

#[cfg(test)]
mod tests {
    use super::{Fixture, FixtureFilter, FixtureStatus, NewFixture};
    use crate::models::stages::{Stage, StageKind};
    use crate::models::teams::NewTeam;
    use crate::test_utils::{kickoff, setup_db};

    #[test]
    fn test_serialize() {
        assert_eq!(
            r#""Scheduled""#.to_string(),
            serde_json::to_string(&FixtureStatus::Scheduled).unwrap()
        );
    }

    #[test]
    fn test_new_fixture_is_scheduled_without_scores() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let stage = Stage::get_by_kind(StageKind::Group, &mut db)?.unwrap();
        let f = NewFixture::new(1, &stage, &kickoff()).save(&mut db)?;
        assert!(f.is_scheduled());
        assert_eq!((None, None), f.scores());
        assert_eq!(None, f.final_score());
        assert_eq!(kickoff(), f.kickoff());
        Ok(())
    }

    #[test]
    fn test_display_names_fall_back_to_placeholders() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let stage = Stage::get_by_kind(StageKind::RoundOf32, &mut db)?.unwrap();
        let mexico = NewTeam::new("Mexico", Some("A")).save(&mut db)?;
        let f = NewFixture::new(73, &stage, &kickoff())
            .with_home_team(&mexico)
            .with_placeholders(None, Some("Runner-up Group B"))
            .save(&mut db)?;
        assert_eq!(
            ("Mexico".to_string(), "Runner-up Group B".to_string()),
            f.display_names(&mut db)?
        );
        Ok(())
    }

    #[test]
    fn test_list_filters() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let group = Stage::get_by_kind(StageKind::Group, &mut db)?.unwrap();
        let final_ = Stage::get_by_kind(StageKind::Final, &mut db)?.unwrap();
        NewFixture::new(1, &group, &kickoff()).save(&mut db)?;
        NewFixture::new(104, &final_, &kickoff()).save(&mut db)?;
        let mut finished = NewFixture::new(2, &group, &kickoff()).save(&mut db)?;
        finished.set_status(FixtureStatus::Finished);
        finished.set_scores(Some(1), Some(0));
        finished.update(&mut db)?;

        assert_eq!(3, Fixture::list(&FixtureFilter::default(), &mut db)?.len());
        let groups = Fixture::list(
            &FixtureFilter {
                stage_id: Some(group.id),
                status: None,
            },
            &mut db,
        )?;
        assert_eq!(vec![1, 2], groups.iter().map(|f| f.match_number).collect::<Vec<_>>());
        let done = Fixture::list(
            &FixtureFilter {
                stage_id: None,
                status: Some(FixtureStatus::Finished),
            },
            &mut db,
        )?;
        assert_eq!(1, done.len());
        assert_eq!(Some((1, 0)), done[0].final_score());
        Ok(())
    }
}
