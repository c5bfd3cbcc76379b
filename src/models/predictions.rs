use crate::schema::{fixtures, predictions};
use crate::{delete_fn, PredictionError};
use diesel::prelude::*;
use diesel::SqliteConnection;
use serde::Serialize;
use std::cmp::Ordering;

/// Predicted scores are accepted in `0..=MAX_PREDICTED_SCORE`
pub const MAX_PREDICTED_SCORE: i32 = 20;

#[derive(serde::Serialize, serde::Deserialize, Eq, PartialEq, Debug, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn from_scores(home: i32, away: i32) -> Self {
        match home.cmp(&away) {
            Ordering::Greater => Outcome::Home,
            Ordering::Equal => Outcome::Draw,
            Ordering::Less => Outcome::Away,
        }
    }

    fn to_column(self) -> String {
        serde_json::to_string(&self).unwrap_or("Unknown".to_string())
    }
}

pub fn validate_predicted_score(score: i32) -> Result<i32, PredictionError> {
    if (0..=MAX_PREDICTED_SCORE).contains(&score) {
        Ok(score)
    } else {
        Err(PredictionError::InvalidInput(format!(
            "Score must be between 0 and {MAX_PREDICTED_SCORE}, got {score}"
        )))
    }
}

#[derive(Queryable, Identifiable, AsChangeset, Debug, Serialize, Clone)]
#[diesel(treat_none_as_null = true)]
pub struct Prediction {
    pub id: i32,
    pub user_id: String,
    pub fixture_id: i32,
    home_score: i32,
    away_score: i32,
    // always Outcome::from_scores(home_score, away_score), only ever written by set_scores
    outcome: String,
    is_locked: bool,
    points_earned: Option<i32>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Prediction {
    pub fn get_by_id(id: i32, conn: &mut SqliteConnection) -> Result<Option<Self>, diesel::result::Error> {
        predictions::table.find(id).first(conn).optional()
    }

    pub fn get(id: i32, conn: &mut SqliteConnection) -> Result<Self, PredictionError> {
        Self::get_by_id(id, conn)?.ok_or_else(|| PredictionError::not_found("Prediction", id))
    }

    pub fn for_user_and_fixture(
        user_id: &str,
        fixture_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Self>, diesel::result::Error> {
        predictions::table
            .filter(predictions::user_id.eq(user_id))
            .filter(predictions::fixture_id.eq(fixture_id))
            .first(conn)
            .optional()
    }

    pub fn for_fixture(
        fixture_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        predictions::table
            .filter(predictions::fixture_id.eq(fixture_id))
            .order(predictions::id.asc())
            .load(conn)
    }

    pub fn for_fixtures(
        fixture_ids: &[i32],
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        predictions::table
            .filter(predictions::fixture_id.eq_any(fixture_ids))
            .load(conn)
    }

    /// a user's predictions in kickoff order
    pub fn for_user(
        user_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        predictions::table
            .inner_join(fixtures::table)
            .filter(predictions::user_id.eq(user_id))
            .order((fixtures::scheduled_at.asc(), fixtures::match_number.asc()))
            .select(predictions::all_columns)
            .load(conn)
    }

    pub fn count_for_user_in_stage(
        user_id: &str,
        stage_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<i64, diesel::result::Error> {
        predictions::table
            .inner_join(fixtures::table)
            .filter(predictions::user_id.eq(user_id))
            .filter(fixtures::stage_id.eq(stage_id))
            .count()
            .get_result(conn)
    }

    /// sets the persisted lock flag on every unlocked prediction for the fixture.
    /// returns how many rows changed
    pub fn lock_all_for_fixture(
        fixture_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(
            predictions::table
                .filter(predictions::fixture_id.eq(fixture_id))
                .filter(predictions::is_locked.eq(false)),
        )
        .set(predictions::is_locked.eq(true))
        .execute(conn)
    }

    pub fn count(conn: &mut SqliteConnection) -> Result<i64, diesel::result::Error> {
        predictions::table.count().get_result(conn)
    }

    pub fn delete_all(conn: &mut SqliteConnection) -> Result<usize, diesel::result::Error> {
        diesel::delete(predictions::table).execute(conn)
    }
}

impl Prediction {
    pub fn scores(&self) -> (i32, i32) {
        (self.home_score, self.away_score)
    }

    pub fn outcome(&self) -> Outcome {
        serde_json::from_str(&self.outcome)
            .unwrap_or_else(|_| Outcome::from_scores(self.home_score, self.away_score))
    }

    /// Just the persisted flag. Whether the prediction may still change also depends on the
    /// fixture and the clock, see [crate::locking::is_locked].
    pub fn lock_flag(&self) -> bool {
        self.is_locked
    }

    pub fn points_earned(&self) -> Option<i32> {
        self.points_earned
    }

    pub(crate) fn set_scores(&mut self, home: i32, away: i32) {
        self.home_score = home;
        self.away_score = away;
        self.outcome = Outcome::from_scores(home, away).to_column();
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.is_locked = locked;
    }

    pub(crate) fn set_points(&mut self, points: Option<i32>) {
        self.points_earned = points;
    }

    /// writes only points_earned, so scoring can never touch the predicted scores
    pub(crate) fn save_points(
        &mut self,
        points: i32,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error> {
        self.points_earned = Some(points);
        diesel::update(&*self)
            .set(predictions::points_earned.eq(Some(points)))
            .execute(conn)
    }

    pub(crate) fn update(&self, conn: &mut SqliteConnection) -> Result<usize, diesel::result::Error> {
        diesel::update(self).set(self).execute(conn)
    }

    delete_fn!(predictions::table);
}

#[derive(Insertable, Debug)]
#[diesel(table_name=predictions)]
pub struct NewPrediction {
    user_id: String,
    fixture_id: i32,
    home_score: i32,
    away_score: i32,
    outcome: String,
    is_locked: bool,
    points_earned: Option<i32>,
    created_at: i64,
    updated_at: i64,
}

impl NewPrediction {
    pub fn new<S: Into<String>>(user_id: S, fixture_id: i32, home: i32, away: i32, now: i64) -> Self {
        Self {
            user_id: user_id.into(),
            fixture_id,
            home_score: home,
            away_score: away,
            outcome: Outcome::from_scores(home, away).to_column(),
            is_locked: false,
            points_earned: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Inserts, or rewrites the scores of the existing row for this (user, fixture).
    /// The unique index decides which, so two racing submissions can't make two rows.
    pub fn upsert(&self, conn: &mut SqliteConnection) -> Result<Prediction, diesel::result::Error> {
        diesel::insert_into(predictions::table)
            .values(self)
            .on_conflict((predictions::user_id, predictions::fixture_id))
            .do_update()
            .set((
                predictions::home_score.eq(self.home_score),
                predictions::away_score.eq(self.away_score),
                predictions::outcome.eq(&self.outcome),
                predictions::updated_at.eq(self.updated_at),
            ))
            .execute(conn)?;
        Prediction::for_user_and_fixture(&self.user_id, self.fixture_id, conn)?
            .ok_or(diesel::result::Error::NotFound)
    }
}
