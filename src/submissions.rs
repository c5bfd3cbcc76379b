use crate::eligibility::EligibilityGate;
use crate::locking::is_locked;
use crate::models::fixtures::Fixture;
use crate::models::predictions::{validate_predicted_score, NewPrediction, Prediction};
use crate::models::users::User;
use crate::PredictionError;
use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use log::{debug, info};

#[derive(Debug, Clone)]
pub struct PredictionSubmission {
    pub user_id: String,
    pub fixture_id: i32,
    pub home_score: i32,
    pub away_score: i32,
}

pub fn submit_prediction(
    submission: &PredictionSubmission,
    gate: Option<&EligibilityGate>,
    conn: &mut SqliteConnection,
) -> Result<Prediction, PredictionError> {
    submit_prediction_at(submission, gate, Utc::now(), conn)
}

/// Creates the user's prediction for the fixture, or rewrites it in place.
///
/// Checks, in order: the fixture exists, it is still scheduled, the scores are in range, the
/// prediction isn't locked, the eligibility gate (if any) allows it. Everything runs in one
/// IMMEDIATE transaction, so a result entered concurrently is either fully visible to these
/// checks or lands after the write.
pub fn submit_prediction_at(
    submission: &PredictionSubmission,
    gate: Option<&EligibilityGate>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Prediction, PredictionError> {
    conn.immediate_transaction(|c| {
        let fixture = Fixture::get(submission.fixture_id, c)?;
        if !fixture.is_scheduled() {
            return Err(PredictionError::FixtureNotOpen(fixture.id));
        }
        let home = validate_predicted_score(submission.home_score)?;
        let away = validate_predicted_score(submission.away_score)?;
        User::get(&submission.user_id, c)?;

        let existing = Prediction::for_user_and_fixture(&submission.user_id, fixture.id, c)?;
        let lock_flag = existing.as_ref().map_or(false, |p| p.lock_flag());
        if is_locked(lock_flag, &fixture, now) {
            debug!(
                "Rejected prediction from {} for locked fixture {}",
                submission.user_id, fixture.id
            );
            return Err(PredictionError::Locked);
        }
        if let Some(g) = gate {
            g.check(&fixture, &submission.user_id, now, c)?;
        }

        let saved =
            NewPrediction::new(&submission.user_id, fixture.id, home, away, now.timestamp())
                .upsert(c)?;
        if existing.is_some() {
            debug!(
                "{} updated prediction {} to {home}-{away}",
                submission.user_id, saved.id
            );
        } else {
            info!(
                "{} predicted {home}-{away} for fixture {}",
                submission.user_id, fixture.id
            );
        }
        Ok(saved)
    })
}
