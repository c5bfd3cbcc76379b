//! Turning a finished fixture's result into points.
//!
//! Per prediction: 3 for the exact score, 1 for the right outcome, 0 otherwise. The stage
//! multiplier is not applied. Every points change reaches the user's total as a delta
//! through [User::adjust_total].

use crate::admin::{require_admin, AdminAuthority};
use crate::models::fixtures::Fixture;
use crate::models::predictions::{Outcome, Prediction};
use crate::models::users::User;
use crate::PredictionError;
use diesel::SqliteConnection;
use log::{debug, info};

pub const EXACT_SCORE_POINTS: i32 = 3;
pub const CORRECT_OUTCOME_POINTS: i32 = 1;

pub fn points_for(predicted: (i32, i32), actual: (i32, i32)) -> i32 {
    if predicted == actual {
        EXACT_SCORE_POINTS
    } else if Outcome::from_scores(predicted.0, predicted.1)
        == Outcome::from_scores(actual.0, actual.1)
    {
        CORRECT_OUTCOME_POINTS
    } else {
        0
    }
}

/// What to add to a total when a prediction's points go from `previous` to `points`.
/// Unscored (None) counts as 0.
pub fn points_delta(previous: Option<i32>, points: i32) -> i32 {
    points - previous.unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringPass {
    /// right after the fixture finishes; nothing on it may have been scored yet
    Initial,
    /// re-scoring after a result change; prior points are compensated
    Correction,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScoringSummary {
    pub scored: usize,
    /// net change across all affected user totals
    pub total_delta: i64,
}

/// Scores every prediction on the fixture. Runs inside the caller's transaction.
pub(crate) fn score_predictions(
    fixture: &Fixture,
    pass: ScoringPass,
    conn: &mut SqliteConnection,
) -> Result<ScoringSummary, PredictionError> {
    let actual = fixture
        .final_score()
        .ok_or(PredictionError::NotReady(fixture.id))?;
    let mut summary = ScoringSummary::default();
    for mut prediction in Prediction::for_fixture(fixture.id, conn)? {
        let previous = match pass {
            ScoringPass::Initial => {
                if prediction.points_earned().is_some() {
                    return Err(PredictionError::ContractViolation(format!(
                        "Prediction {} on fixture {} was already scored",
                        prediction.id, fixture.id
                    )));
                }
                None
            }
            ScoringPass::Correction => prediction.points_earned(),
        };
        let points = points_for(prediction.scores(), actual);
        let delta = points_delta(previous, points);
        prediction.save_points(points, conn)?;
        if delta != 0 {
            User::adjust_total(&prediction.user_id, delta, conn)?;
        }
        debug!(
            "Prediction {} ({}): {points} points, delta {delta}",
            prediction.id, prediction.user_id
        );
        summary.scored += 1;
        summary.total_delta += delta as i64;
    }
    info!(
        "Scored fixture {} ({:?}): {} predictions, net {} points",
        fixture.id, pass, summary.scored, summary.total_delta
    );
    Ok(summary)
}

fn score_in_transaction(
    fixture_id: i32,
    pass: ScoringPass,
    conn: &mut SqliteConnection,
) -> Result<usize, PredictionError> {
    conn.immediate_transaction(|c| {
        let fixture = Fixture::get(fixture_id, c)?;
        score_predictions(&fixture, pass, c).map(|s| s.scored)
    })
}

/// First scoring of a finished fixture. Refuses to run over predictions that already have
/// points; use [rescore_fixture] for those.
pub fn score_fixture(
    admins: &dyn AdminAuthority,
    actor: &str,
    fixture_id: i32,
    conn: &mut SqliteConnection,
) -> Result<usize, PredictionError> {
    require_admin(admins, actor)?;
    score_in_transaction(fixture_id, ScoringPass::Initial, conn)
}

/// Re-scores a finished fixture, moving each user's total by the difference only. Running it
/// any number of times leaves totals where a single scoring would.
pub fn rescore_fixture(
    admins: &dyn AdminAuthority,
    actor: &str,
    fixture_id: i32,
    conn: &mut SqliteConnection,
) -> Result<usize, PredictionError> {
    require_admin(admins, actor)?;
    score_in_transaction(fixture_id, ScoringPass::Correction, conn)
}
