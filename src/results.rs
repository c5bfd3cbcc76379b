//! Admin result entry: moving a fixture to live or finished and kicking off scoring.

use crate::admin::{require_admin, AdminAuthority};
use crate::locking::lock_fixture_predictions;
use crate::models::fixtures::{Fixture, FixtureStatus};
use crate::scoring::{score_predictions, ScoringPass};
use crate::PredictionError;
use diesel::SqliteConnection;
use log::info;

#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub status: FixtureStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    /// shootout scores, kept for display only
    pub penalties: Option<(i32, i32)>,
}

impl ResultEntry {
    pub fn finished(home: i32, away: i32) -> Self {
        Self {
            status: FixtureStatus::Finished,
            home_score: Some(home),
            away_score: Some(away),
            penalties: None,
        }
    }

    pub fn live(home: Option<i32>, away: Option<i32>) -> Self {
        Self {
            status: FixtureStatus::Live,
            home_score: home,
            away_score: away,
            penalties: None,
        }
    }

    pub fn with_penalties(mut self, home: i32, away: i32) -> Self {
        self.penalties = Some((home, away));
        self
    }

    fn validate(&self) -> Result<(), PredictionError> {
        if self.status == FixtureStatus::Scheduled {
            return Err(PredictionError::InvalidInput(
                "A result must be live or finished".to_string(),
            ));
        }
        if self.status == FixtureStatus::Finished
            && (self.home_score.is_none() || self.away_score.is_none())
        {
            return Err(PredictionError::InvalidInput(
                "A finished result needs both scores".to_string(),
            ));
        }
        let pens = self.penalties.map(|(h, a)| [h, a]).unwrap_or_default();
        let negative = [self.home_score, self.away_score]
            .into_iter()
            .flatten()
            .chain(pens)
            .any(|s| s < 0);
        if negative {
            return Err(PredictionError::InvalidInput(
                "Scores can't be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ResultReport {
    pub fixture: Fixture,
    /// predictions whose lock flag flipped
    pub locked: usize,
    /// predictions scored; 0 unless the fixture is finished
    pub scored: usize,
}

/// Records a live or final result.
///
/// The fixture update, the lock of its predictions and (for a finished result) scoring share
/// one transaction. The first time a fixture finishes its predictions get their initial
/// scoring; entering a result for an already finished fixture re-scores by compensating
/// deltas. Finished fixtures can't go back to live.
pub fn set_result(
    admins: &dyn AdminAuthority,
    actor: &str,
    fixture_id: i32,
    entry: &ResultEntry,
    conn: &mut SqliteConnection,
) -> Result<ResultReport, PredictionError> {
    require_admin(admins, actor)?;
    entry.validate()?;

    conn.immediate_transaction(|c| {
        let mut fixture = Fixture::get(fixture_id, c)?;
        let was_finished = fixture.is_finished();
        if was_finished && entry.status == FixtureStatus::Live {
            return Err(PredictionError::InvalidInput(format!(
                "Fixture {fixture_id} is already finished"
            )));
        }
        fixture.set_status(entry.status);
        fixture.set_scores(entry.home_score, entry.away_score);
        fixture.set_penalties(entry.penalties);
        fixture.update(c)?;
        info!(
            "{actor} set fixture {fixture_id} (match {}) to {:?} {:?}-{:?}",
            fixture.match_number, entry.status, entry.home_score, entry.away_score
        );

        let locked = lock_fixture_predictions(&fixture, c)?;
        let scored = if fixture.is_finished() {
            let pass = if was_finished {
                ScoringPass::Correction
            } else {
                ScoringPass::Initial
            };
            score_predictions(&fixture, pass, c)?.scored
        } else {
            0
        };
        Ok(ResultReport {
            fixture,
            locked,
            scored,
        })
    })
}
