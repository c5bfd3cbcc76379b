//! Deciding whether a prediction may still change, and persisting explicit locks.
//!
//! The persisted `is_locked` flag is only a cache of an explicit lock (the sweep, or result
//! entry). Kickoff time and fixture status are always checked live on top of it.

use crate::models::fixtures::Fixture;
use crate::models::predictions::Prediction;
use crate::PredictionError;
use chrono::{DateTime, Duration, Utc};
use diesel::SqliteConnection;
use log::{debug, info};

/// true once the prediction can no longer be created or changed. Kickoff itself counts as locked.
pub fn is_locked(lock_flag: bool, fixture: &Fixture, now: DateTime<Utc>) -> bool {
    lock_flag || !fixture.is_scheduled() || now.timestamp() >= fixture.scheduled_at
}

impl Prediction {
    pub fn is_locked_at(&self, fixture: &Fixture, now: DateTime<Utc>) -> bool {
        is_locked(self.lock_flag(), fixture, now)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LockSweepReport {
    /// fixtures that were due
    pub fixtures: usize,
    /// predictions whose flag flipped during this sweep
    pub predictions: usize,
}

/// Persists the lock flag on predictions of every scheduled fixture kicking off by
/// `now + window`. Safe to call as often as you like.
pub fn lock_overdue(
    now: DateTime<Utc>,
    window: Duration,
    conn: &mut SqliteConnection,
) -> Result<LockSweepReport, PredictionError> {
    let cutoff = (now + window).timestamp();
    conn.immediate_transaction(|c| {
        let due = Fixture::scheduled_starting_before(cutoff, c)?;
        let mut report = LockSweepReport {
            fixtures: due.len(),
            predictions: 0,
        };
        for fixture in due {
            let n = Prediction::lock_all_for_fixture(fixture.id, c)?;
            if n > 0 {
                debug!("Locked {n} predictions for fixture {}", fixture.id);
            }
            report.predictions += n;
        }
        if report.predictions > 0 {
            info!(
                "Lock sweep locked {} predictions across {} fixtures",
                report.predictions, report.fixtures
            );
        }
        Ok(report)
    })
}

/// locks every prediction on one fixture. Runs inside whatever transaction the caller holds
pub(crate) fn lock_fixture_predictions(
    fixture: &Fixture,
    conn: &mut SqliteConnection,
) -> Result<usize, diesel::result::Error> {
    let n = Prediction::lock_all_for_fixture(fixture.id, conn)?;
    debug!("Locked {n} predictions for fixture {}", fixture.id);
    Ok(n)
}
