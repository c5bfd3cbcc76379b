//! Administrative corrections. Every entry point here checks [AdminAuthority] first and
//! changes user totals only by compensating deltas, except the full reset.

use crate::models::fixtures::{Fixture, FixtureFilter, FixtureStatus};
use crate::models::leaderboard_snapshots::LeaderboardSnapshot;
use crate::models::predictions::{validate_predicted_score, Prediction};
use crate::models::users::User;
use crate::scoring::points_delta;
use crate::PredictionError;
use diesel::SqliteConnection;
use log::{info, warn};

/// Whoever decides who the admins are. The engine never stores roles itself.
#[cfg_attr(test, mockall::automock)]
pub trait AdminAuthority {
    fn is_admin(&self, user_id: &str) -> bool;
}

/// a fixed list of admin identity ids, typically from ADMIN_USER_IDS
pub struct ConfiguredAdmins {
    ids: Vec<String>,
}

impl ConfiguredAdmins {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

impl AdminAuthority for ConfiguredAdmins {
    fn is_admin(&self, user_id: &str) -> bool {
        self.ids.iter().any(|id| id == user_id)
    }
}

pub fn require_admin(admins: &dyn AdminAuthority, actor: &str) -> Result<(), PredictionError> {
    if admins.is_admin(actor) {
        Ok(())
    } else {
        warn!("Denied administrative action to {actor}");
        Err(PredictionError::Unauthorized(actor.to_string()))
    }
}

/// Fields to overwrite on a prediction; None leaves the field alone.
#[derive(Debug, Default, Clone)]
pub struct PredictionCorrection {
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub points_earned: Option<i32>,
    pub is_locked: Option<bool>,
}

/// Rewrites a prediction regardless of its lock state. A points change moves the owner's
/// total by exactly (new - old) and is only accepted once the fixture has finished.
pub fn correct_prediction(
    admins: &dyn AdminAuthority,
    actor: &str,
    prediction_id: i32,
    correction: &PredictionCorrection,
    conn: &mut SqliteConnection,
) -> Result<Prediction, PredictionError> {
    require_admin(admins, actor)?;
    if let Some(h) = correction.home_score {
        validate_predicted_score(h)?;
    }
    if let Some(a) = correction.away_score {
        validate_predicted_score(a)?;
    }
    if let Some(p) = correction.points_earned {
        if p < 0 {
            return Err(PredictionError::InvalidInput(format!(
                "Points can't be negative, got {p}"
            )));
        }
    }

    conn.immediate_transaction(|c| {
        let mut prediction = Prediction::get(prediction_id, c)?;
        let (old_home, old_away) = prediction.scores();
        let home = correction.home_score.unwrap_or(old_home);
        let away = correction.away_score.unwrap_or(old_away);
        if (home, away) != (old_home, old_away) {
            prediction.set_scores(home, away);
        }
        if let Some(locked) = correction.is_locked {
            prediction.set_locked(locked);
        }
        let mut delta = 0;
        if let Some(points) = correction.points_earned {
            // the initial scoring pass must still see every prediction unscored
            if !Fixture::get(prediction.fixture_id, c)?.is_finished() {
                return Err(PredictionError::InvalidInput(format!(
                    "Fixture {} hasn't finished, can't award points yet",
                    prediction.fixture_id
                )));
            }
            delta = points_delta(prediction.points_earned(), points);
            prediction.set_points(Some(points));
        }
        prediction.update(c)?;
        if delta != 0 {
            User::adjust_total(&prediction.user_id, delta, c)?;
        }
        info!(
            "{actor} corrected prediction {prediction_id} ({}-{}, points delta {delta})",
            home, away
        );
        Ok(prediction)
    })
}

/// Removes a prediction, taking its points back off the owner's total first.
pub fn delete_prediction(
    admins: &dyn AdminAuthority,
    actor: &str,
    prediction_id: i32,
    conn: &mut SqliteConnection,
) -> Result<(), PredictionError> {
    require_admin(admins, actor)?;
    conn.immediate_transaction(|c| {
        let prediction = Prediction::get(prediction_id, c)?;
        if let Some(points) = prediction.points_earned().filter(|p| *p > 0) {
            User::adjust_total(&prediction.user_id, -points, c)?;
        }
        info!(
            "{actor} deleted prediction {prediction_id} of {}",
            prediction.user_id
        );
        prediction.delete(c)?;
        Ok(())
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResetOptions {
    /// put every fixture back to scheduled with no scores
    pub reset_fixture_results: bool,
    pub clear_snapshots: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub predictions_deleted: usize,
    pub users_reset: usize,
    pub fixtures_reset: usize,
    pub snapshots_cleared: usize,
}

/// Wipes every prediction and zeroes every total, optionally reverting results and
/// clearing snapshots.
///
/// Needs `confirmation` to match `expected_token`, which comes from somewhere other than the
/// admin check (RESET_CONFIRMATION_TOKEN). With no expected token configured the reset
/// can't run at all. All checks happen before anything is written, and the writes share
/// one transaction.
pub fn reset_all_predictions(
    admins: &dyn AdminAuthority,
    actor: &str,
    options: ResetOptions,
    confirmation: &str,
    expected_token: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<ResetReport, PredictionError> {
    require_admin(admins, actor)?;
    let expected = expected_token.ok_or_else(|| {
        PredictionError::InvalidInput("Reset is disabled: no confirmation token configured".to_string())
    })?;
    if expected.is_empty() || confirmation != expected {
        warn!("{actor} attempted a reset with a bad confirmation token");
        return Err(PredictionError::InvalidInput(
            "Reset confirmation token does not match".to_string(),
        ));
    }

    conn.immediate_transaction(|c| {
        let mut report = ResetReport {
            predictions_deleted: Prediction::delete_all(c)?,
            users_reset: User::reset_all_totals(c)?,
            ..Default::default()
        };
        if options.reset_fixture_results {
            for mut fixture in Fixture::list(&FixtureFilter::default(), c)? {
                if fixture.is_scheduled() && fixture.scores() == (None, None) {
                    continue;
                }
                fixture.set_status(FixtureStatus::Scheduled);
                fixture.set_scores(None, None);
                fixture.set_penalties(None);
                fixture.update(c)?;
                report.fixtures_reset += 1;
            }
        }
        if options.clear_snapshots {
            report.snapshots_cleared = LeaderboardSnapshot::clear_all(c)?;
        }
        info!("{actor} reset all predictions: {report:?}");
        Ok(report)
    })
}

#[cfg(test)]
mod tests {
    use super::{
        correct_prediction, delete_prediction, reset_all_predictions, MockAdminAuthority,
        PredictionCorrection, ResetOptions,
    };
    use crate::models::predictions::{NewPrediction, Outcome, Prediction};
    use crate::models::users::User;
    use crate::results::{set_result, ResultEntry};
    use crate::test_utils::{finish_fixture, new_user, scheduled_fixture, setup_db};
    use crate::PredictionError;
    use mockall::predicate::{eq, ne};

    fn admin() -> MockAdminAuthority {
        let mut m = MockAdminAuthority::new();
        m.expect_is_admin().with(eq("root")).return_const(true);
        m.expect_is_admin().with(ne("root")).return_const(false);
        m
    }

    #[test]
    fn test_points_correction_applies_delta() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let u = new_user("u1", &mut db)?;
        let mut f = scheduled_fixture(1, &mut db)?;
        let mut p = NewPrediction::new(&u.id, f.id, 3, 0, 0).upsert(&mut db)?;
        finish_fixture(&mut f, 1, 0, &mut db)?;
        p.save_points(1, &mut db)?;
        User::adjust_total(&u.id, 1, &mut db)?;
        // other points from elsewhere
        User::adjust_total(&u.id, 7, &mut db)?;

        let corrected = correct_prediction(
            &admin(),
            "root",
            p.id,
            &PredictionCorrection {
                points_earned: Some(3),
                ..Default::default()
            },
            &mut db,
        )?;
        assert_eq!(Some(3), corrected.points_earned());
        assert_eq!(10, User::get(&u.id, &mut db)?.total_points());
        Ok(())
    }

    #[test]
    fn test_empty_correction_changes_nothing() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let u = new_user("u1", &mut db)?;
        let mut f = scheduled_fixture(1, &mut db)?;
        let mut p = NewPrediction::new(&u.id, f.id, 3, 0, 0).upsert(&mut db)?;
        finish_fixture(&mut f, 1, 0, &mut db)?;
        p.save_points(1, &mut db)?;
        User::adjust_total(&u.id, 1, &mut db)?;

        correct_prediction(&admin(), "root", p.id, &PredictionCorrection::default(), &mut db)?;
        correct_prediction(
            &admin(),
            "root",
            p.id,
            &PredictionCorrection {
                points_earned: Some(1),
                ..Default::default()
            },
            &mut db,
        )?;
        assert_eq!(1, User::get(&u.id, &mut db)?.total_points());
        Ok(())
    }

    #[test]
    fn test_points_wait_for_the_final_whistle() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let u = new_user("u1", &mut db)?;
        let f = scheduled_fixture(1, &mut db)?;
        let p = NewPrediction::new(&u.id, f.id, 2, 1, 0).upsert(&mut db)?;
        let award = PredictionCorrection {
            points_earned: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            correct_prediction(&admin(), "root", p.id, &award, &mut db),
            Err(PredictionError::InvalidInput(_))
        ));
        assert_eq!(None, Prediction::get(p.id, &mut db)?.points_earned());

        // the fixture can still be finished and scored normally
        let report = set_result(&admin(), "root", f.id, &ResultEntry::finished(2, 1), &mut db)?;
        assert!(report.fixture.is_finished());
        assert_eq!(1, report.scored);
        assert_eq!(3, User::get(&u.id, &mut db)?.total_points());

        // and corrected afterwards
        correct_prediction(&admin(), "root", p.id, &award, &mut db)?;
        assert_eq!(0, User::get(&u.id, &mut db)?.total_points());
        Ok(())
    }

    #[test]
    fn test_score_correction_recomputes_outcome() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let u = new_user("u1", &mut db)?;
        let f = scheduled_fixture(1, &mut db)?;
        let p = NewPrediction::new(&u.id, f.id, 3, 0, 0).upsert(&mut db)?;
        let corrected = correct_prediction(
            &admin(),
            "root",
            p.id,
            &PredictionCorrection {
                away_score: Some(4),
                is_locked: Some(true),
                ..Default::default()
            },
            &mut db,
        )?;
        assert_eq!((3, 4), corrected.scores());
        assert_eq!(Outcome::Away, corrected.outcome());
        assert!(corrected.lock_flag());
        let reloaded = Prediction::get(p.id, &mut db)?;
        assert_eq!(Outcome::Away, reloaded.outcome());
        Ok(())
    }

    #[test]
    fn test_correction_validation() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let u = new_user("u1", &mut db)?;
        let f = scheduled_fixture(1, &mut db)?;
        let p = NewPrediction::new(&u.id, f.id, 3, 0, 0).upsert(&mut db)?;
        let bad = PredictionCorrection {
            points_earned: Some(-1),
            ..Default::default()
        };
        assert!(matches!(
            correct_prediction(&admin(), "root", p.id, &bad, &mut db),
            Err(PredictionError::InvalidInput(_))
        ));
        assert!(matches!(
            correct_prediction(&admin(), "mallory", p.id, &Default::default(), &mut db),
            Err(PredictionError::Unauthorized(_))
        ));
        assert!(matches!(
            correct_prediction(&admin(), "root", 999, &Default::default(), &mut db),
            Err(PredictionError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_delete_takes_points_back() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let u = new_user("u1", &mut db)?;
        let f = scheduled_fixture(1, &mut db)?;
        let mut p = NewPrediction::new(&u.id, f.id, 3, 0, 0).upsert(&mut db)?;
        p.save_points(3, &mut db)?;
        User::adjust_total(&u.id, 5, &mut db)?;

        delete_prediction(&admin(), "root", p.id, &mut db)?;
        assert_eq!(2, User::get(&u.id, &mut db)?.total_points());
        assert_eq!(0, Prediction::count(&mut db)?);
        Ok(())
    }

    #[test]
    fn test_reset_needs_token() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let u = new_user("u1", &mut db)?;
        let f = scheduled_fixture(1, &mut db)?;
        NewPrediction::new(&u.id, f.id, 3, 0, 0).upsert(&mut db)?;
        User::adjust_total(&u.id, 5, &mut db)?;

        let opts = ResetOptions::default();
        assert!(matches!(
            reset_all_predictions(&admin(), "root", opts, "yes", None, &mut db),
            Err(PredictionError::InvalidInput(_))
        ));
        assert!(matches!(
            reset_all_predictions(&admin(), "root", opts, "yes", Some("wipe-2026"), &mut db),
            Err(PredictionError::InvalidInput(_))
        ));
        assert!(matches!(
            reset_all_predictions(&admin(), "mallory", opts, "wipe-2026", Some("wipe-2026"), &mut db),
            Err(PredictionError::Unauthorized(_))
        ));
        // nothing happened
        assert_eq!(1, Prediction::count(&mut db)?);
        assert_eq!(5, User::get(&u.id, &mut db)?.total_points());

        let report =
            reset_all_predictions(&admin(), "root", opts, "wipe-2026", Some("wipe-2026"), &mut db)?;
        assert_eq!(1, report.predictions_deleted);
        assert_eq!(0, Prediction::count(&mut db)?);
        assert_eq!(0, User::get(&u.id, &mut db)?.total_points());
        Ok(())
    }
}
