use crate::shutdown::Shutdown;
use bb8::Pool;
use chrono::{DateTime, Duration, Utc};
use diesel::SqliteConnection;
use log::{debug, info, warn};
use prediction_league::db::DieselConnectionManager;
use prediction_league::locking::{lock_overdue, LockSweepReport};
use prediction_league::PredictionLeagueError;
use std::ops::DerefMut;
use tokio::sync::broadcast::Receiver;

fn run_once(
    now: DateTime<Utc>,
    window: Duration,
    conn: &mut SqliteConnection,
) -> Result<LockSweepReport, PredictionLeagueError> {
    Ok(lock_overdue(now, window, conn)?)
}

async fn tick(
    window: Duration,
    pool: &Pool<DieselConnectionManager>,
) -> Result<LockSweepReport, PredictionLeagueError> {
    let mut conn = pool.get().await?;
    run_once(Utc::now(), window, conn.deref_mut())
}

pub async fn cron(
    pool: Pool<DieselConnectionManager>,
    tick_secs: u64,
    window: Duration,
    mut sd: Receiver<Shutdown>,
) {
    let mut interval = tokio::time::interval(core::time::Duration::from_secs(tick_secs));
    info!("Starting lock_sweep_worker (every {tick_secs}s, window {}m)", window.num_minutes());
    loop {
        tokio::select! {
            _ = interval.tick() => {
            },
            _ = sd.recv() => {
                info!("Shutting down lock_sweep_worker");
                break;
            }
        }
        debug!("lock_sweep_worker sweep starting");
        match tick(window, &pool).await {
            Ok(report) => {
                if report.predictions > 0 {
                    debug!("lock_sweep_worker: {report:?}");
                }
            }
            Err(e) => {
                warn!("Error running lock_sweep_worker loop: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cron, run_once};
    use crate::shutdown::Shutdown;
    use chrono::{Duration, TimeZone, Utc};
    use prediction_league::db::{diesel_pool, establish, run_migrations, DieselConnectionManager};
    use prediction_league::models::fixtures::NewFixture;
    use prediction_league::models::predictions::{NewPrediction, Prediction};
    use prediction_league::models::stages::{Stage, StageKind};
    use prediction_league::models::users::NewUser;

    #[test]
    fn test_run_once_respects_window() -> anyhow::Result<()> {
        let mut db = establish(":memory:")?;
        run_migrations(&mut db)?;
        let kickoff = Utc.with_ymd_and_hms(2026, 6, 11, 19, 0, 0).unwrap();
        let stage = Stage::get_by_kind(StageKind::Group, &mut db)?.unwrap();
        let f = NewFixture::new(1, &stage, &kickoff).save(&mut db)?;
        NewUser::new("u1", "u1@example.com", "u1").save(&mut db)?;
        NewPrediction::new("u1", f.id, 1, 0, 0).upsert(&mut db)?;

        let now = kickoff - Duration::minutes(10);
        assert_eq!(0, run_once(now, Duration::zero(), &mut db)?.predictions);
        let report = run_once(now, Duration::minutes(15), &mut db)?;
        assert_eq!(1, report.fixtures);
        assert_eq!(1, report.predictions);
        assert!(Prediction::for_user_and_fixture("u1", f.id, &mut db)?
            .unwrap()
            .lock_flag());
        Ok(())
    }

    #[tokio::test]
    async fn test_cron_stops_on_shutdown() -> anyhow::Result<()> {
        let pool = diesel_pool(DieselConnectionManager::new(":memory:")).await?;
        let (sd_send, sd_recv) = tokio::sync::broadcast::channel::<Shutdown>(1);
        let handle = tokio::spawn(cron(pool, 3600, Duration::zero(), sd_recv));

        let (done_send, mut done_recv) = tokio::sync::mpsc::channel::<()>(1);
        sd_send.send(Shutdown { _handle: done_send })?;
        tokio::time::timeout(core::time::Duration::from_secs(5), handle).await??;
        drop(sd_send);
        // the worker dropped its Shutdown, so nothing holds the sender any more
        assert!(done_recv.recv().await.is_none());
        Ok(())
    }
}
