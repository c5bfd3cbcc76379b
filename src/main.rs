use chrono::Duration;
use log::{info, warn};
use prediction_league::config::CONFIG;
use prediction_league::db::{diesel_pool, run_migrations, DieselConnectionManager};
use prediction_league::PredictionLeagueError;
use shutdown::Shutdown;
use std::ops::DerefMut;

mod shutdown;
mod workers;

extern crate dotenv;
extern crate tokio;

#[tokio::main]
async fn main() -> Result<(), PredictionLeagueError> {
    dotenv::dotenv().ok();
    if let Err(e) = log4rs::init_file(&CONFIG.log4rs_config_file, Default::default()) {
        return Err(PredictionLeagueError::ConfigError(format!(
            "Failed to initialize logging from {}: {e}",
            CONFIG.log4rs_config_file
        )));
    }

    let pool = diesel_pool(DieselConnectionManager::new_from_env()).await?;
    {
        let mut conn = pool.get().await?;
        run_migrations(conn.deref_mut())?;
    }
    match CONFIG.gated_stage {
        Some(stage) => info!("Eligibility gate active for stage {}", stage.slug()),
        None => info!("No eligibility gate configured"),
    }
    if CONFIG.admin_user_ids.is_empty() {
        warn!("ADMIN_USER_IDS is empty; nobody can run administrative operations");
    }

    let (shutdown_send, _) = tokio::sync::broadcast::channel::<Shutdown>(1);
    tokio::spawn(workers::lock_sweep_worker::cron(
        pool.clone(),
        CONFIG.sweep_tick_secs,
        Duration::minutes(CONFIG.lock_window_minutes),
        shutdown_send.subscribe(),
    ));

    tokio::signal::ctrl_c().await.ok();
    let (shutdown_signal_send, mut shutdown_signal_recv) = tokio::sync::mpsc::channel(1);
    // send a copy of an mpsc sender to each watcher of the shutdown thread...
    {
        shutdown_send
            .send(Shutdown {
                _handle: shutdown_signal_send.clone(),
            })
            .ok();
    }

    drop(shutdown_signal_send);
    shutdown_signal_recv.recv().await;
    info!("Shut down gracefully");
    Ok(())
}
