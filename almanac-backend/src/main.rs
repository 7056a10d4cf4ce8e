use dotenv::dotenv;
use std::sync::Arc;

use almanac_backend::config::{self, Config};
use almanac_backend::db::Database;
use almanac_backend::managers::{ManagerConfig, ManagerSet};
use almanac_backend::notify::{DesktopNotifier, Notifier};
use almanac_backend::scheduler::ReminderScheduler;
use tokio_util::sync::CancellationToken;

fn manager_config(config: &Config) -> ManagerConfig {
    ManagerConfig {
        horizon_days: config.horizon_days,
        resync_interval: config.resync_interval(),
        cache_staleness: std::time::Duration::from_secs(config.cache_staleness_secs),
        search_fanout_threshold: config.search_fanout_threshold,
        search_max_workers: config.search_max_workers,
        search_unit_timeout: std::time::Duration::from_millis(config.search_unit_timeout_ms),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    config::initialize_data_dirs(&config)?;

    let db = match Database::open(&config.db_path()) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            log::error!("[ALMANAC] Failed to open index database: {}", e);
            std::process::exit(1);
        }
    };

    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier);
    let scheduler = Arc::new(ReminderScheduler::new(notifier, config.notify_fade_secs));
    let managers = ManagerSet::new(
        Arc::clone(&db),
        config.documents_dir(),
        Arc::clone(&scheduler),
        manager_config(&config),
    );

    // Warm the caches and arm timers before the first periodic tick.
    let active = managers.resync_all();
    log::info!(
        "[ALMANAC] Ready; {} active entries, {} reminders armed",
        active,
        scheduler.live_count()
    );

    let shutdown = CancellationToken::new();
    let jobs = managers.start_resync_jobs(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    log::info!("[ALMANAC] Shutting down");

    shutdown.cancel();
    scheduler.shutdown();
    for job in jobs {
        let _ = job.await;
    }

    Ok(())
}
