pub mod adherence;
pub mod api;
pub mod caretaker;
pub mod config;
pub mod core_state;
pub mod db;
pub mod dose;
pub mod extraction;
pub mod guard;
pub mod models;
pub mod notify;
pub mod reminder;
pub mod rollover;
pub mod schedule;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::CoreState;
use crate::notify::LogNotifier;
use crate::reminder::ReminderScheduler;

/// Errors that can abort startup. Anything past startup logs and
/// degrades instead.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire everything together and serve until ctrl-c.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let (ignored_tx, ignored_rx) = mpsc::unbounded_channel();
    let reminders = ReminderScheduler::new(Arc::new(LogNotifier), ignored_tx);
    let core = Arc::new(CoreState::new(&config, reminders));

    // Run migrations and rebuild in-flight reminders from pending
    // dose logs — timer state never survives a restart, the store does.
    {
        let conn = core.open_db()?;
        core.reminders.rebuild_pending(&conn)?;
    }

    let _escalations = caretaker::spawn_escalation_forwarder(core.clone(), ignored_rx);
    let mut rollover = rollover::start_rollover(core.clone(), config.auto_expire_hours);
    let mut server = api::server::start_api_server(core, config.listen_addr).await?;

    tracing::info!(addr = %server.addr, "DoseWise ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    server.shutdown();
    rollover.shutdown();
    Ok(())
}

/// Initialise tracing from the environment.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
