use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;

use rust_poll_chat::api::{self, ApiState};
use rust_poll_chat::chat::MessageBoard;
use rust_poll_chat::config::{self, AppConfig};
use rust_poll_chat::presence::{PresenceTracker, SweepTask};
use rust_poll_chat::storage::{ChatDatabase, ChatStore};

#[derive(Parser)]
#[command(
    name = "rust_poll_chat",
    version,
    about = "Polling chat-room server with inactivity eviction"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, env = "CHAT_CONFIG", default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Address to listen on (overrides config)
    #[arg(long, env = "CHAT_BIND", value_name = "ADDR")]
    bind: Option<String>,
    /// SQLite database file (overrides config)
    #[arg(long, env = "CHAT_DATABASE", value_name = "FILE")]
    database: Option<String>,
    /// Seconds without heartbeat before eviction
    #[arg(long, env = "CHAT_THRESHOLD_SECS")]
    threshold_secs: Option<u64>,
    /// Seconds between sweeps
    #[arg(long, env = "CHAT_PERIOD_SECS")]
    period_secs: Option<u64>,
    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(secs) = self.threshold_secs {
            config.inactivity_threshold_secs = secs;
        }
        if let Some(secs) = self.period_secs {
            config.sweep_period_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    cli.apply_overrides(&mut app_config);
    app_config.validate()?;

    if cli.write_config {
        config::save_config(&cli.config, &app_config)?;
        log::info!("Wrote configuration to {}", cli.config);
        return Ok(());
    }

    let store: Arc<dyn ChatStore> = Arc::new(ChatDatabase::with_path(&app_config.database_path)?);
    log::info!("Using database {}", app_config.database_path);

    let tracker = Arc::new(PresenceTracker::new(store.clone()));
    let board = Arc::new(MessageBoard::new(store));

    let sweeper = SweepTask::start(
        tracker.clone(),
        app_config.sweep_period(),
        app_config.inactivity_threshold(),
    );

    let listener = TcpListener::bind(&app_config.bind_addr).await?;
    log::info!("Chat server listening on {}", listener.local_addr()?);

    let app = api::routes(ApiState::new(tracker, board));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.stop().await;
    served?;

    log::info!("Chat server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("Received shutdown signal, stopping chat server...");
}
