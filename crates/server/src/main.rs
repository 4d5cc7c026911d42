mod api;
mod kinds;
mod router;
mod runner;
mod state;


use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use nudge_core::Config;
use nudge_notify::{EmailNotifier, Notifier};
use nudge_scheduler::{
    Cadence, LoadStatus, NotificationScheduler, RunLockRegistry, ScheduledRunJob, SendRegistry,
    SubscriptionLoader, SubscriptionStore,
};

use crate::kinds::{StaticTaskFeed, TaskFeed, TaskReminder, WeeklyDigest};
use crate::state::AppState;

/// Reminder notification scheduler — evaluates subscriptions hourly and
/// emails the due ones.
#[derive(Parser, Debug)]
#[command(name = "nudge-server", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server and the recurring notification runner.
    Serve,
    /// One-shot dry run: print how many notifications are due, then exit.
    Check {
        /// Evaluation instant (RFC 3339); defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    nudge_core::config::load_dotenv();
    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Check { at } => check(config, at).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.log_summary();
    let state = build_state(&config)?;

    tokio::spawn(runner::run_notification_loop(state.clone()));

    let app = router::build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn check(config: Config, at: Option<DateTime<Utc>>) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    let at = at.unwrap_or_else(Utc::now);

    let pending = state
        .scheduler
        .pending_count(state.store.as_ref(), at)
        .await?;
    println!("{} notification(s) pending at {}", pending, at.to_rfc3339());

    Ok(())
}

fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let mut loader = SubscriptionLoader::new(config.scheduler.subscriptions_dir.clone());
    let results = loader.load_all()?;
    let loaded = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Loaded { .. }))
        .count();
    let failed = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
        .count();
    info!(loaded, failed, "subscription scan complete");

    if config.scheduler.hot_reload {
        loader.watch()?;
    }
    let store: Arc<dyn SubscriptionStore> = Arc::new(loader);

    let notifier: Arc<dyn Notifier> = Arc::new(EmailNotifier::from_config(&config.smtp)?);
    let feed: Arc<dyn TaskFeed> = Arc::new(StaticTaskFeed::from_file(&config.feed.tasks_file));

    let mut registry = SendRegistry::new();
    registry.register(Arc::new(WeeklyDigest::new(feed.clone(), notifier.clone())));
    registry.register(Arc::new(TaskReminder::new(feed, notifier)));

    let cadence = Cadence::from_poll_interval(config.scheduler.poll_interval());
    let scheduler = Arc::new(NotificationScheduler::new(registry, cadence));
    let job = Arc::new(ScheduledRunJob::new(scheduler.clone(), store.clone()));

    Ok(Arc::new(AppState {
        scheduler,
        store,
        job,
        locks: Arc::new(RunLockRegistry::new()),
        trigger_token: config.trigger.token.clone(),
    }))
}
