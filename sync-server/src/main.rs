use std::sync::Arc;

use sync_server::{
    AppState, BackgroundTasks, Config, Dispatchers, MemoryQueue, TaskKind,
};
use sync_server::schedule::SchedulePlanner;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir,
        "Ozon order sync starting"
    );

    if !config.is_production() {
        tracing::warn!("Not a production environment: mutating marketplace calls are disabled");
    }

    let (queue, runner) = MemoryQueue::channel();
    let state = AppState::initialize(&config, Arc::new(queue))?;

    let dispatchers = Arc::new(Dispatchers::new(&state));
    let planner = SchedulePlanner::new(
        state.queue.clone(),
        state.tokens.clone(),
        state.new_orders_period,
        state.cancel_period,
    );

    let mut tasks = BackgroundTasks::new();
    let shutdown = tasks.shutdown_token();

    let runner_shutdown = shutdown.clone();
    tasks.spawn("queue_runner", TaskKind::Worker, async move {
        runner.run(dispatchers, runner_shutdown).await;
    });

    let planner_shutdown = shutdown.clone();
    tasks.spawn("schedule_planner", TaskKind::Periodic, async move {
        planner.run(planner_shutdown).await;
    });

    tracing::info!(tasks = tasks.len(), "Service started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;

    Ok(())
}
