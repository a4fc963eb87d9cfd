use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info};

use taskdag::{
    create_router, recover_interrupted, AppState, Config, SchedulerBuilder, SleepRunner,
    SqliteTaskStore, TaskStore,
};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    taskdag::logging::init_logging(config.log_level);

    let store = Arc::new(
        SqliteTaskStore::connect(&config.db_path)
            .await
            .with_context(|| format!("failed to open task store at {}", config.db_path))?,
    );
    store.run_migrations().await.context("migrations failed")?;

    // Orphaned tasks must be requeued before the first scheduling tick.
    let recovered = recover_interrupted(store.as_ref()).await?;
    if recovered > 0 {
        info!(recovered, "requeued tasks interrupted by previous shutdown");
    }

    let scheduler = Arc::new(
        SchedulerBuilder::new(store.clone(), SleepRunner)
            .max_concurrent(config.max_concurrent)
            .poll_interval(config.poll_interval)
            .build(),
    );
    let scheduler_handle = scheduler.clone().start();

    let state = Arc::new(AppState {
        store: store.clone(),
        scheduler: scheduler.clone(),
    });
    let app = create_router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    info!(port = config.port, db = %config.db_path, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler.clone()))
        .await
        .context("server error")?;

    info!("shutting down");
    scheduler.stop();
    let drained = scheduler.drain(DRAIN_TIMEOUT).await;
    let _ = scheduler_handle.await;
    store.close().await;

    if !drained {
        error!("in-flight tasks did not finish within {:?}", DRAIN_TIMEOUT);
        std::process::exit(1);
    }

    Ok(())
}

/// Resolves on SIGINT, SIGTERM, or a fatal store error in the scheduler.
async fn shutdown_signal(scheduler: Arc<taskdag::Scheduler<SqliteTaskStore, SleepRunner>>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = futures::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
        _ = scheduler.until_fatal() => error!("scheduler reported a fatal store error"),
    }
}
