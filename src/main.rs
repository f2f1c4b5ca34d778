use mimalloc::MiMalloc;
use pinbeam::config::CONFIG;
use pinbeam::pinterest::client::{PinterestApi, PinterestClient};
use pinbeam::router::BeamState;
use pinbeam::service::connections::ConnectionService;
use pinbeam::service::publisher::Publisher;
use pinbeam::vault::{HttpVault, TokenVault};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &*CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen = %cfg.listen,
        loglevel = %cfg.loglevel,
        scheduler_enabled = cfg.scheduler.enabled,
        "starting pinbeam"
    );

    let store = pinbeam::db::connect(&cfg.database_url).await?;
    let vault: Arc<dyn TokenVault> = Arc::new(HttpVault::new(&cfg.vault));
    let api: Arc<dyn PinterestApi> = Arc::new(PinterestClient::new(&cfg.pinterest));

    let connections = Arc::new(ConnectionService::new(
        store.clone(),
        vault.clone(),
        api.clone(),
        &cfg.scheduler,
    ));
    let publisher = Arc::new(Publisher::new(
        store.clone(),
        vault.clone(),
        api.clone(),
        &cfg.publish,
    ));

    if cfg.scheduler.enabled {
        spawn_tickers(cfg, connections.clone(), publisher.clone());
    }

    let state = BeamState::new(
        store,
        connections,
        publisher,
        Arc::from(cfg.service_key.as_str()),
    );
    let app = pinbeam::router::beam_router(state);

    let listener = TcpListener::bind(&cfg.listen).await?;
    info!("HTTP server listening on {}", cfg.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// In-process schedulers for deployments without external cron: the
/// 15-minute publish dispatch and the daily refresh sweep.
fn spawn_tickers(
    cfg: &pinbeam::config::Config,
    connections: Arc<ConnectionService>,
    publisher: Arc<Publisher>,
) {
    let publish_every = Duration::from_secs(cfg.scheduler.publish_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(publish_every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = publisher.publish_due().await {
                error!(error = %e, "scheduled publish run failed");
            }
        }
    });

    let refresh_every = Duration::from_secs(cfg.scheduler.refresh_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh_every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = connections.refresh_sweep().await {
                error!(error = %e, "scheduled refresh sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install ctrl-c handler");
    }
}
