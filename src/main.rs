use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    cache::CacheService,
    config::{Config, LogFormat},
    controllers, load_layouts,
    store::{postgres, PgBookingStore, PgShowStore},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    let registry = tracing_subscriber::registry().with(filter);
    match config.app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;
    init_tracing(&config);

    info!("Starting Cinema Booking API ({})", config.app.environment);

    let layouts = load_layouts(&config).context("invalid hall layouts")?;
    info!("Loaded {} halls", layouts.hall_codes().count());

    // Connect to the database
    let pool = postgres::connect(&config.database.url, config.database.pool_size)
        .await
        .context("failed to connect to database")?;
    info!("Database connected");

    postgres::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    // Redis is optional; without it availability is always read from the store
    let cache = match (&config.redis.url, config.features.enable_availability_cache) {
        (Some(url), true) => match CacheService::connect(url).await {
            Ok(cache) => {
                info!("Redis connected");
                Some(cache)
            }
            Err(e) => {
                warn!("Redis unavailable, availability cache disabled: {}", e);
                None
            }
        },
        _ => None,
    };

    let app_state = AppState::new(
        config.clone(),
        layouts,
        Arc::new(PgShowStore::new(pool.clone())),
        Arc::new(PgBookingStore::new(pool)),
        cache,
    );

    // --- Start background tasks ---

    // Recreate bookings lost between reservation and ledger write
    if config.features.enable_reconciler {
        let state = app_state.clone();
        let interval = Duration::from_secs(config.booking.reconcile_interval_seconds.max(1));
        task::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = state.reconciler.run_once().await {
                    error!("Reconciliation failed: {}", e);
                }
            }
        });
    }

    // --- Start the web server ---

    let app = controllers::router(app_state);

    let host: std::net::IpAddr = config
        .app
        .host
        .parse()
        .with_context(|| format!("invalid HOST '{}'", config.app.host))?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
