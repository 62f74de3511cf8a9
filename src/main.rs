use release_tracker::{app, config::TrackerConfig, db, init_tracing, tracker_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = TrackerConfig::from_env()?;
    let addr = config.addr;

    let db = db::connect_and_migrate(&config.database_url).await?;
    if !config.cache_enabled {
        tracing::warn!("release cache disabled, every read goes to the database");
    }

    let app = app(tracker_state(config, db));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "release tracker listening");
    axum::serve(listener, app).await?;

    Ok(())
}
