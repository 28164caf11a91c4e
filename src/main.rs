use log::info;
use showcase_db::config::AppConfig;
use showcase_db::logic::BulkOptions;
use showcase_db::seed;
use showcase_db::store::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let config = AppConfig::load()?;
    info!(
        "Configuration loaded: live_conflict={:?}, deadline_ms={:?}",
        config.engine.live_conflict, config.engine.deadline_ms
    );

    info!("Connecting to PostgreSQL...");
    let database_url = config.database_url()?;
    let store = PostgresStore::connect(&database_url, &config.database).await?;

    info!("Running database migrations...");
    store.migrate().await?;

    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        info!("Loading seed data...");
        seed::load_seed_data(&store, &BulkOptions::from_config(&config.engine)).await?;
    }

    info!("Database ready");
    Ok(())
}
