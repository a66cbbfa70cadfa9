use cafeteria::{
    config::{database, menu},
    core::catalog,
    errors::Result,
    live::{Hub, LiveFeed},
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the weekday dish seeds
    let menu_config = menu::load_default_config()
        .inspect_err(|e| error!("Failed to load menu configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the weekday dishes on first start
    catalog::seed_weekday_dishes(&db, &menu_config)
        .await
        .inspect_err(|e| error!("Failed to seed weekday dishes: {}", e))?;

    // 6. Start the live feed; the request layer mounts on top of `feed`
    let feed = LiveFeed::start(db, Hub::new());
    info!("Live feed running, press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down.");
    drop(feed);

    Ok(())
}
