use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use emex_vin_parser::api::{AppState, router};
use emex_vin_parser::config::Settings;
use emex_vin_parser::scrapers::EmexScraper;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting VIN parser for emex.ru");

    let settings = Settings::from_env()?;
    let mut scraper = EmexScraper::new(&settings, None)?;

    if settings.credentials.is_some() && !scraper.authenticate().await {
        warn!("Initial authentication failed - continuing without a session");
    }

    let address = settings.bind_address();
    let app = router(AppState::new(settings, scraper));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
