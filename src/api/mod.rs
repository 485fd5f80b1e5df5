//! HTTP surface: router and the state shared by all handlers.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::RwLock;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::scrapers::EmexScraper;

mod handlers;

pub type SharedState = Arc<AppState>;

/// Process-wide state. The scraper handle is swapped whole on
/// re-authentication; requests work on the snapshot they took.
pub struct AppState {
    pub settings: Settings,
    scraper: RwLock<Arc<EmexScraper>>,
}

impl AppState {
    pub fn new(settings: Settings, scraper: EmexScraper) -> SharedState {
        Arc::new(Self {
            settings,
            scraper: RwLock::new(Arc::new(scraper)),
        })
    }

    /// Current scraper; the read lock is released before returning.
    pub async fn scraper(&self) -> Arc<EmexScraper> {
        self.scraper.read().await.clone()
    }

    pub async fn replace_scraper(&self, scraper: EmexScraper) {
        *self.scraper.write().await = Arc::new(scraper);
    }
}

pub fn router(state: SharedState) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/api/decode-vin/:vin", get(handlers::decode_vin))
        .route("/api/search-parts/:vin", get(handlers::search_parts))
        .route("/api/part-details/:article", get(handlers::part_details))
        .route("/api/authenticate", post(handlers::authenticate));

    with_service_layers(routes).with_state(state)
}

/// Panic-to-500, CORS and request tracing around every route.
pub fn with_service_layers<S>(routes: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
