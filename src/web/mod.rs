//! Web layer: router construction and shared application state.
//!
//! Handlers are thin wrappers over the repository layer; they validate
//! request parameters at the boundary, delegate, and map failures to
//! HTTP status codes.

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    covers::{CoverLocator, CoverStorage},
    database::Database,
    feed::FeedGenerator,
};

pub mod api;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
    pub feeds: Arc<FeedGenerator>,
    pub covers: Arc<dyn CoverLocator>,
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub async fn new(config: Config, database: Database) -> Result<Self> {
        let feeds = Arc::new(FeedGenerator::new(&config.web.base_url)?);
        let covers: Arc<dyn CoverLocator> = Arc::new(CoverStorage::new(
            config.storage.data_path.clone(),
            config.storage.cover_default_name.clone(),
        ));

        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;

        let app = Self::create_router(AppState {
            database,
            config,
            feeds,
            covers,
        });

        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        let data_dir = state.config.storage.data_path.clone();

        Router::new()
            .route("/health", get(api::health_check))
            .nest("/api/v1", Self::api_v1_routes())
            // Downloaded media and cached covers
            .nest_service("/data", ServeDir::new(data_dir))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    fn api_v1_routes() -> Router<AppState> {
        Router::new()
            // Podcasts
            .route("/podcasts", get(api::list_podcasts))
            .route("/podcasts/opml", get(api::opml))
            .route(
                "/podcasts/stats/byCreationDate",
                get(api::stats_by_creation_date),
            )
            .route("/podcasts/stats/byPubDate", get(api::stats_by_pub_date))
            .route(
                "/podcasts/stats/byDownloadDate",
                get(api::stats_by_download_date),
            )
            .route("/podcasts/:id", get(api::get_podcast))
            .route("/podcasts/:id/rss", get(api::rss))
            .route(
                "/podcasts/:id/stats/byCreationDate",
                get(api::podcast_stats_by_creation_date),
            )
            .route(
                "/podcasts/:id/stats/byPubDate",
                get(api::podcast_stats_by_pub_date),
            )
            .route(
                "/podcasts/:id/stats/byDownloadDate",
                get(api::podcast_stats_by_download_date),
            )
            .route("/podcasts/:id/items", get(api::search_podcast_items))
            .route("/podcasts/:id/items/:item_id", get(api::get_item))
            // cover.{ext} and downloaded media redirects
            .route("/podcasts/:id/:cover_file", get(api::podcast_cover))
            .route("/podcasts/:id/items/:item_id/:file", get(api::item_file))
            // Items
            .route("/items/search", get(api::search_items))
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}
