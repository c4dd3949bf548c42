use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use adlens_common::Config;
use adlens_scraper::creatives::PgCreativeStore;
use adlens_scraper::gate::SubmissionGate;
use adlens_scraper::mirror::{MediaMirror, ReqwestMediaFetcher};
use adlens_scraper::provider::ApifyProvider;
use adlens_scraper::registry::PgRunStore;
use adlens_scraper::traits::RunStore;
use adlens_scraper::{PollConfig, PollScheduler, ResultPipeline};
use apify_client::ApifyClient;
use objectstore_client::ObjectStoreClient;

mod rest;

pub struct AppState {
    pub gate: SubmissionGate,
    pub scheduler: Arc<PollScheduler>,
    pub runs: Arc<dyn RunStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("adlens=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    adlens_scraper::registry::migrate(&pool).await?;

    let provider = Arc::new(ApifyProvider::new(ApifyClient::new(
        config.apify_api_key.clone(),
    )));
    let runs: Arc<dyn RunStore> = Arc::new(PgRunStore::new(pool.clone()));
    let creatives = Arc::new(PgCreativeStore::new(pool));

    let storage = Arc::new(ObjectStoreClient::new(
        &config.storage_endpoint,
        &config.storage_bucket,
        &config.storage_api_key,
        &config.storage_public_url,
    ));
    let mirror = MediaMirror::new(Arc::new(ReqwestMediaFetcher::new()), storage);

    let pipeline = Arc::new(ResultPipeline::new(creatives, runs.clone(), mirror));
    let scheduler = PollScheduler::new(provider.clone(), pipeline, PollConfig::default());
    let gate = SubmissionGate::new(provider, runs.clone(), scheduler.clone());

    let state = Arc::new(AppState {
        gate,
        scheduler: scheduler.clone(),
        runs,
    });

    let app = Router::new()
        // Health check
        .route("/health", get(|| async { "ok" }))
        // REST API
        .route("/api/runs", post(rest::api_start_run))
        .route("/api/runs/status", get(rest::api_run_status))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!(addr = %addr, "Ad scrape API listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await?;

    Ok(())
}

async fn shutdown_signal(scheduler: Arc<PollScheduler>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
        return;
    }
    info!("Shutdown requested; cancelling in-flight poll loops");
    scheduler.shutdown();
}
