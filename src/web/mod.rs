//! HTTP surface: the page, the catalog endpoints and the two API handlers.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use crate::captcha::{CaptchaVerifier, HCaptchaVerifier};
use crate::cli::CliOptions;
use crate::config::http_client;
use crate::constants::MAX_BODY_BYTES;
use crate::fonts::{BannerRenderer, GlyphRenderer};
use crate::imagegen::{GeminiImageClient, ImageGenerator};
use crate::ratelimit::{RateLimiter, build_rate_limiter};

mod banner;
mod generate;
mod middleware;
mod prelude;
#[cfg(test)]
mod testing;
mod views;

use banner::banner_handler;
use generate::generate_handler;
use views::{fonts_handler, root_handler, style_catalog_handler};

/// Handles to everything the handlers talk to.
#[derive(Clone)]
pub struct AppState {
    renderer: Arc<dyn BannerRenderer>,
    captcha: Arc<dyn CaptchaVerifier>,
    limiter: Arc<dyn RateLimiter>,
    generator: Arc<dyn ImageGenerator>,
    site_key: Arc<str>,
}

impl AppState {
    /// Builds state from explicit collaborators.
    pub fn new(
        renderer: Arc<dyn BannerRenderer>,
        captcha: Arc<dyn CaptchaVerifier>,
        limiter: Arc<dyn RateLimiter>,
        generator: Arc<dyn ImageGenerator>,
        site_key: &str,
    ) -> Self {
        Self {
            renderer,
            captcha,
            limiter,
            generator,
            site_key: Arc::from(site_key),
        }
    }

    /// Builds the production collaborators from the command line. They share one HTTP
    /// client bounded by the upstream timeout.
    pub fn from_options(cli: &CliOptions) -> Result<Self, anyhow::Error> {
        let http = http_client(cli.upstream_timeout())?;
        let captcha = HCaptchaVerifier::new(
            cli.hcaptcha_secret_key.clone(),
            &cli.hcaptcha_verify_url,
            http.clone(),
        )?;
        let limiter = build_rate_limiter(cli, http.clone())?;
        let generator = GeminiImageClient::new(
            cli.google_ai_api_key.clone(),
            &cli.gemini_model,
            &cli.gemini_api_base,
            http,
        )?;
        Ok(Self::new(
            Arc::new(GlyphRenderer),
            Arc::new(captcha),
            limiter,
            Arc::new(generator),
            &cli.hcaptcha_site_key,
        ))
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root_handler))
        .route("/static/styles.css", get(styles_handler))
        .route("/static/app.js", get(script_handler))
        .route("/healthz", get(healthz_handler))
        .route("/api/fonts", get(fonts_handler))
        .route("/api/styles", get(style_catalog_handler))
        .route("/api/banner", post(banner_handler))
        .route("/api/generate", post(generate_handler))
}

/// The full application with state and request limits applied.
pub fn app(state: AppState) -> Router {
    create_router()
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

async fn script_handler() -> impl IntoResponse {
    const SCRIPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/app.js"));
    ([(CONTENT_TYPE, "text/javascript")], SCRIPT)
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Serves the application until Ctrl-C.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    state: AppState,
) -> Result<(), anyhow::Error> {
    let router = app(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}
