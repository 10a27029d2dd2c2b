mod auth;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod ranking;
mod resume;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, TlsPaths};
use crate::extraction::webdriver::WebDriverLauncher;
use crate::extraction::ContentExtractor;
use crate::llm_client::LlmClient;
use crate::ranking::inference::InferenceClient;
use crate::ranking::service::RankingService;
use crate::routes::build_router;
use crate::state::AppState;

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobfit v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the generation handle once; shared by every request
    let llm = LlmClient::new(
        &config.model_url,
        config.model_name.clone(),
        config.model_api_key.clone(),
    )
    .context("failed to build generation client")?;
    info!("LLM client initialized (model: {})", config.model_name);

    let inference = InferenceClient::new(
        Arc::new(llm),
        config.max_new_tokens,
        config.inference_timeout,
        config.inference_max_concurrency,
    );
    info!(
        "Inference: max_new_tokens={}, timeout={}s, max_concurrency={}",
        config.max_new_tokens,
        config.inference_timeout.as_secs(),
        config.inference_max_concurrency
    );

    // Headless browser via WebDriver; one session per request
    let launcher = WebDriverLauncher::new(config.webdriver_url.clone(), config.extraction_timeout);
    let extractor = ContentExtractor::new(Arc::new(launcher), config.extraction_timeout);
    info!(
        "Content extractor using WebDriver at {} (timeout {}s)",
        config.webdriver_url,
        config.extraction_timeout.as_secs()
    );

    let ranking = RankingService::new(extractor, inference, config.rank_max_attempts);

    // Build app state
    let state = AppState {
        ranking: Arc::new(ranking),
        api_key: Arc::from(config.api_key.as_str()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    serve(app, addr, config.tls.as_ref()).await?;

    info!("Server stopped; generation handle released");
    Ok(())
}

/// Serves plain HTTP, or HTTPS when a certificate/key pair is configured.
async fn serve(app: Router, addr: SocketAddr, tls: Option<&TlsPaths>) -> Result<()> {
    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    match tls {
        Some(paths) => {
            let rustls = RustlsConfig::from_pem_file(&paths.cert, &paths.key)
                .await
                .with_context(|| {
                    format!(
                        "failed to load TLS certificate {:?} / key {:?}",
                        paths.cert, paths.key
                    )
                })?;
            info!("Listening on https://{addr}");
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Listening on http://{addr}");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}

async fn shutdown_on_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received; draining in-flight requests");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
