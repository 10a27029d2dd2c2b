//! Content extraction: loads a job posting in a headless browser and returns
//! the rendered text of its `<body>`.
//!
//! One browser session per call. The session is released on every exit path:
//! success, navigation failure, readiness timeout, and cancellation of the
//! calling future (the guard hands the session to a background task on drop).

pub mod webdriver;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::errors::AppError;

/// How often the body is re-checked while waiting for the page to materialise.
const BODY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Visible body text of one fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
}

/// Opens isolated, non-interactive browsing sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, AppError>;
}

/// A single browsing context. Owned by exactly one extraction call.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &Url) -> Result<(), AppError>;

    /// Rendered text of the document body, or `None` while no body exists yet.
    async fn body_text(&self) -> Result<Option<String>, AppError>;

    /// Tears the session down. Failures are logged, never propagated.
    async fn close(self: Box<Self>);
}

/// Owns a session until it is released; releases it in the background if the
/// owning future is dropped first.
struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Extraction cancelled with an open browser session; closing in background");
                handle.spawn(session.close());
            }
            Err(_) => warn!("Browser session dropped outside a runtime; it could not be closed"),
        }
    }
}

/// Turns a job-posting URL into its visible text.
#[derive(Clone)]
pub struct ContentExtractor {
    launcher: Arc<dyn BrowserLauncher>,
    ready_timeout: Duration,
}

impl ContentExtractor {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, ready_timeout: Duration) -> Self {
        Self {
            launcher,
            ready_timeout,
        }
    }

    /// Fetches `url` and returns its body text.
    ///
    /// No retries here; retry policy belongs to the caller.
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult, AppError> {
        let url = parse_absolute_url(url)?;
        info!("Extracting job posting from {url}");

        let mut guard = SessionGuard::new(self.launcher.launch().await?);
        let outcome = match guard.session.as_deref() {
            Some(session) => self.read_page(session, &url).await,
            None => Err(AppError::Internal(anyhow::anyhow!(
                "browser session was released before use"
            ))),
        };
        guard.release().await;

        let text = outcome?;
        info!("Extracted {} characters from {url}", text.len());
        Ok(ExtractionResult { text })
    }

    /// Navigation and the body wait share one readiness budget.
    async fn read_page(&self, session: &dyn BrowserSession, url: &Url) -> Result<String, AppError> {
        let load = async {
            session.navigate(url).await?;
            wait_for_body(session).await
        };
        let text = tokio::time::timeout(self.ready_timeout, load)
            .await
            .map_err(|_| AppError::ExtractionTimeout(self.ready_timeout))??;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::Extraction(format!(
                "page at {url} has no visible text"
            )));
        }
        Ok(text)
    }
}

async fn wait_for_body(session: &dyn BrowserSession) -> Result<String, AppError> {
    loop {
        if let Some(text) = session.body_text().await? {
            return Ok(text);
        }
        debug!("Document body not present yet");
        tokio::time::sleep(BODY_POLL_INTERVAL).await;
    }
}

/// Accepts only absolute http(s) URLs.
pub fn parse_absolute_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::Validation(format!("'{raw}' is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(AppError::Validation(format!(
            "'{raw}' must be an absolute http(s) URL"
        ))),
    }
}
