//! Headless Chrome over WebDriver. Requires a running chromedriver (or any
//! W3C WebDriver endpoint) at `WEBDRIVER_URL`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::extraction::{BrowserLauncher, BrowserSession};

const CHROME_ARGS: [&str; 4] = [
    "--headless",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
];

/// Launches one headless Chrome session per extraction.
pub struct WebDriverLauncher {
    server_url: String,
    page_load_timeout: Duration,
}

impl WebDriverLauncher {
    pub fn new(server_url: impl Into<String>, page_load_timeout: Duration) -> Self {
        Self {
            server_url: server_url.into(),
            page_load_timeout,
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, AppError> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in CHROME_ARGS {
            caps.add_chrome_arg(arg).map_err(browser_error)?;
        }

        let driver = WebDriver::new(&self.server_url, caps)
            .await
            .map_err(|e| AppError::Extraction(format!("could not start browser session: {e}")))?;

        // Navigation must not outlive the readiness budget either.
        let timeout_set = driver.set_page_load_timeout(self.page_load_timeout).await;
        if let Err(e) = timeout_set {
            let _ = driver.quit().await;
            return Err(browser_error(e));
        }

        debug!("Browser session started via {}", self.server_url);
        Ok(Box::new(WebDriverSession {
            driver,
            page_load_timeout: self.page_load_timeout,
        }))
    }
}

struct WebDriverSession {
    driver: WebDriver,
    page_load_timeout: Duration,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &Url) -> Result<(), AppError> {
        match self.driver.goto(url.as_str()).await {
            Ok(()) => Ok(()),
            Err(WebDriverError::Timeout(_)) => {
                Err(AppError::ExtractionTimeout(self.page_load_timeout))
            }
            Err(e) => Err(AppError::Extraction(format!("navigation to {url} failed: {e}"))),
        }
    }

    async fn body_text(&self) -> Result<Option<String>, AppError> {
        match self.driver.find(By::Tag("body")).await {
            Ok(body) => body.text().await.map(Some).map_err(browser_error),
            Err(WebDriverError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(browser_error(e)),
        }
    }

    async fn close(self: Box<Self>) {
        match self.driver.quit().await {
            Ok(()) => debug!("Browser session closed"),
            Err(e) => warn!("Failed to close browser session cleanly: {e}"),
        }
    }
}

fn browser_error(e: WebDriverError) -> AppError {
    AppError::Extraction(format!("browser error: {e}"))
}
