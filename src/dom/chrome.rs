use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{DomDocument, DomError, DomErrorKind, DomProvider, DomResult, HtmlDocument};
use crate::config::ScraperConfig;
use crate::utils::error::AppError;

/// Opens pages in a freshly launched headless Chrome and hands back a
/// parsed snapshot of the rendered markup. The browser lives only for the
/// duration of [`DomProvider::open`].
pub struct ChromeDomProvider {
    config: ScraperConfig,
}

/// Closes the tab on every exit path, including early returns on error.
struct TabGuard {
    tab: Arc<Tab>,
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        let _ = self.tab.close(true);
    }
}

impl ChromeDomProvider {
    /// Launches Chrome once to prove it is usable. Failing here is the
    /// only fatal error the watcher reports.
    pub fn connect(config: ScraperConfig) -> Result<Self, AppError> {
        let provider = Self { config };
        let browser = provider
            .launch()
            .map_err(|e| AppError::StartupConfiguration(e.message))?;
        drop(browser);
        tracing::info!("Chrome is available");
        Ok(provider)
    }

    fn launch(&self) -> DomResult<Browser> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(self.config.headless)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .idle_browser_timeout(Duration::from_secs(self.config.request_timeout * 4))
            .build()
            .map_err(|e| DomError::navigation(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &self.config.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        Browser::new(launch_options)
            .map_err(|e| DomError::navigation(format!("Failed to launch browser: {}", e)))
    }

    fn fetch_markup(&self, browser: &Browser, url: &str) -> DomResult<String> {
        let tab = browser
            .new_tab()
            .map_err(|e| DomError::navigation(format!("Failed to create tab: {}", e)))?;
        let guard = TabGuard { tab };

        guard
            .tab
            .set_default_timeout(Duration::from_secs(self.config.request_timeout));
        guard
            .tab
            .set_user_agent(&self.config.user_agent, None, None)
            .map_err(|e| DomError::navigation(format!("Failed to set user agent: {}", e)))?;

        guard
            .tab
            .navigate_to(url)
            .map_err(|e| DomError::navigation(format!("Navigation failed: {}", e)))?;
        guard
            .tab
            .wait_until_navigated()
            .map_err(|e| DomError::navigation(format!("Page load failed: {}", e)))?;

        // Fixed settle time for client-side rendering.
        std::thread::sleep(Duration::from_millis(self.config.page_settle_ms));

        guard
            .tab
            .get_content()
            .map_err(|e| DomError::new(DomErrorKind::Query, format!("Failed to get page content: {}", e)))
    }
}

impl DomProvider for ChromeDomProvider {
    fn open(&self, url: &str) -> DomResult<Box<dyn DomDocument>> {
        tracing::debug!("Loading {}", url);
        let browser = self.launch()?;
        let html = self.fetch_markup(&browser, url)?;
        tracing::debug!("Captured {} bytes of markup from {}", html.len(), url);
        Ok(Box::new(HtmlDocument::parse(&html)))
    }
}
