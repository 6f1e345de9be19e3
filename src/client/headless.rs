//! Headless [`Browser`] backed by reqwest.
//!
//! Used by the `acquire` command and by integration tests. The cookie store
//! stands in for the browser's credential handling, `/store-token` is resolved
//! against the page origin, and navigation is recorded instead of performed.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use url::Url;

use super::runtime::{Browser, HttpReply};
use super::state::{StoreTokenRequest, View, STORE_TOKEN_PATH};

/// What happened in a headless page load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserRecord {
    /// Every view rendered, in order.
    pub views: Vec<View>,
    /// URLs opened in a new context.
    pub opened: Vec<Url>,
    /// Number of history-back requests.
    pub history_back: usize,
    /// Final navigation target, if any.
    pub location: Option<String>,
}

/// Browser without a window.
#[derive(Debug)]
pub struct HeadlessBrowser {
    client: reqwest::Client,
    page_origin: Url,
    open_system_browser: bool,
    record: Mutex<BrowserRecord>,
}

impl HeadlessBrowser {
    /// Creates a browser for a page served from `page_origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `page_origin` is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(page_origin: &str) -> Result<Self> {
        let page_origin = Url::parse(page_origin)
            .with_context(|| format!("Invalid page origin '{}'", page_origin))?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            page_origin,
            open_system_browser: false,
            record: Mutex::new(BrowserRecord::default()),
        })
    }

    /// Also opens new-context URLs in the system browser.
    #[must_use]
    pub fn with_system_browser(mut self, enabled: bool) -> Self {
        self.open_system_browser = enabled;
        self
    }

    /// Snapshot of what has happened so far.
    #[must_use]
    pub fn record(&self) -> BrowserRecord {
        self.lock().clone()
    }

    /// The storage endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined to the page origin.
    pub fn store_token_url(&self) -> Result<Url> {
        self.page_origin
            .join(STORE_TOKEN_PATH)
            .context("Failed to resolve store-token URL")
    }

    fn lock(&self) -> MutexGuard<'_, BrowserRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Browser for HeadlessBrowser {
    async fn fetch_token(&self, url: &Url) -> Result<HttpReply> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "Token endpoint responded");
        Ok(HttpReply { status, body })
    }

    async fn store_token(&self, request: &StoreTokenRequest) -> Result<HttpReply> {
        let response = self
            .client
            .post(self.store_token_url()?)
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "Storage endpoint responded");
        Ok(HttpReply { status, body })
    }

    fn open_in_new_context(&self, url: &Url) {
        if self.open_system_browser {
            if let Err(e) = webbrowser::open(url.as_str()) {
                warn!(error = %e, "Failed to open browser automatically");
            } else {
                info!(url = %url, "Opened token page in browser");
            }
        }
        self.lock().opened.push(url.clone());
    }

    fn history_back(&self) {
        self.lock().history_back += 1;
    }

    fn navigate(&self, to: &str) {
        self.lock().location = Some(to.to_string());
    }

    fn render(&self, view: &View) {
        self.lock().views.push(view.clone());
    }
}
