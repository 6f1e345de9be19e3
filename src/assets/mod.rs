//! Page fragment sources.
//!
//! The composer never knows where fragments live. It asks an [`AssetSource`]
//! for three absolute URLs and receives a status plus body text back. This
//! module provides the sources the binary wires up:
//!
//! - [`HttpAssetSource`]: plain GET against the asset origin
//! - [`DirAssetSource`]: fragments read from a local directory
//! - [`BundledAssets`]: the fragments compiled into the binary
//! - [`CachedAssetSource`]: optional wrapper that remembers successful reads
//!
//! # Example
//!
//! ```
//! use oauth_token_page::assets::{AssetKind, AssetSource, BundledAssets};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let source = BundledAssets;
//! let url = AssetKind::Stylesheet.url("https://assets.example.com");
//! let response = source.fetch(&url).await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// The three fragments a page is assembled from, in fetch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// HTML template.
    Markup,
    /// Stylesheet text inlined into the template.
    Stylesheet,
    /// Behavior script inlined into the template.
    Script,
}

impl AssetKind {
    /// All fragments in the order the composer fetches them.
    pub const ALL: [AssetKind; 3] = [AssetKind::Markup, AssetKind::Stylesheet, AssetKind::Script];

    /// File name of the fragment below the asset origin.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            AssetKind::Markup => "oauth-callback.html",
            AssetKind::Stylesheet => "oauth-callback.css",
            AssetKind::Script => "oauth-callback.js",
        }
    }

    /// Absolute URL of the fragment for the given origin prefix.
    ///
    /// The prefix is concatenated as-is; callers pass it without a trailing
    /// slash.
    #[must_use]
    pub fn url(self, origin_prefix: &str) -> String {
        format!("{}/{}", origin_prefix, self.file_name())
    }

    /// Looks up a fragment by the last path segment of a URL.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let name = url.rsplit('/').next()?;
        Self::ALL.into_iter().find(|kind| kind.file_name() == name)
    }
}

/// Response from an asset source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// Body text.
    pub body: String,
}

impl AssetResponse {
    /// Creates a 200 response carrying `body`.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Creates a 404 response.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: String::from("Not Found"),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable status line, e.g. `404 Not Found`.
    #[must_use]
    pub fn status_line(&self) -> String {
        match reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
        {
            Some(reason) => format!("{} {}", self.status, reason),
            None => self.status.to_string(),
        }
    }
}

/// Capability to fetch page fragments.
///
/// Implementations return `Err` for transport-level failures and a response
/// with a non-2xx status for "reachable but unavailable".
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    /// Fetches the fragment at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the fragment could not be read at all.
    async fn fetch(&self, url: &str) -> Result<AssetResponse>;
}

impl<S: AssetSource + ?Sized> AssetSource for &S {
    async fn fetch(&self, url: &str) -> Result<AssetResponse> {
        (**self).fetch(url).await
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Fetches fragments over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: reqwest::Client,
}

impl HttpAssetSource {
    /// Creates a source whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build asset HTTP client")?;
        Ok(Self { client })
    }

    /// Creates a source around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl AssetSource for HttpAssetSource {
    async fn fetch(&self, url: &str) -> Result<AssetResponse> {
        debug!(url = %url, "Fetching asset over HTTP");
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(AssetResponse { status, body })
    }
}

// ============================================================================
// Directory
// ============================================================================

/// Serves fragments from a local directory.
///
/// Only the last path segment of the requested URL is used, so the origin
/// prefix is irrelevant and nothing outside the directory can be read.
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory fragments are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirAssetSource {
    async fn fetch(&self, url: &str) -> Result<AssetResponse> {
        let Some(kind) = AssetKind::from_url(url) else {
            return Ok(AssetResponse::not_found());
        };
        let path = self.root.join(kind.file_name());
        trace!(path = %path.display(), "Reading asset from disk");

        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(AssetResponse::ok(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AssetResponse::not_found()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}

// ============================================================================
// Bundled
// ============================================================================

const BUNDLED_MARKUP: &str = include_str!("../../assets/oauth-callback.html");
const BUNDLED_STYLESHEET: &str = include_str!("../../assets/oauth-callback.css");
const BUNDLED_SCRIPT: &str = include_str!("../../assets/oauth-callback.js");

/// The default fragments shipped with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledAssets;

impl BundledAssets {
    /// Returns the bundled text for a fragment.
    #[must_use]
    pub fn get(kind: AssetKind) -> &'static str {
        match kind {
            AssetKind::Markup => BUNDLED_MARKUP,
            AssetKind::Stylesheet => BUNDLED_STYLESHEET,
            AssetKind::Script => BUNDLED_SCRIPT,
        }
    }
}

impl AssetSource for BundledAssets {
    async fn fetch(&self, url: &str) -> Result<AssetResponse> {
        Ok(AssetKind::from_url(url)
            .map(|kind| AssetResponse::ok(Self::get(kind)))
            .unwrap_or_else(AssetResponse::not_found))
    }
}

// ============================================================================
// Caching wrapper
// ============================================================================

/// Wraps a source and remembers successful responses by URL.
///
/// Failures and non-2xx responses are never cached, so a transient outage
/// does not pin the fallback page.
#[derive(Debug)]
pub struct CachedAssetSource<S> {
    inner: S,
    cache: RwLock<HashMap<String, AssetResponse>>,
}

impl<S: AssetSource> CachedAssetSource<S> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Drops every cached response.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Number of cached responses.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Returns `true` if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}

impl<S: AssetSource> AssetSource for CachedAssetSource<S> {
    async fn fetch(&self, url: &str) -> Result<AssetResponse> {
        if let Some(hit) = self.cache.read().await.get(url) {
            trace!(url = %url, "Asset cache hit");
            return Ok(hit.clone());
        }

        let response = self.inner.fetch(url).await?;
        if response.is_success() {
            self.cache
                .write()
                .await
                .insert(url.to_string(), response.clone());
        }
        Ok(response)
    }
}

// ============================================================================
// Runtime selection
// ============================================================================

/// Asset source chosen from configuration at startup.
#[derive(Debug)]
pub enum ConfiguredAssetSource {
    /// Fetch from the origin over HTTP.
    Http(HttpAssetSource),
    /// Read from a local directory.
    Dir(DirAssetSource),
    /// Use the compiled-in fragments.
    Bundled(BundledAssets),
}

impl AssetSource for ConfiguredAssetSource {
    async fn fetch(&self, url: &str) -> Result<AssetResponse> {
        match self {
            Self::Http(source) => source.fetch(url).await,
            Self::Dir(source) => source.fetch(url).await,
            Self::Bundled(source) => source.fetch(url).await,
        }
    }
}
