//! Page composition.
//!
//! Builds the token-acquisition page from three fragments. The flow is:
//!
//! 1. Fetch markup, stylesheet and script, in that order
//! 2. Inline the stylesheet in place of its `<link>` tag
//! 3. Inline the script in place of its `<script src>` tag, prefixed with the
//!    `window.INSTANCE_URL` global
//! 4. Substitute the OAuth request descriptor into its JSON data block
//!
//! If any fragment fails, the whole result is the fallback error page.
//!
//! # Example
//!
//! ```
//! use oauth_token_page::assets::BundledAssets;
//! use oauth_token_page::page::{OAuthRequestInfo, PageComposer};
//! use serde_json::json;
//!
//! # async fn example() {
//! let composer = PageComposer::new(BundledAssets, "https://assets.example.com");
//! let info = OAuthRequestInfo::new(json!({ "clientId": "c1" }));
//! let page = composer.render("https://foo.thoughtspot.cloud", &info).await;
//! assert!(!page.is_fallback());
//! # }
//! ```

pub mod fallback;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::assets::{AssetKind, AssetSource};
use crate::error::{PageError, PageResult};
use crate::json::RawJson;

/// Stylesheet reference in the markup, replaced by the inlined stylesheet.
pub const STYLESHEET_LINK: &str = r#"<link rel="stylesheet" href="oauth-callback.css">"#;

/// Script reference in the markup, replaced by the inlined script.
pub const SCRIPT_TAG: &str = r#"<script src="oauth-callback.js"></script>"#;

/// Placeholder for the serialized descriptor.
pub const OAUTH_REQ_INFO_PLACEHOLDER: &str = "{{OAUTH_REQ_INFO}}";

/// Name of the global carrying the instance URL.
pub const INSTANCE_URL_GLOBAL: &str = "window.INSTANCE_URL";

/// Opaque OAuth request descriptor.
///
/// Carried verbatim into the page and back to `/store-token`; its fields are
/// never read. A descriptor parsed from text keeps that text exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OAuthRequestInfo(RawJson);

impl OAuthRequestInfo {
    /// Wraps an already-parsed descriptor.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(RawJson::from_value(&value))
    }

    /// Parses a descriptor from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidRequestInfo`] if `json` is not valid JSON.
    pub fn parse(json: &str) -> PageResult<Self> {
        RawJson::parse(json)
            .map(Self)
            .map_err(|e| PageError::invalid_request_info(e.to_string()))
    }

    /// Returns the descriptor's JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the descriptor as a value, keeping key order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.0.to_value()
    }

    /// Serializes the descriptor for a `<script type="application/json">`
    /// block.
    ///
    /// Characters that could end the element or confuse an HTML parser are
    /// written as JSON unicode escapes, which parse back to the same value.
    /// They can only occur inside strings, so nothing else changes.
    #[must_use]
    pub fn to_embedded_json(&self) -> String {
        escape_script_json(self.0.as_str())
    }
}

impl FromStr for OAuthRequestInfo {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Value> for OAuthRequestInfo {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Kind of page produced by the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// All fragments loaded and were inlined.
    Composed,
    /// The self-contained error page.
    Fallback,
}

/// The HTML document sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    html: String,
    kind: PageKind,
}

impl RenderedPage {
    /// Returns the document text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.html
    }

    /// Consumes the page, returning the document text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.html
    }

    /// Returns which kind of page this is.
    #[must_use]
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// Returns `true` for the fallback error page.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.kind == PageKind::Fallback
    }
}

impl fmt::Display for RenderedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html)
    }
}

/// The three fragment texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragments {
    /// HTML template.
    pub markup: String,
    /// Stylesheet text.
    pub stylesheet: String,
    /// Behavior script text.
    pub script: String,
}

/// Composes pages from an asset source.
#[derive(Debug)]
pub struct PageComposer<S> {
    source: S,
    origin_prefix: String,
}

impl<S: AssetSource> PageComposer<S> {
    /// Creates a composer fetching fragments from `origin_prefix` via `source`.
    #[must_use]
    pub fn new(source: S, origin_prefix: impl Into<String>) -> Self {
        let mut origin_prefix = origin_prefix.into();
        if origin_prefix.ends_with('/') {
            origin_prefix.pop();
        }
        Self {
            source,
            origin_prefix,
        }
    }

    /// Returns the origin prefix fragments are fetched from.
    #[must_use]
    pub fn origin_prefix(&self) -> &str {
        &self.origin_prefix
    }

    /// Renders the page for `instance_url` and `oauth_req_info`.
    ///
    /// Never fails: any fragment failure yields the fallback page.
    pub async fn render(
        &self,
        instance_url: &str,
        oauth_req_info: &OAuthRequestInfo,
    ) -> RenderedPage {
        match self.load_fragments().await {
            Ok(fragments) => {
                let html = compose(&fragments, instance_url, oauth_req_info);
                info!(
                    instance_url = %instance_url,
                    bytes = html.len(),
                    "Composed token page"
                );
                RenderedPage {
                    html,
                    kind: PageKind::Composed,
                }
            }
            Err(err) => serve_fallback(&err),
        }
    }

    /// Renders the page from a descriptor given as JSON text.
    ///
    /// An unparseable descriptor yields the fallback page.
    pub async fn render_json(&self, instance_url: &str, oauth_req_info: &str) -> RenderedPage {
        match OAuthRequestInfo::parse(oauth_req_info) {
            Ok(info) => self.render(instance_url, &info).await,
            Err(err) => serve_fallback(&err),
        }
    }

    /// Fetches all three fragments, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::AssetLoad`] naming the first fragment that failed.
    pub async fn load_fragments(&self) -> PageResult<Fragments> {
        let markup = self.fetch_fragment(AssetKind::Markup).await?;
        let stylesheet = self.fetch_fragment(AssetKind::Stylesheet).await?;
        let script = self.fetch_fragment(AssetKind::Script).await?;
        Ok(Fragments {
            markup,
            stylesheet,
            script,
        })
    }

    async fn fetch_fragment(&self, kind: AssetKind) -> PageResult<String> {
        let url = kind.url(&self.origin_prefix);
        debug!(asset = kind.file_name(), url = %url, "Loading page fragment");

        let response = self
            .source
            .fetch(&url)
            .await
            .map_err(|e| PageError::asset_load(kind.file_name(), format!("{:#}", e)))?;

        if !response.is_success() {
            return Err(PageError::asset_load(kind.file_name(), response.status_line()));
        }
        Ok(response.body)
    }
}

/// Logs `err` and renders the fallback page for it.
///
/// Fragment and descriptor failures are the expected causes; anything else
/// still gets the fallback page but is logged as an error.
fn serve_fallback(err: &PageError) -> RenderedPage {
    if err.forces_fallback_page() {
        warn!(module = err.module(), error = %err, "Serving fallback error page");
    } else {
        error!(module = err.module(), error = %err, "Unexpected page error, serving fallback");
    }
    fallback::error_page_for(err)
}

/// Renders a page in one call.
///
/// Equivalent to `PageComposer::new(source, origin_prefix).render(..)`.
pub async fn render_page<S: AssetSource>(
    instance_url: &str,
    oauth_req_info: &OAuthRequestInfo,
    source: S,
    origin_prefix: &str,
) -> RenderedPage {
    PageComposer::new(source, origin_prefix)
        .render(instance_url, oauth_req_info)
        .await
}

/// Inlines the fragments and substitutes the instance URL and descriptor.
///
/// Each marker is replaced once, at its position in the original markup, so
/// fragment or descriptor text can never be mistaken for a marker.
#[must_use]
pub fn compose(
    fragments: &Fragments,
    instance_url: &str,
    oauth_req_info: &OAuthRequestInfo,
) -> String {
    let style = format!("<style>\n{}\n</style>", fragments.stylesheet);
    let script = format!(
        "<script>\n{} = {};\n{}\n</script>",
        INSTANCE_URL_GLOBAL,
        js_string_literal(instance_url),
        fragments.script
    );
    let descriptor = oauth_req_info.to_embedded_json();

    splice(
        &fragments.markup,
        &[
            (STYLESHEET_LINK, style),
            (SCRIPT_TAG, script),
            (OAUTH_REQ_INFO_PLACEHOLDER, descriptor),
        ],
    )
}

fn splice(markup: &str, replacements: &[(&str, String)]) -> String {
    let mut found: Vec<(usize, &str, &str)> = replacements
        .iter()
        .filter_map(|(marker, text)| match markup.find(marker) {
            Some(at) => Some((at, *marker, text.as_str())),
            None => {
                warn!(marker = %marker, "Markup is missing a substitution marker");
                None
            }
        })
        .collect();
    found.sort_by_key(|(at, ..)| *at);

    let extra: usize = found.iter().map(|(_, _, text)| text.len()).sum();
    let mut out = String::with_capacity(markup.len() + extra);
    let mut cursor = 0;
    for (at, marker, text) in found {
        if at < cursor {
            continue;
        }
        out.push_str(&markup[cursor..at]);
        out.push_str(text);
        cursor = at + marker.len();
    }
    out.push_str(&markup[cursor..]);
    out
}

/// Writes `value` as a JavaScript string literal safe inside `<script>`.
fn js_string_literal(value: &str) -> String {
    escape_script_json(&Value::String(value.to_string()).to_string())
}

fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Extracts the descriptor JSON embedded in a composed page.
///
/// Returns `None` if the page has no `oauth-req-info` block.
#[must_use]
pub fn extract_embedded_request_info(html: &str) -> Option<Value> {
    let open = r#"<script type="application/json" id="oauth-req-info">"#;
    let start = html.find(open)? + open.len();
    let len = html[start..].find("</script>")?;
    serde_json::from_str(&html[start..start + len]).ok()
}
