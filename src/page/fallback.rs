//! Fallback error page.
//!
//! Served whenever the real page cannot be composed. The document is fully
//! self-contained: inline style, no scripts, no external references.

use super::{PageKind, RenderedPage};
use crate::error::{failure_message, PageError};

/// Fixed document title of the fallback page.
pub const ERROR_TITLE: &str = "Error - ThoughtSpot Authorization";

/// Fixed heading of the fallback page.
pub const ERROR_HEADING: &str = "Authorization Error";

/// Static explanatory line.
pub const ERROR_EXPLANATION: &str = "There was an error loading the authorization page.";

/// Renders the fallback page for `err`.
#[must_use]
pub fn error_page_for(err: &PageError) -> RenderedPage {
    error_page(&err.to_string())
}

/// Renders the fallback page showing `message`.
///
/// A blank message is shown as `Unknown error`. The message is HTML-escaped.
#[must_use]
pub fn error_page(message: &str) -> RenderedPage {
    let message = escape_html(failure_message(Some(message)));
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{ERROR_TITLE}</title>
  <style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 40px; color: #1d232f; }}
    h1 {{ color: #c62828; }}
    #error-message {{ font-family: ui-monospace, Menlo, monospace; white-space: pre-wrap; }}
  </style>
</head>
<body>
  <h1>{ERROR_HEADING}</h1>
  <p>{ERROR_EXPLANATION}</p>
  <p id="error-message">Error: {message}</p>
</body>
</html>
"#
    );

    RenderedPage {
        html,
        kind: PageKind::Fallback,
    }
}

/// Escapes text for use in HTML element content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
