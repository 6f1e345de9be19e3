//! Token format normalization.
//!
//! Users paste whatever they copied from the token page: the full JSON
//! response, just the inner `"data": {...}` field, a bare quoted string, a
//! fragment of broken JSON, or the raw token itself. Every accepted shape
//! converges on one [`TokenEnvelope`].
//!
//! Shapes are tried in this order:
//!
//! 1. Text starting with `"data"` is wrapped in braces before parsing
//! 2. JSON: a string, then `data.token`, then a top-level `token`
//! 3. A `"token": "<value>"` pattern anywhere in the text
//! 4. The trimmed text itself, if non-empty
//!
//! # Example
//!
//! ```
//! use oauth_token_page::client::normalize::{normalize, TokenEnvelope};
//!
//! let envelope = normalize(r#"{"token": "x"}"#).unwrap();
//! assert_eq!(envelope, TokenEnvelope::new("x"));
//! assert!(normalize("   ").is_err());
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Matches a quoted `token` field in otherwise malformed JSON.
static TOKEN_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""token"\s*:\s*"([^"]*)""#).expect("valid token pattern"));

/// Canonical token payload: `{ "data": { "token": "<token>" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEnvelope {
    /// Wrapper object.
    pub data: TokenData,
}

/// Inner object of a [`TokenEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    /// The token value, forwarded verbatim.
    pub token: String,
}

impl TokenEnvelope {
    /// Wraps `token` in the canonical shape.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            data: TokenData {
                token: token.into(),
            },
        }
    }

    /// Returns the token value.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.data.token
    }

    /// Returns the envelope as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "data": { "token": self.data.token } })
    }
}

/// Why pasted text could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Nothing but whitespace was pasted.
    #[error("Invalid token format")]
    Empty,
}

/// Normalizes pasted token text into a [`TokenEnvelope`].
///
/// # Errors
///
/// Returns [`NormalizeError::Empty`] for empty or whitespace-only input.
pub fn normalize(raw: &str) -> Result<TokenEnvelope, NormalizeError> {
    let trimmed = raw.trim();

    let candidate = if trimmed.starts_with("\"data\"") {
        format!("{{{}}}", trimmed)
    } else {
        raw.to_string()
    };

    if let Ok(parsed) = serde_json::from_str::<Value>(&candidate) {
        if let Some(token) = token_from_json(&parsed) {
            return Ok(TokenEnvelope::new(token));
        }
    }

    if let Some(captures) = TOKEN_FIELD.captures(raw) {
        return Ok(TokenEnvelope::new(&captures[1]));
    }

    if trimmed.is_empty() {
        return Err(NormalizeError::Empty);
    }
    Ok(TokenEnvelope::new(trimmed))
}

fn token_from_json(parsed: &Value) -> Option<&str> {
    if let Some(token) = parsed.as_str() {
        return Some(token);
    }
    if let Some(token) = parsed
        .get("data")
        .and_then(|data| data.get("token"))
        .and_then(Value::as_str)
    {
        return Some(token);
    }
    parsed.get("token").and_then(Value::as_str)
}
