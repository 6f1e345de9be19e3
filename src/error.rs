//! Centralized error types for the token page.
//!
//! `PageError` covers every failure the composer and the client state machine
//! can surface. Each variant maps onto exactly one visible outcome:
//!
//! - asset and descriptor failures produce the fallback error page
//! - a 401 from the token endpoint and a bad manual paste are recoverable
//! - everything else moves the client into its terminal failed state
//!
//! # Example
//!
//! ```
//! use oauth_token_page::error::{PageError, PageResult};
//!
//! fn check_status(status: u16, body: &str) -> PageResult<()> {
//!     match status {
//!         200..=299 => Ok(()),
//!         401 => Err(PageError::TokenFetchUnauthorized),
//!         _ => Err(PageError::token_fetch_rejected(status, body)),
//!     }
//! }
//!
//! let err = check_status(500, "boom").unwrap_err();
//! assert!(err.is_terminal());
//! assert_eq!(err.to_string(), "Failed to fetch token: 500 boom");
//! ```

use std::fmt;

/// Message shown when a failure carries no usable text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Result type alias using `PageError`.
pub type PageResult<T> = Result<T, PageError>;

/// Returns the message to display for a failure, substituting
/// [`UNKNOWN_ERROR`] when the message is missing or blank.
#[must_use]
pub fn failure_message(message: Option<&str>) -> &str {
    match message.map(str::trim) {
        Some(m) if !m.is_empty() => m,
        _ => UNKNOWN_ERROR,
    }
}

/// Error type for page composition and token acquisition.
#[derive(Debug)]
pub enum PageError {
    // ============== Composition Errors ==============
    /// One of the three page fragments could not be loaded.
    AssetLoad {
        /// File name of the fragment, e.g. `oauth-callback.css`.
        asset: String,
        /// Description of the failure.
        message: String,
    },

    /// The OAuth request descriptor was not valid JSON.
    InvalidRequestInfo {
        /// Parser error description.
        message: String,
    },

    // ============== Token Fetch Errors ==============
    /// The instance URL could not be used to build the token-fetch URL.
    InvalidInstanceUrl {
        /// The offending instance URL.
        url: String,
        /// Parser error description.
        message: String,
    },

    /// Transport failure before the token endpoint answered.
    TokenFetchNetwork {
        /// Description of the transport error.
        message: String,
    },

    /// The token endpoint answered 401; third-party cookies are likely blocked.
    TokenFetchUnauthorized,

    /// The token endpoint answered with any other non-success status.
    TokenFetchRejected {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The token endpoint answered 2xx with a body that is not JSON.
    TokenFetchInvalidResponse {
        /// Parser error description.
        message: String,
    },

    // ============== Manual Entry Errors ==============
    /// Pasted text could not be turned into a token envelope.
    Normalization,

    // ============== Storage Errors ==============
    /// Transport failure while posting to `/store-token`.
    StorageNetwork {
        /// Description of the transport error.
        message: String,
    },

    /// `/store-token` answered with a non-success status.
    StorageRejected {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// `/store-token` answered 2xx without a usable `redirectTo`.
    StorageInvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    // ============== Configuration Errors ==============
    /// Invalid configuration file or value.
    Config {
        /// Description of the configuration issue.
        message: String,
    },

    // ============== Wrapped Errors ==============
    /// Error from anyhow or other sources.
    Other {
        /// The wrapped error message.
        message: String,
        /// The original error, if available.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

// ============== Constructor Methods ==============

impl PageError {
    /// Creates an asset load error.
    #[must_use]
    pub fn asset_load(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssetLoad {
            asset: asset.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid descriptor error.
    #[must_use]
    pub fn invalid_request_info(message: impl Into<String>) -> Self {
        Self::InvalidRequestInfo {
            message: message.into(),
        }
    }

    /// Creates an invalid instance URL error.
    #[must_use]
    pub fn invalid_instance_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInstanceUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a token fetch transport error.
    #[must_use]
    pub fn token_fetch_network(message: impl Into<String>) -> Self {
        Self::TokenFetchNetwork {
            message: message.into(),
        }
    }

    /// Creates a token fetch rejection.
    #[must_use]
    pub fn token_fetch_rejected(status: u16, body: impl Into<String>) -> Self {
        Self::TokenFetchRejected {
            status,
            body: body.into(),
        }
    }

    /// Creates an invalid token response error.
    #[must_use]
    pub fn token_fetch_invalid_response(message: impl Into<String>) -> Self {
        Self::TokenFetchInvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a storage transport error.
    #[must_use]
    pub fn storage_network(message: impl Into<String>) -> Self {
        Self::StorageNetwork {
            message: message.into(),
        }
    }

    /// Creates a storage rejection.
    #[must_use]
    pub fn storage_rejected(status: u16, body: impl Into<String>) -> Self {
        Self::StorageRejected {
            status,
            body: body.into(),
        }
    }

    /// Creates an invalid storage response error.
    #[must_use]
    pub fn storage_invalid_response(message: impl Into<String>) -> Self {
        Self::StorageInvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============== Category Methods ==============

impl PageError {
    /// Returns `true` if the client stays interactive after this error.
    ///
    /// A 401 leads to manual entry and a bad paste keeps the user there.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TokenFetchUnauthorized | Self::Normalization)
    }

    /// Returns `true` if this error ends the client flow.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InvalidInstanceUrl { .. }
                | Self::TokenFetchNetwork { .. }
                | Self::TokenFetchRejected { .. }
                | Self::TokenFetchInvalidResponse { .. }
                | Self::StorageNetwork { .. }
                | Self::StorageRejected { .. }
                | Self::StorageInvalidResponse { .. }
        )
    }

    /// Returns `true` if this error replaces the page with the fallback page.
    #[must_use]
    pub fn forces_fallback_page(&self) -> bool {
        matches!(
            self,
            Self::AssetLoad { .. } | Self::InvalidRequestInfo { .. }
        )
    }

    /// Returns the module name where this error originated.
    #[must_use]
    pub fn module(&self) -> &'static str {
        match self {
            Self::AssetLoad { .. } | Self::InvalidRequestInfo { .. } => "page",

            Self::InvalidInstanceUrl { .. }
            | Self::TokenFetchNetwork { .. }
            | Self::TokenFetchUnauthorized
            | Self::TokenFetchRejected { .. }
            | Self::TokenFetchInvalidResponse { .. } => "token_fetch",

            Self::Normalization => "normalize",

            Self::StorageNetwork { .. }
            | Self::StorageRejected { .. }
            | Self::StorageInvalidResponse { .. } => "storage",

            Self::Config { .. } => "config",

            Self::Other { .. } => "unknown",
        }
    }
}

// ============== Display Implementation ==============

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssetLoad { asset, message } => {
                write!(
                    f,
                    "Failed to load {}: {}",
                    asset,
                    failure_message(Some(message))
                )
            }
            Self::InvalidRequestInfo { message } => {
                write!(f, "Invalid OAuth request info: {}", message)
            }

            Self::InvalidInstanceUrl { url, message } => {
                write!(f, "Invalid instance URL '{}': {}", url, message)
            }
            Self::TokenFetchNetwork { message } | Self::StorageNetwork { message } => {
                write!(f, "{}", failure_message(Some(message)))
            }
            Self::TokenFetchUnauthorized => {
                write!(f, "Token fetch unauthorized (401)")
            }
            Self::TokenFetchRejected { status, body } => {
                write!(f, "Failed to fetch token: {} {}", status, body)
            }
            Self::TokenFetchInvalidResponse { message } => {
                write!(f, "Invalid token response: {}", message)
            }

            Self::Normalization => write!(f, "Invalid token format"),

            Self::StorageRejected { status, body } => {
                write!(f, "Failed to store token: {} {}", status, body)
            }
            Self::StorageInvalidResponse { message } => {
                write!(f, "Invalid response from token storage: {}", message)
            }

            Self::Config { message } => write!(f, "config: {}", message),

            Self::Other { message, .. } => {
                write!(f, "{}", failure_message(Some(message)))
            }
        }
    }
}

// ============== Error Implementation ==============

impl std::error::Error for PageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Other {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

// ============== Conversion Implementations ==============

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: format!("{:#}", err),
            source: None,
        }
    }
}

impl From<crate::client::normalize::NormalizeError> for PageError {
    fn from(_: crate::client::normalize::NormalizeError) -> Self {
        Self::Normalization
    }
}

// ============== Unit Tests ==============
