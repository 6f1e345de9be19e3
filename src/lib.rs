//! OAuth token-acquisition page.
//!
//! Two independent halves joined only by the markup/JSON contract:
//!
//! - [`page`] composes the HTML document from three fragments (or serves the
//!   fallback error page)
//! - [`client`] is the state machine that document runs in the browser:
//!   silent credentialed token fetch, manual paste on 401, submission to
//!   `/store-token`, redirect

pub mod assets;
pub mod client;
pub mod config;
pub mod error;
pub mod json;
pub mod page;

// Re-export core types for convenient access
pub use client::{normalize, ClientRuntime, ClientState, TokenEnvelope};
pub use config::PageConfig;
pub use error::{PageError, PageResult};
pub use json::RawJson;
pub use page::{render_page, OAuthRequestInfo, PageComposer, RenderedPage};
