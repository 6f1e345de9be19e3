//! Client side of the token page.
//!
//! The browser script shipped in `assets/oauth-callback.js` implements this
//! same machine; the Rust rendition keeps the behavior testable without a
//! browser and powers the headless `acquire` command.
//!
//! - [`normalize`]: pasted text to [`TokenEnvelope`]
//! - [`state`]: states, events, effects and the pure reducer
//! - [`runtime`]: effect interpreter over a [`Browser`]
//! - [`headless`]: reqwest-backed [`Browser`]

pub mod headless;
pub mod normalize;
pub mod runtime;
pub mod state;

pub use headless::{BrowserRecord, HeadlessBrowser};
pub use normalize::{normalize, NormalizeError, TokenEnvelope};
pub use runtime::{Browser, ClientRuntime, HttpReply};
pub use state::{
    reduce, token_fetch_url, ClientContext, ClientState, Effect, Event, StoreTokenRequest,
    SubmitOrigin, Transition, View,
};
