//! Client state machine.
//!
//! The page's behavior is a pure reducer: [`reduce`] takes the current
//! [`ClientState`] and an [`Event`] and returns the next state together with
//! the [`Effect`]s to perform. Nothing here touches the network or a DOM; the
//! runtime shell in [`super::runtime`] interprets effects and feeds their
//! outcomes back in as events.
//!
//! ```text
//! Loading ──2xx──▶ Submitting(Automatic) ──2xx──▶ SuccessRedirecting
//!    │                                        └─err──▶ Failed
//!    ├──401──▶ ManualFallback ──submit ok──▶ Submitting(Manual) ──▶ ...
//!    │              └──bad paste──▶ ManualFallback (notice)
//!    └──other / network──▶ Failed
//! ```

use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::normalize::normalize;
use crate::error::{PageError, PageResult};
use crate::json::RawJson;
use crate::page::OAuthRequestInfo;

/// Token-fetch path, resolved relative to the instance URL.
pub const TOKEN_FETCH_PATH: &str = "callosum/v1/v2/auth/token/fetch?validity_time_in_sec=2592000";

/// Storage endpoint on the host serving the page.
pub const STORE_TOKEN_PATH: &str = "/store-token";

const HEADING_IN_PROGRESS: &str = "Completing Authorization";
const HEADING_FAILED: &str = "Authorization Failed";

/// Builds the token-fetch URL for `instance_url`.
///
/// # Errors
///
/// Returns [`PageError::InvalidInstanceUrl`] if the instance URL is not an
/// absolute URL.
pub fn token_fetch_url(instance_url: &str) -> PageResult<Url> {
    Url::parse(instance_url)
        .and_then(|base| base.join(TOKEN_FETCH_PATH))
        .map_err(|e| PageError::invalid_instance_url(instance_url, e.to_string()))
}

/// Per-page-load values the state machine closes over.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientContext {
    instance_url: String,
    oauth_req_info: OAuthRequestInfo,
}

impl ClientContext {
    /// Creates the context for one page load.
    #[must_use]
    pub fn new(instance_url: impl Into<String>, oauth_req_info: OAuthRequestInfo) -> Self {
        Self {
            instance_url: instance_url.into(),
            oauth_req_info,
        }
    }

    /// The instance URL injected into the page.
    #[must_use]
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// The descriptor embedded in the page.
    #[must_use]
    pub fn oauth_req_info(&self) -> &OAuthRequestInfo {
        &self.oauth_req_info
    }

    fn store_request(&self, token: RawJson) -> StoreTokenRequest {
        StoreTokenRequest {
            token,
            oauth_req_info: self.oauth_req_info.clone(),
            instance_url: self.instance_url.clone(),
        }
    }
}

/// Body posted to `/store-token`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreTokenRequest {
    /// Token response text as received (automatic path) or a token envelope
    /// (manual path).
    pub token: RawJson,
    /// The descriptor, unchanged.
    pub oauth_req_info: OAuthRequestInfo,
    /// The instance URL, unchanged.
    pub instance_url: String,
}

/// How the token being submitted was obtained.
///
/// The automatic path forwards the instance's response body as-is; the manual
/// path always forwards a normalized envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOrigin {
    /// Silent credentialed fetch succeeded.
    Automatic,
    /// User pasted the token.
    Manual,
}

/// UI states of a running page.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientState {
    /// Token fetch in flight.
    Loading,
    /// Silent fetch was refused with 401; waiting for a pasted token.
    ManualFallback {
        /// URL the user can open to copy the token.
        token_url: Url,
        /// Whether the informational banner is still shown.
        banner_visible: bool,
        /// Corrective message after a bad paste.
        notice: Option<String>,
    },
    /// Token being posted to `/store-token`.
    Submitting {
        /// Where the token came from.
        origin: SubmitOrigin,
    },
    /// Storage accepted the token; the browser is navigating away.
    SuccessRedirecting {
        /// Navigation target returned by storage.
        redirect_to: String,
    },
    /// Terminal failure.
    Failed {
        /// Message shown to the user.
        message: String,
    },
}

impl ClientState {
    /// Returns `true` for states no event can leave.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SuccessRedirecting { .. } | Self::Failed { .. })
    }

    /// Short state name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::ManualFallback { .. } => "manual-fallback",
            Self::Submitting { .. } => "submitting",
            Self::SuccessRedirecting { .. } => "success-redirecting",
            Self::Failed { .. } => "failed",
        }
    }

    /// Derives what the page shows in this state.
    #[must_use]
    pub fn view(&self) -> View {
        let in_progress = |status: &str| View {
            heading: HEADING_IN_PROGRESS.to_string(),
            status_text: status.to_string(),
            status_is_error: false,
            progress_visible: true,
            progress_animating: true,
            manual_entry_visible: false,
            banner_visible: false,
            manual_notice: None,
        };

        match self {
            Self::Loading => in_progress("Retrieving your token..."),
            Self::Submitting {
                origin: SubmitOrigin::Automatic,
            } => in_progress("Token retrieved. Completing authorization..."),
            Self::Submitting {
                origin: SubmitOrigin::Manual,
            } => in_progress("Completing authorization..."),
            Self::SuccessRedirecting { .. } => in_progress("Authorization complete. Redirecting..."),
            Self::ManualFallback {
                banner_visible,
                notice,
                ..
            } => View {
                heading: HEADING_IN_PROGRESS.to_string(),
                status_text: String::new(),
                status_is_error: false,
                progress_visible: false,
                progress_animating: false,
                manual_entry_visible: true,
                banner_visible: *banner_visible,
                manual_notice: notice.clone(),
            },
            Self::Failed { message } => View {
                heading: HEADING_FAILED.to_string(),
                status_text: message.clone(),
                status_is_error: true,
                progress_visible: true,
                progress_animating: false,
                manual_entry_visible: false,
                banner_visible: false,
                manual_notice: None,
            },
        }
    }
}

/// What the page displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Main heading.
    pub heading: String,
    /// Text of the status region.
    pub status_text: String,
    /// Status region styled as an error.
    pub status_is_error: bool,
    /// Progress indicator shown.
    pub progress_visible: bool,
    /// Progress indicator animating.
    pub progress_animating: bool,
    /// Manual-entry section shown.
    pub manual_entry_visible: bool,
    /// Informational banner shown.
    pub banner_visible: bool,
    /// Message under the manual-entry textarea.
    pub manual_notice: Option<String>,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Page finished loading.
    Started,
    /// Token fetch failed before a response arrived.
    TokenFetchFailed {
        /// Transport error message.
        message: String,
    },
    /// Token endpoint answered.
    TokenFetched {
        /// HTTP status.
        status: u16,
        /// Body text.
        body: String,
    },
    /// User clicked the token page link.
    OpenTokenPage,
    /// User clicked back.
    Back,
    /// User dismissed the informational banner.
    DismissBanner,
    /// User submitted the textarea.
    ManualSubmit {
        /// Textarea contents.
        input: String,
    },
    /// Posting to `/store-token` failed before a response arrived.
    StoreFailed {
        /// Transport error message.
        message: String,
    },
    /// `/store-token` answered.
    Stored {
        /// HTTP status.
        status: u16,
        /// Body text.
        body: String,
    },
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Credentialed GET of the token-fetch URL.
    FetchToken {
        /// Token-fetch URL.
        url: Url,
    },
    /// Open a URL in a new browsing context.
    OpenInNewContext {
        /// URL to open.
        url: Url,
    },
    /// Browser history back.
    HistoryBack,
    /// POST to `/store-token`.
    StoreToken {
        /// Request body.
        request: StoreTokenRequest,
    },
    /// Navigate the page.
    Navigate {
        /// Target location.
        to: String,
    },
}

/// Result of one reducer step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Next state.
    pub state: ClientState,
    /// Effects to perform, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: ClientState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(state: ClientState, effect: Effect) -> Self {
        Self {
            state,
            effects: vec![effect],
        }
    }

    fn fail(err: PageError) -> Self {
        debug_assert!(err.is_terminal(), "{err:?} is not terminal");
        Self::to(ClientState::Failed {
            message: err.to_string(),
        })
    }
}

/// Applies `event` to `state`.
///
/// Events that do not apply to the current state leave it unchanged and
/// request no effects.
#[must_use]
pub fn reduce(ctx: &ClientContext, state: ClientState, event: Event) -> Transition {
    match (state, event) {
        (ClientState::Loading, Event::Started) => match token_fetch_url(ctx.instance_url()) {
            Ok(url) => Transition::with(ClientState::Loading, Effect::FetchToken { url }),
            Err(err) => Transition::fail(err),
        },

        (ClientState::Loading, Event::TokenFetchFailed { message }) => {
            Transition::fail(PageError::token_fetch_network(message))
        }

        (ClientState::Loading, Event::TokenFetched { status, body }) => {
            match token_from_reply(status, &body) {
                Ok(token) => Transition::with(
                    ClientState::Submitting {
                        origin: SubmitOrigin::Automatic,
                    },
                    Effect::StoreToken {
                        request: ctx.store_request(token),
                    },
                ),
                Err(err) if err.is_recoverable() => match token_fetch_url(ctx.instance_url()) {
                    Ok(token_url) => Transition::to(ClientState::ManualFallback {
                        token_url,
                        banner_visible: true,
                        notice: None,
                    }),
                    Err(err) => Transition::fail(err),
                },
                Err(err) => Transition::fail(err),
            }
        }

        (
            ClientState::ManualFallback {
                token_url,
                banner_visible,
                notice,
            },
            Event::OpenTokenPage,
        ) => {
            let url = token_url.clone();
            Transition::with(
                ClientState::ManualFallback {
                    token_url,
                    banner_visible,
                    notice,
                },
                Effect::OpenInNewContext { url },
            )
        }

        (state @ ClientState::ManualFallback { .. }, Event::Back) => {
            Transition::with(state, Effect::HistoryBack)
        }

        (ClientState::ManualFallback { token_url, notice, .. }, Event::DismissBanner) => {
            Transition::to(ClientState::ManualFallback {
                token_url,
                banner_visible: false,
                notice,
            })
        }

        (
            ClientState::ManualFallback {
                token_url,
                banner_visible,
                ..
            },
            Event::ManualSubmit { input },
        ) => match normalize(&input) {
            Ok(envelope) => Transition::with(
                ClientState::Submitting {
                    origin: SubmitOrigin::Manual,
                },
                Effect::StoreToken {
                    request: ctx.store_request(RawJson::from_value(&envelope.to_value())),
                },
            ),
            Err(err) => Transition::to(ClientState::ManualFallback {
                token_url,
                banner_visible,
                notice: Some(PageError::from(err).to_string()),
            }),
        },

        (ClientState::Submitting { .. }, Event::StoreFailed { message }) => {
            Transition::fail(PageError::storage_network(message))
        }

        (ClientState::Submitting { .. }, Event::Stored { status, body }) => {
            if !is_success(status) {
                return Transition::fail(PageError::storage_rejected(status, body));
            }
            match redirect_target(&body) {
                Ok(to) => Transition::with(
                    ClientState::SuccessRedirecting {
                        redirect_to: to.clone(),
                    },
                    Effect::Navigate { to },
                ),
                Err(err) => Transition::fail(err),
            }
        }

        (state, _) => Transition::to(state),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Classifies a token endpoint reply.
///
/// A 2xx JSON body is kept as received. A 401 is the recoverable
/// [`PageError::TokenFetchUnauthorized`]; every other outcome is terminal.
fn token_from_reply(status: u16, body: &str) -> PageResult<RawJson> {
    if status == 401 {
        return Err(PageError::TokenFetchUnauthorized);
    }
    if !is_success(status) {
        return Err(PageError::token_fetch_rejected(status, body));
    }
    RawJson::parse(body).map_err(|e| PageError::token_fetch_invalid_response(e.to_string()))
}

fn redirect_target(body: &str) -> PageResult<String> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| PageError::storage_invalid_response(e.to_string()))?;
    parsed
        .get("redirectTo")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PageError::storage_invalid_response("missing redirectTo"))
}
