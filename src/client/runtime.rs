//! Effect-interpreting shell around the reducer.
//!
//! [`ClientRuntime`] owns the current state, feeds events through
//! [`reduce`], renders every new state, and performs the requested effects via
//! a [`Browser`]. Network effects produce follow-up events, which are
//! processed until the queue drains. There are no retries and no timers: a
//! failed call leads straight to the next state.

use std::collections::VecDeque;

use anyhow::Result;
use tracing::{debug, info, warn};
use url::Url;

use super::state::{reduce, ClientContext, ClientState, Effect, Event, StoreTokenRequest, View};

/// Status and body text of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Body text.
    pub body: String,
}

/// The environment the page runs in.
///
/// Network methods return `Err` only when no response was obtained at all;
/// any HTTP status, including errors, is an `Ok` reply.
#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Credentialed GET of the token-fetch URL.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn fetch_token(&self, url: &Url) -> Result<HttpReply>;

    /// POSTs `request` as JSON to `/store-token`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn store_token(&self, request: &StoreTokenRequest) -> Result<HttpReply>;

    /// Opens `url` in a new browsing context.
    fn open_in_new_context(&self, url: &Url);

    /// Navigates back in history.
    fn history_back(&self);

    /// Navigates the page to `to`.
    fn navigate(&self, to: &str);

    /// Displays `view`.
    fn render(&self, view: &View);
}

/// Drives one page load.
#[derive(Debug)]
pub struct ClientRuntime<B> {
    ctx: ClientContext,
    state: ClientState,
    browser: B,
}

impl<B: Browser> ClientRuntime<B> {
    /// Creates a runtime in the `Loading` state.
    #[must_use]
    pub fn new(ctx: ClientContext, browser: B) -> Self {
        Self {
            ctx,
            state: ClientState::Loading,
            browser,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// The browser effects are performed on.
    #[must_use]
    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Runs the page-load sequence.
    pub async fn start(&mut self) -> &ClientState {
        self.browser.render(&self.state.view());
        self.dispatch(Event::Started).await
    }

    /// Submits pasted token text.
    pub async fn submit_manual(&mut self, input: impl Into<String>) -> &ClientState {
        self.dispatch(Event::ManualSubmit {
            input: input.into(),
        })
        .await
    }

    /// Clicks the token page link.
    pub async fn open_token_page(&mut self) -> &ClientState {
        self.dispatch(Event::OpenTokenPage).await
    }

    /// Clicks the back control.
    pub async fn back(&mut self) -> &ClientState {
        self.dispatch(Event::Back).await
    }

    /// Dismisses the informational banner.
    pub async fn dismiss_banner(&mut self) -> &ClientState {
        self.dispatch(Event::DismissBanner).await
    }

    /// Applies `event` and everything it leads to.
    pub async fn dispatch(&mut self, event: Event) -> &ClientState {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let previous = std::mem::replace(&mut self.state, ClientState::Loading);
            let from = previous.name();
            let transition = reduce(&self.ctx, previous, event);
            self.state = transition.state;

            debug!(from, to = self.state.name(), "Client transition");
            if let ClientState::Failed { message } = &self.state {
                warn!(error = %message, "Token acquisition failed");
            }
            self.browser.render(&self.state.view());

            for effect in transition.effects {
                if let Some(next) = self.perform(effect).await {
                    queue.push_back(next);
                }
            }
        }

        &self.state
    }

    async fn perform(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::FetchToken { url } => {
                debug!(url = %url, "Fetching token");
                Some(match self.browser.fetch_token(&url).await {
                    Ok(reply) => Event::TokenFetched {
                        status: reply.status,
                        body: reply.body,
                    },
                    Err(e) => Event::TokenFetchFailed {
                        message: format!("{:#}", e),
                    },
                })
            }
            Effect::StoreToken { request } => {
                debug!("Submitting token to storage");
                Some(match self.browser.store_token(&request).await {
                    Ok(reply) => Event::Stored {
                        status: reply.status,
                        body: reply.body,
                    },
                    Err(e) => Event::StoreFailed {
                        message: format!("{:#}", e),
                    },
                })
            }
            Effect::OpenInNewContext { url } => {
                self.browser.open_in_new_context(&url);
                None
            }
            Effect::HistoryBack => {
                self.browser.history_back();
                None
            }
            Effect::Navigate { to } => {
                info!(to = %to, "Redirecting");
                self.browser.navigate(&to);
                None
            }
        }
    }
}
