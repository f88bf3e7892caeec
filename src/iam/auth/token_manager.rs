use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Clock, Grant, SystemClock, TokenEndpoint, TokenInfo};
use crate::iam::{
    config::Config,
    utils::{check_status, ServerError},
};

/// Hands out a valid IAM access token, acquiring and renewing it on demand.
///
/// The whole decision sequence of [`TokenManager::get_token`], network call
/// included, runs under a single lock, so at most one grant is in flight per
/// manager and concurrent callers share its result.
pub struct TokenManager<Endpoint, C = SystemClock>
where
    Endpoint: TokenEndpoint,
{
    endpoint: Endpoint,
    clock: C,
    refresh_buffer: f64,
    refresh_token_lifetime: i64,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    user_token: String,
    api_key: String,
    token_info: TokenInfo,
}

#[derive(Debug, thiserror::Error)]
pub enum Error<EndpointError> {
    #[error("token endpoint: {0}")]
    Endpoint(#[source] EndpointError),
    #[error("server: {0}")]
    Server(#[from] ServerError),
    #[error("token endpoint answered {0} without a token")]
    MissingBody(u16),
}

/// Where the cached token stands, as seen by the next `get_token` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// A token was pinned with `set_token`.
    Pinned,
    NoToken,
    Fresh,
    Stale,
}

impl<Endpoint> TokenManager<Endpoint, SystemClock>
where
    Endpoint: TokenEndpoint,
{
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_config(endpoint, &Config::default(), SystemClock)
    }
}

impl<Endpoint, C> TokenManager<Endpoint, C>
where
    Endpoint: TokenEndpoint,
    C: Clock,
{
    pub fn with_config(endpoint: Endpoint, config: &Config, clock: C) -> Self {
        Self {
            endpoint,
            clock,
            refresh_buffer: config.refresh_buffer,
            refresh_token_lifetime: config.refresh_token_lifetime.as_secs() as i64,
            state: Mutex::const_new(State::default()),
        }
    }

    /// Pin a token managed by the caller. It is returned as-is from then on.
    pub async fn set_token(&self, token: impl Into<String>) {
        self.state.lock().await.user_token = token.into();
    }

    /// Set the API key used to acquire tokens.
    pub async fn set_key(&self, key: impl Into<String>) {
        self.state.lock().await.api_key = key.into();
    }

    /// Snapshot of the last token response.
    pub async fn token_info(&self) -> TokenInfo {
        self.state.lock().await.token_info.clone()
    }

    pub async fn token_state(&self) -> TokenState {
        let state = self.state.lock().await;
        if !state.user_token.is_empty() {
            TokenState::Pinned
        } else if state.token_info.access_token.is_empty() {
            TokenState::NoToken
        } else if self.is_token_expired(&state.token_info) {
            TokenState::Stale
        } else {
            TokenState::Fresh
        }
    }

    pub async fn get_token(&self) -> Result<String, Error<Endpoint::Error>> {
        let mut state = self.state.lock().await;

        if !state.user_token.is_empty() {
            return Ok(state.user_token.clone());
        }

        if state.token_info.access_token.is_empty() {
            info!(message = "No token acquired yet, requesting one with the API key");
            self.request_token(&mut state).await?;
        }

        // Checked even right after an acquisition: a response that is already
        // past its refresh threshold is renewed again in the same call.
        if self.is_token_expired(&state.token_info) {
            if self.is_refresh_token_expired(&state.token_info) {
                info!(
                    message = "Token and refresh token expired, requesting a new one with the API key",
                    token_expiration = state.token_info.expiration,
                );
                self.request_token(&mut state).await?;
            } else {
                debug!(
                    message = "Token is due for renewal, refreshing",
                    token_expiration = state.token_info.expiration,
                );
                self.refresh_token(&mut state).await?;
            }
        } else {
            debug!(message = "Using preexisting token", token_expiration = state.token_info.expiration);
        }

        Ok(state.token_info.access_token.clone())
    }

    async fn request_token(&self, state: &mut State) -> Result<(), Error<Endpoint::Error>> {
        let grant = Grant::ApiKey {
            api_key: state.api_key.clone(),
        };
        self.post_token(state, grant).await
    }

    async fn refresh_token(&self, state: &mut State) -> Result<(), Error<Endpoint::Error>> {
        let grant = Grant::RefreshToken {
            refresh_token: state.token_info.refresh_token.clone(),
        };
        self.post_token(state, grant).await
    }

    async fn post_token(
        &self,
        state: &mut State,
        grant: Grant,
    ) -> Result<(), Error<Endpoint::Error>> {
        let res = self
            .endpoint
            .post_grant(&grant)
            .await
            .map_err(Error::Endpoint)?;
        check_status(res.status)?;
        let token_info = res
            .token_info
            .ok_or_else(|| Error::MissingBody(res.status.as_u16()))?;

        debug!(
            message = "Got new token",
            grant_type = grant.grant_type(),
            token_expires_in = token_info.expires_in,
            token_expiration = token_info.expiration,
        );

        state.token_info = token_info;
        Ok(())
    }

    /// Due for renewal once `refresh_buffer` of the validity window has elapsed.
    fn is_token_expired(&self, token_info: &TokenInfo) -> bool {
        let margin = token_info.expires_in as f64 * (1.0 - self.refresh_buffer);
        let refresh_at = token_info.expiration as f64 - margin;
        refresh_at < self.clock.now() as f64
    }

    fn is_refresh_token_expired(&self, token_info: &TokenInfo) -> bool {
        let refresh_token_expires_at = token_info
            .expiration
            .saturating_add(self.refresh_token_lifetime);
        refresh_token_expires_at < self.clock.now()
    }
}

#[async_trait::async_trait]
impl<Endpoint, C> super::TokenProvider for TokenManager<Endpoint, C>
where
    Endpoint: TokenEndpoint,
    C: Clock,
{
    type Token = String;
    type Error = Error<Endpoint::Error>;

    async fn get_auth_token(&self) -> Result<Self::Token, Self::Error> {
        self.get_token().await
    }
}
