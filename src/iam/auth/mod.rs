//! Authorization logic.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;

pub mod grant;
pub mod token_endpoint;
pub mod token_manager;

pub use self::grant::Grant;
pub use self::token_endpoint::{IamTokenEndpoint, TokenInfo};
pub use self::token_manager::TokenManager;

#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    type Token: Token;
    type Error: Send + Sync;

    async fn get_auth_token(&self) -> Result<Self::Token, Self::Error>;
}

pub trait Token: Send {
    fn access_token(&self) -> &str;
}

impl Token for String {
    fn access_token(&self) -> &str {
        self.as_str()
    }
}

/// What the identity provider answered to a grant.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: StatusCode,
    /// Decoded body; only present for success statuses.
    pub token_info: Option<TokenInfo>,
}

/// Posts grant bodies to the identity provider's token endpoint.
#[async_trait::async_trait]
pub trait TokenEndpoint: Send + Sync {
    type Error: Send + Sync;

    async fn post_grant(&self, grant: &Grant) -> Result<EndpointResponse, Self::Error>;
}

/// Source of wall-clock time, in seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or_default()
    }
}
