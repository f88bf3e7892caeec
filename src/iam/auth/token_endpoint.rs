//! Talk to the IAM token endpoint over HTTP.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EndpointResponse, Grant};
use crate::iam::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
}

/// Token response from IAM.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenInfo {
    /// The bearer token. Empty until one has been acquired.
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Seconds of validity from issuance.
    pub expires_in: i64,
    /// Absolute expiry, in seconds since the Unix epoch.
    pub expiration: i64,
}

pub struct IamTokenEndpoint {
    pub client: reqwest::Client,
    pub token_url: String,
    pub basic_auth_user: String,
    pub basic_auth_password: String,
}

impl IamTokenEndpoint {
    /// Build an endpoint with its own HTTP client, honoring `config.timeout`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
            basic_auth_user: config.basic_auth_user.clone(),
            basic_auth_password: config.basic_auth_password.clone(),
        }
    }

    /// Post a grant and decode the token when the status is a success.
    pub async fn perform(&self, grant: &Grant) -> Result<EndpointResponse, Error> {
        let params = serde_urlencoded::to_string(grant)?;

        let req = self
            .client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .basic_auth(&self.basic_auth_user, Some(&self.basic_auth_password))
            .body(params)
            .build()?;

        let res = self.client.execute(req).await?;
        let status = res.status();
        debug!(message = "Token endpoint responded", grant_type = grant.grant_type(), status = status.as_u16());

        if !status.is_success() {
            return Ok(EndpointResponse {
                status,
                token_info: None,
            });
        }

        let token_info = res.json().await?;
        Ok(EndpointResponse {
            status,
            token_info: Some(token_info),
        })
    }
}

#[async_trait::async_trait]
impl super::TokenEndpoint for IamTokenEndpoint {
    type Error = Error;

    async fn post_grant(&self, grant: &Grant) -> Result<EndpointResponse, Self::Error> {
        self.perform(grant).await
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::{
        matchers::{body_string, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn endpoint(server: &MockServer) -> IamTokenEndpoint {
        let config = Config {
            token_url: format!("{}/identity/token", server.uri()),
            ..Config::default()
        };
        IamTokenEndpoint::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn posts_form_with_fixed_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(header("authorization", "Basic Yng6Yng="))
            .and(body_string(
                "grant_type=urn%3Aibm%3Aparams%3Aoauth%3Agrant-type%3Aapikey&apikey=k1&response_type=cloud_iam",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "expiration": 1700003600,
                "scope": "ibm openid",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let res = endpoint(&server)
            .perform(&Grant::ApiKey {
                api_key: "k1".into(),
            })
            .await
            .unwrap();

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.token_info,
            Some(TokenInfo {
                access_token: "at-1".into(),
                refresh_token: "rt-1".into(),
                token_type: "Bearer".into(),
                expires_in: 3600,
                expiration: 1700003600,
            })
        );
    }

    #[tokio::test]
    async fn missing_refresh_token_decodes_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-2",
                "token_type": "Bearer",
                "expires_in": 3600,
                "expiration": 1700003600,
            })))
            .mount(&server)
            .await;

        let res = endpoint(&server)
            .perform(&Grant::RefreshToken {
                refresh_token: "rt-1".into(),
            })
            .await
            .unwrap();

        let info = res.token_info.unwrap();
        assert_eq!(info.access_token, "at-2");
        assert_eq!(info.refresh_token, "");
    }

    #[tokio::test]
    async fn error_status_is_not_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("not json"))
            .mount(&server)
            .await;

        let res = endpoint(&server)
            .perform(&Grant::RefreshToken {
                refresh_token: "rt-1".into(),
            })
            .await
            .unwrap();

        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert!(res.token_info.is_none());
    }

    #[tokio::test]
    async fn garbage_success_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = endpoint(&server)
            .perform(&Grant::ApiKey {
                api_key: "k1".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Reqwest(_)));
    }
}
