//! OAuth token endpoint client.
//!
//! One form-encoded POST path shared by the four grant kinds the crate
//! speaks: `password`, `client_credentials`, `authorization_code`, and
//! `refresh_token`. Every request carries `client_id`, the `client_secret`
//! when one is configured, and the `redirect_uri`; caller-supplied extra
//! parameters always take precedence over these defaults.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{AuthError, Result};
use crate::types::{keys, OAuthConfig, Profile};

/// Client for a provider's token exchange endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    config: OAuthConfig,
    http: Client,
}

impl TokenClient {
    /// Create a new token client with a 30-second request timeout.
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, http }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the interactive authorization page URL.
    ///
    /// Appends `client_id`, `redirect_uri`, `response_type=code`, and
    /// `response_mode=query` to the configured authorize endpoint, after the
    /// caller's `extra` parameters; defaults are only added for keys the
    /// caller (or the endpoint URL itself) did not already set.
    #[must_use]
    pub fn authorization_page_url(&self, extra: &[(String, String)]) -> Url {
        let mut url = self.config.authorize_url.clone();
        for (key, value) in extra {
            url.query_pairs_mut().append_pair(key, value);
        }

        let defaults = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("response_mode", "query"),
        ];
        for (key, value) in defaults {
            if value.is_empty() || url.query_pairs().any(|(existing, _)| existing == key) {
                continue;
            }
            url.query_pairs_mut().append_pair(key, value);
        }

        url
    }

    /// Exchange a username and password for a profile (`password` grant).
    ///
    /// # Errors
    /// [`AuthError::Config`] for an empty username; otherwise the shared
    /// exchange failure modes.
    pub async fn login_with_password(
        &self,
        username: &str,
        password: &str,
        extra: &[(String, String)],
    ) -> Result<Profile> {
        if username.is_empty() {
            return Err(AuthError::Config("username must not be empty".to_string()));
        }
        debug!(username, "requesting password grant");

        let mut params = extra.to_vec();
        push_if_absent(&mut params, "username", username);
        push_if_absent(&mut params, "password", password);
        push_if_absent(&mut params, "grant_type", "password");
        self.request_token(params).await
    }

    /// Obtain a profile with the configured client id and secret
    /// (`client_credentials` grant).
    ///
    /// # Errors
    /// [`AuthError::Config`] when no client secret is configured; otherwise
    /// the shared exchange failure modes.
    pub async fn login_with_client_credentials(
        &self,
        extra: &[(String, String)],
    ) -> Result<Profile> {
        if self.config.client_secret.as_deref().unwrap_or_default().is_empty() {
            return Err(AuthError::Config(
                "client_credentials grant requires a client secret".to_string(),
            ));
        }
        debug!("requesting client_credentials grant");

        let mut params = extra.to_vec();
        push_if_absent(&mut params, "grant_type", "client_credentials");
        self.request_token(params).await
    }

    /// Exchange a grant code from the authorization page for a profile
    /// (`authorization_code` grant).
    ///
    /// # Errors
    /// [`AuthError::Config`] for an empty code; otherwise the shared exchange
    /// failure modes.
    pub async fn login_with_grant_code(
        &self,
        grant_code: &str,
        extra: &[(String, String)],
    ) -> Result<Profile> {
        if grant_code.is_empty() {
            return Err(AuthError::Config("grant code must not be empty".to_string()));
        }
        debug!("requesting authorization_code grant");

        let mut params = extra.to_vec();
        push_if_absent(&mut params, "code", grant_code);
        push_if_absent(&mut params, "grant_type", "authorization_code");
        self.request_token(params).await
    }

    /// Exchange a stored refresh token for a fresh profile (`refresh_token`
    /// grant).
    ///
    /// # Errors
    /// [`AuthError::Config`] for an empty token; otherwise the shared
    /// exchange failure modes.
    pub async fn login_with_refresh_token(
        &self,
        refresh_token: &str,
        extra: &[(String, String)],
    ) -> Result<Profile> {
        if refresh_token.is_empty() {
            return Err(AuthError::Config("refresh token must not be empty".to_string()));
        }
        debug!("requesting refresh_token grant");

        let mut params = extra.to_vec();
        push_if_absent(&mut params, "grant_type", "refresh_token");
        push_if_absent(&mut params, "refresh_token", refresh_token);
        self.request_token(params).await
    }

    /// Shared exchange path: inject the client identity, POST the form, and
    /// decode the response.
    ///
    /// A non-2xx status or an `error` field in a decoded body is reported as
    /// [`AuthError::Exchange`] carrying the provider's error code and
    /// description.
    async fn request_token(&self, mut params: Vec<(String, String)>) -> Result<Profile> {
        push_if_absent(&mut params, "client_id", &self.config.client_id);
        if let Some(secret) = &self.config.client_secret {
            push_if_absent(&mut params, "client_secret", secret);
        }
        push_if_absent(&mut params, "redirect_uri", &self.config.redirect_uri);

        let response =
            self.http.post(self.config.token_url.clone()).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let decoded: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            return Err(exchange_error(status, decoded.as_ref()));
        }

        let Some(Value::Object(map)) = decoded else {
            return Err(AuthError::Parse(format!(
                "token endpoint returned an undecodable body ({status})"
            )));
        };
        if map.contains_key(keys::ERROR) {
            return Err(exchange_error(status, Some(&Value::Object(map))));
        }

        debug!("token exchange succeeded");
        Ok(Profile::from(map))
    }
}

/// Append `(key, value)` unless the key is already present or the value is
/// empty; this is what gives caller-supplied parameters precedence.
fn push_if_absent(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    if value.is_empty() || params.iter().any(|(existing, _)| existing == key) {
        return;
    }
    params.push((key.to_string(), value.to_string()));
}

/// Build an [`AuthError::Exchange`] from the response status and (possibly
/// absent or non-JSON) body.
fn exchange_error(status: StatusCode, body: Option<&Value>) -> AuthError {
    let error = body
        .and_then(|b| b.get(keys::ERROR))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status.canonical_reason().unwrap_or("token exchange rejected").to_string()
        });
    let description = body
        .and_then(|b| b.get(keys::ERROR_DESCRIPTION))
        .and_then(Value::as_str)
        .map(str::to_string);

    AuthError::Exchange { error, description, status: Some(status.as_u16()) }
}

#[cfg(test)]
mod tests {
    //! Unit tests for URL building and parameter precedence. Network paths
    //! are covered by the wiremock integration tests.
    use super::*;

    fn test_client() -> TokenClient {
        let config = OAuthConfig::new(
            "test_client_id",
            "http://localhost/return_uri",
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        )
        .unwrap();
        TokenClient::new(config)
    }

    /// Validates `TokenClient::authorization_page_url` behavior for the
    /// default parameter scenario.
    ///
    /// Assertions:
    /// - Ensures the URL starts with the configured authorize endpoint.
    /// - Ensures `client_id`, `redirect_uri`, `response_type`, and
    ///   `response_mode` are appended.
    #[test]
    fn test_authorization_page_url_defaults() {
        let url = test_client().authorization_page_url(&[]);
        let rendered = url.as_str();

        assert!(rendered.starts_with("https://auth.example.com/authorize?"));
        assert!(rendered.contains("client_id=test_client_id"));
        assert!(rendered.contains("redirect_uri=http%3A%2F%2Flocalhost%2Freturn_uri"));
        assert!(rendered.contains("response_type=code"));
        assert!(rendered.contains("response_mode=query"));
    }

    /// Validates `TokenClient::authorization_page_url` behavior for the
    /// caller precedence scenario: an extra parameter shadowing a default
    /// suppresses that default.
    #[test]
    fn test_authorization_page_url_caller_wins() {
        let extra = vec![
            ("response_type".to_string(), "token".to_string()),
            ("scope".to_string(), "openid profile".to_string()),
        ];
        let url = test_client().authorization_page_url(&extra);

        let response_types: Vec<String> = url
            .query_pairs()
            .filter(|(k, _)| k == "response_type")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(response_types, vec!["token".to_string()]);
        assert!(url.as_str().contains("scope=openid+profile"));
    }

    /// Validates `push_if_absent` behavior for the duplicate and empty value
    /// scenarios.
    #[test]
    fn test_push_if_absent() {
        let mut params = vec![("grant_type".to_string(), "password".to_string())];

        push_if_absent(&mut params, "grant_type", "client_credentials");
        push_if_absent(&mut params, "client_secret", "");
        push_if_absent(&mut params, "client_id", "abc");

        assert_eq!(
            params,
            vec![
                ("grant_type".to_string(), "password".to_string()),
                ("client_id".to_string(), "abc".to_string()),
            ]
        );
    }

    /// Validates `exchange_error` behavior for the provider body and bare
    /// status scenarios.
    #[test]
    fn test_exchange_error_mapping() {
        let body = serde_json::json!({
            "error": "invalid_grant",
            "error_description": "refresh token revoked",
        });
        let err = exchange_error(StatusCode::BAD_REQUEST, Some(&body));
        assert_eq!(
            err,
            AuthError::Exchange {
                error: "invalid_grant".to_string(),
                description: Some("refresh token revoked".to_string()),
                status: Some(400),
            }
        );

        let err = exchange_error(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert_eq!(
            err,
            AuthError::Exchange {
                error: "Internal Server Error".to_string(),
                description: None,
                status: Some(500),
            }
        );
    }

    /// Validates `TokenClient::login_with_client_credentials` behavior for
    /// the missing secret scenario.
    #[tokio::test]
    async fn test_client_credentials_requires_secret() {
        let result = test_client().login_with_client_credentials(&[]).await;
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    /// Validates the empty-argument guards on the grant methods.
    #[tokio::test]
    async fn test_empty_argument_guards() {
        let client = test_client();

        assert!(matches!(
            client.login_with_grant_code("", &[]).await,
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            client.login_with_refresh_token("", &[]).await,
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            client.login_with_password("", "pw", &[]).await,
            Err(AuthError::Config(_))
        ));
    }
}
