//! Authorization strategies.
//!
//! A strategy defines how to obtain a user credential and how to refresh it.
//! The orchestrator only sees the [`AuthStrategy`] trait; [`OAuthFlow`]
//! implements it for the two OAuth shapes this crate speaks, selected by the
//! closed [`FlowKind`] set rather than an inheritance hierarchy.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::client::TokenClient;
use crate::error::{AuthError, Result};
use crate::expiry;
use crate::login::{LoginFields, LoginUi};
use crate::types::{keys, Profile};

/// How to obtain and refresh a user credential.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Run the interactive flow and return the resulting profile.
    async fn authorize(&self) -> Result<Profile>;

    /// Obtain a fresh profile from the saved one without user interaction.
    ///
    /// Returns `Ok(None)` when the saved profile carries nothing to refresh
    /// with (no refresh token) - that is not an error, the orchestrator falls
    /// through to a full interactive login.
    async fn refresh(&self, saved: &Profile) -> Result<Option<Profile>>;

    /// Whether the saved profile is no longer usable without a network flow.
    async fn profile_expired(&self, saved: &Profile) -> bool;
}

/// The closed set of OAuth flow shapes.
#[derive(Debug, Clone)]
pub enum FlowKind {
    /// The login page returns an intermediate grant code which is exchanged
    /// at the token endpoint for the profile.
    GrantCode {
        /// Redirect field carrying the code (`code` for standard providers).
        code_key: String,
    },
    /// The login page returns the profile fields directly; no second
    /// exchange round-trip.
    ClientSide,
}

/// OAuth authorization strategy over a [`TokenClient`] and a [`LoginUi`].
pub struct OAuthFlow<L> {
    client: TokenClient,
    login: L,
    kind: FlowKind,
    authorize_page_params: Vec<(String, String)>,
    token_params: Vec<(String, String)>,
    refresh_params: Vec<(String, String)>,
}

impl<L: LoginUi> OAuthFlow<L> {
    /// Grant-code flow: exchange the login page's code for tokens.
    #[must_use]
    pub fn grant_code(client: TokenClient, login: L) -> Self {
        Self::with_kind(client, login, FlowKind::GrantCode { code_key: "code".to_string() })
    }

    /// Client-side (implicit) flow: the login page's response *is* the
    /// profile.
    #[must_use]
    pub fn client_side(client: TokenClient, login: L) -> Self {
        Self::with_kind(client, login, FlowKind::ClientSide)
    }

    fn with_kind(client: TokenClient, login: L, kind: FlowKind) -> Self {
        Self {
            client,
            login,
            kind,
            authorize_page_params: Vec::new(),
            token_params: Vec::new(),
            refresh_params: Vec::new(),
        }
    }

    /// Override the redirect field the grant code is read from.
    /// No effect on a client-side flow.
    #[must_use]
    pub fn with_grant_code_key(mut self, code_key: impl Into<String>) -> Self {
        if let FlowKind::GrantCode { code_key: ref mut existing } = self.kind {
            *existing = code_key.into();
        }
        self
    }

    /// Additional query parameters for the authorization page.
    #[must_use]
    pub fn with_authorize_page_params(mut self, params: Vec<(String, String)>) -> Self {
        self.authorize_page_params = params;
        self
    }

    /// Additional form parameters for the grant-code token exchange.
    #[must_use]
    pub fn with_token_params(mut self, params: Vec<(String, String)>) -> Self {
        self.token_params = params;
        self
    }

    /// Additional form parameters for refresh requests.
    #[must_use]
    pub fn with_refresh_params(mut self, params: Vec<(String, String)>) -> Self {
        self.refresh_params = params;
        self
    }

    /// The token client this flow exchanges through.
    #[must_use]
    pub fn client(&self) -> &TokenClient {
        &self.client
    }

    /// The login surface this flow presents authorization pages on.
    #[must_use]
    pub fn login(&self) -> &L {
        &self.login
    }

    /// Turn the login page's redirect fields into a profile, per flow kind.
    async fn profile_from_login(&self, fields: LoginFields) -> Result<Profile> {
        match &self.kind {
            FlowKind::GrantCode { code_key } => {
                let Some(code) = fields.get(code_key) else {
                    // A provider that refused authorization redirects with
                    // error fields instead of a code; surface those.
                    if let Some(error) = fields.get(keys::ERROR) {
                        return Err(AuthError::Exchange {
                            error: error.clone(),
                            description: fields.get(keys::ERROR_DESCRIPTION).cloned(),
                            status: None,
                        });
                    }
                    return Err(AuthError::MalformedResponse { field: code_key.clone() });
                };
                self.client.login_with_grant_code(code, &self.token_params).await
            }
            FlowKind::ClientSide => {
                Ok(fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
            }
        }
    }
}

#[async_trait]
impl<L: LoginUi> AuthStrategy for OAuthFlow<L> {
    async fn authorize(&self) -> Result<Profile> {
        let url = self.client.authorization_page_url(&self.authorize_page_params);
        debug!(%url, "presenting login page");

        let fields = self.login.present(&url).await?;
        let profile = self.profile_from_login(fields).await?;
        Ok(profile.with_last_authenticated(Utc::now()))
    }

    async fn refresh(&self, saved: &Profile) -> Result<Option<Profile>> {
        let Some(refresh_token) = saved.refresh_token() else {
            debug!("saved profile has no refresh token");
            return Ok(None);
        };

        let profile =
            self.client.login_with_refresh_token(refresh_token, &self.refresh_params).await?;
        Ok(Some(profile.with_last_authenticated(Utc::now())))
    }

    async fn profile_expired(&self, saved: &Profile) -> bool {
        expiry::profile_expired(saved, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for login-result handling. The network half of the flows
    //! is covered by the wiremock integration tests.
    use std::collections::BTreeMap;

    use url::Url;

    use super::*;
    use crate::types::OAuthConfig;

    struct UnusedLogin;

    #[async_trait]
    impl LoginUi for UnusedLogin {
        async fn present(&self, _url: &Url) -> Result<LoginFields> {
            Err(AuthError::LoginCancelled)
        }
    }

    fn test_flow(kind: fn(TokenClient, UnusedLogin) -> OAuthFlow<UnusedLogin>) -> OAuthFlow<UnusedLogin> {
        let config = OAuthConfig::new(
            "test_client",
            "http://localhost/return_uri",
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        )
        .unwrap();
        kind(TokenClient::new(config), UnusedLogin)
    }

    /// Validates `OAuthFlow::profile_from_login` behavior for the client-side
    /// scenario: the redirect fields become the profile verbatim.
    #[tokio::test]
    async fn test_client_side_adopts_login_fields() {
        let flow = test_flow(OAuthFlow::client_side);

        let mut fields = BTreeMap::new();
        fields.insert("id_token".to_string(), "test_id_token".to_string());
        fields.insert("state".to_string(), "xyz".to_string());

        let profile = flow.profile_from_login(fields).await.unwrap();
        assert_eq!(profile.id_token(), Some("test_id_token"));
        assert_eq!(profile.get_str("state"), Some("xyz"));
    }

    /// Validates `OAuthFlow::profile_from_login` behavior for the missing
    /// grant code scenario.
    ///
    /// Assertions:
    /// - Ensures a response without the code field fails with
    ///   `MalformedResponse` naming the field.
    #[tokio::test]
    async fn test_grant_code_missing_field() {
        let flow = test_flow(OAuthFlow::grant_code);

        let result = flow.profile_from_login(BTreeMap::new()).await;
        assert_eq!(
            result,
            Err(AuthError::MalformedResponse { field: "code".to_string() })
        );
    }

    /// Validates `OAuthFlow::profile_from_login` behavior for the provider
    /// error redirect scenario: `error`/`error_description` fields surface
    /// as an exchange failure instead of "missing code".
    #[tokio::test]
    async fn test_grant_code_provider_error_redirect() {
        let flow = test_flow(OAuthFlow::grant_code);

        let mut fields = BTreeMap::new();
        fields.insert("error".to_string(), "access_denied".to_string());
        fields.insert("error_description".to_string(), "user said no".to_string());

        let result = flow.profile_from_login(fields).await;
        assert_eq!(
            result,
            Err(AuthError::Exchange {
                error: "access_denied".to_string(),
                description: Some("user said no".to_string()),
                status: None,
            })
        );
    }

    /// Validates `OAuthFlow::with_grant_code_key` behavior for the custom
    /// code field scenario.
    #[tokio::test]
    async fn test_custom_grant_code_key_missing_field() {
        let flow = test_flow(OAuthFlow::grant_code).with_grant_code_key("authorization_code");

        let result = flow.profile_from_login(BTreeMap::new()).await;
        assert_eq!(
            result,
            Err(AuthError::MalformedResponse { field: "authorization_code".to_string() })
        );
    }

    /// Validates `AuthStrategy::refresh` behavior for the no-refresh-token
    /// scenario: `Ok(None)`, not an error.
    #[tokio::test]
    async fn test_refresh_without_token_is_none() {
        let flow = test_flow(OAuthFlow::grant_code);
        let saved = Profile::new().with_field(keys::ACCESS_TOKEN, "a1");

        assert_eq!(flow.refresh(&saved).await.unwrap(), None);
    }

    /// Validates `AuthStrategy::authorize` behavior for the cancelled login
    /// scenario.
    #[tokio::test]
    async fn test_authorize_surfaces_cancellation() {
        let flow = test_flow(OAuthFlow::grant_code);
        assert_eq!(flow.authorize().await, Err(AuthError::LoginCancelled));
    }
}
