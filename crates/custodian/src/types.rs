//! Core data types: the user [`Profile`] and the [`OAuthConfig`] used by the
//! token exchange client.
//!
//! A profile is everything an authentication exchange returned (tokens plus
//! provider-specific fields), kept as an ordered string-keyed map so the crate
//! never has to enumerate provider fields up front. The orchestrator injects
//! exactly one field of its own: the [`keys::LAST_AUTHENTICATED`] timestamp.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{AuthError, Result};

/// Well-known profile field names.
///
/// These are the only keys the orchestrator itself interprets; everything else
/// in a profile is passed through opaquely.
pub mod keys {
    /// JWT access token for API authentication.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Refresh token for obtaining new access tokens without user interaction.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Token type (`Bearer` for OAuth 2.0).
    pub const TOKEN_TYPE: &str = "token_type";
    /// Access token lifetime in seconds.
    pub const EXPIRES_IN: &str = "expires_in";
    /// ID token (JWT) containing user claims (OpenID Connect).
    pub const ID_TOKEN: &str = "id_token";
    /// Provider error code in a token response body.
    pub const ERROR: &str = "error";
    /// Provider error description in a token response body.
    pub const ERROR_DESCRIPTION: &str = "error_description";
    /// Orchestrator-injected UTC timestamp of the last successful
    /// authorize/refresh.
    pub const LAST_AUTHENTICATED: &str = "last_authenticated";
}

/// The decoded result of a successful authentication or refresh exchange.
///
/// Profiles are immutable snapshots: every successful authorize/refresh
/// produces a new value, nothing mutates one in place. Builder-style methods
/// consume `self` accordingly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    fields: BTreeMap<String, Value>,
}

impl Profile {
    /// Create an empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw field lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field lookup.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Integer field lookup. Providers are inconsistent about numeric fields
    /// (`expires_in` arrives as `3600` or `"3600"` depending on the server),
    /// so numeric strings are coerced.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Whether the profile has a field under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the profile carries no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Return a new profile with `key` set to `value`.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Return a new profile stamped with the given last-authenticated time.
    ///
    /// Stored as an RFC 3339 string under [`keys::LAST_AUTHENTICATED`]; this
    /// stamp is what makes the expiration policy meaningful on the next
    /// authentication cycle.
    #[must_use]
    pub fn with_last_authenticated(self, at: DateTime<Utc>) -> Self {
        self.with_field(keys::LAST_AUTHENTICATED, at.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// The access token, when present.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.get_str(keys::ACCESS_TOKEN)
    }

    /// The refresh token, when present. Some providers never issue one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.get_str(keys::REFRESH_TOKEN)
    }

    /// The OpenID Connect ID token, when present.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.get_str(keys::ID_TOKEN)
    }

    /// The token type, when present.
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        self.get_str(keys::TOKEN_TYPE)
    }

    /// Declared access-token lifetime in seconds, when present.
    #[must_use]
    pub fn expires_in(&self) -> Option<i64> {
        self.get_i64(keys::EXPIRES_IN)
    }

    /// When this profile was last stamped by a successful authorize/refresh.
    ///
    /// Returns `None` when the stamp is missing or malformed; the expiration
    /// policy treats both as "expired" (fail safe toward re-authentication).
    #[must_use]
    pub fn last_authenticated(&self) -> Option<DateTime<Utc>> {
        let raw = self.get_str(keys::LAST_AUTHENTICATED)?;
        DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
    }
}

impl FromIterator<(String, Value)> for Profile {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

impl From<serde_json::Map<String, Value>> for Profile {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

/// OAuth client configuration.
///
/// Endpoint URLs are explicit rather than derived from a provider domain;
/// see [`crate::providers`] for presets covering common providers.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID, generated in the provider's developer portal.
    pub client_id: String,
    /// OAuth client secret. Optional: public/native clients have none.
    pub client_secret: Option<String>,
    /// URL the provider redirects to after interactive authentication.
    pub redirect_uri: String,
    /// Interactive authorization page endpoint.
    pub authorize_url: Url,
    /// Token exchange endpoint.
    pub token_url: Url,
}

impl OAuthConfig {
    /// Create a new configuration.
    ///
    /// # Errors
    /// Returns [`AuthError::Config`] when `client_id` is empty.
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        authorize_url: Url,
        token_url: Url,
    ) -> Result<Self> {
        let client_id = client_id.into();
        if client_id.is_empty() {
            return Err(AuthError::Config("client_id must not be empty".to_string()));
        }

        Ok(Self {
            client_id,
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            authorize_url,
            token_url,
        })
    }

    /// Set the client secret (confidential clients only).
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }
}
