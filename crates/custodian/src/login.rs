//! Interactive login surface abstraction.
//!
//! The crate never renders UI itself; the host supplies a [`LoginUi`] that
//! displays the authorization page (system browser, embedded webview, test
//! double) and hands back the provider's redirect query.

use std::collections::BTreeMap;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Parsed query fields of the provider's redirect back from an interactive
/// login: grant code or tokens on success, `error`/`error_description` on
/// provider-side failure.
pub type LoginFields = BTreeMap<String, String>;

/// A surface that can display an interactive login page.
#[async_trait]
pub trait LoginUi: Send + Sync {
    /// Display the authorization page at `url` and return the parsed
    /// redirect query once the provider redirects back.
    ///
    /// # Errors
    /// Returns [`crate::AuthError::LoginCancelled`] when the user dismisses
    /// the page before a redirect arrives; any other failure of the surface
    /// itself may use the remaining [`crate::AuthError`] variants.
    async fn present(&self, url: &Url) -> Result<LoginFields>;
}

/// Extract [`LoginFields`] from a redirect URL's query string.
///
/// Convenience for `LoginUi` implementations that intercept the redirect as a
/// full URL (loopback listeners, webview navigation callbacks).
#[must_use]
pub fn redirect_fields(redirect: &Url) -> LoginFields {
    redirect.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
}

#[cfg(test)]
mod tests {
    //! Unit tests for redirect parsing.
    use super::*;

    /// Validates `redirect_fields` behavior for the grant-code redirect
    /// scenario.
    #[test]
    fn test_redirect_fields() {
        let url = Url::parse("http://localhost/return?code=abc&state=xyz").unwrap();
        let fields = redirect_fields(&url);

        assert_eq!(fields.get("code").map(String::as_str), Some("abc"));
        assert_eq!(fields.get("state").map(String::as_str), Some("xyz"));
    }

    /// Validates `redirect_fields` behavior for the percent-encoded value
    /// scenario.
    #[test]
    fn test_redirect_fields_decodes_values() {
        let url = Url::parse("http://localhost/return?error_description=bad%20request").unwrap();
        let fields = redirect_fields(&url);

        assert_eq!(fields.get("error_description").map(String::as_str), Some("bad request"));
    }
}
