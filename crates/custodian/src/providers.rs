//! Endpoint presets for common OAuth providers.

use url::Url;

use crate::error::{AuthError, Result};
use crate::types::OAuthConfig;

/// Google authorization page endpoint.
pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google token exchange endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Azure AD v2 authorization page endpoint template (`{tenant}` substituted).
pub const AZURE_V2_AUTHORIZE_TEMPLATE: &str =
    "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize";
/// Azure AD v2 token exchange endpoint template (`{tenant}` substituted).
pub const AZURE_V2_TOKEN_TEMPLATE: &str =
    "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token";

/// Azure AD v1 authorization page endpoint template. V2 is recommended; v1
/// remains in use with older tenants.
pub const AZURE_V1_AUTHORIZE_TEMPLATE: &str =
    "https://login.microsoftonline.com/{tenant}/oauth2/authorize";
/// Azure AD v1 token exchange endpoint template.
pub const AZURE_V1_TOKEN_TEMPLATE: &str = "https://login.microsoftonline.com/{tenant}/oauth2/token";

/// Google OAuth configuration.
///
/// # Errors
/// Returns [`AuthError::Config`] when `client_id` is empty.
pub fn google(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Result<OAuthConfig> {
    OAuthConfig::new(
        client_id,
        redirect_uri,
        parse_endpoint("google authorize", GOOGLE_AUTHORIZE_URL)?,
        parse_endpoint("google token", GOOGLE_TOKEN_URL)?,
    )
}

/// Azure AD v2 configuration for the multi-tenant `common` endpoint.
///
/// # Errors
/// Returns [`AuthError::Config`] when `client_id` is empty.
pub fn azure(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Result<OAuthConfig> {
    azure_tenant(client_id, redirect_uri, "common")
}

/// Azure AD v2 configuration for a specific tenant.
///
/// # Errors
/// Returns [`AuthError::Config`] when `client_id` is empty or the tenant
/// produces an invalid endpoint URL.
pub fn azure_tenant(
    client_id: impl Into<String>,
    redirect_uri: impl Into<String>,
    tenant: &str,
) -> Result<OAuthConfig> {
    OAuthConfig::new(
        client_id,
        redirect_uri,
        tenant_endpoint("azure authorize", AZURE_V2_AUTHORIZE_TEMPLATE, tenant)?,
        tenant_endpoint("azure token", AZURE_V2_TOKEN_TEMPLATE, tenant)?,
    )
}

/// Azure AD v1 configuration for a specific tenant.
///
/// # Errors
/// Returns [`AuthError::Config`] when `client_id` is empty or the tenant
/// produces an invalid endpoint URL.
pub fn azure_v1_tenant(
    client_id: impl Into<String>,
    redirect_uri: impl Into<String>,
    tenant: &str,
) -> Result<OAuthConfig> {
    OAuthConfig::new(
        client_id,
        redirect_uri,
        tenant_endpoint("azure authorize", AZURE_V1_AUTHORIZE_TEMPLATE, tenant)?,
        tenant_endpoint("azure token", AZURE_V1_TOKEN_TEMPLATE, tenant)?,
    )
}

fn tenant_endpoint(name: &str, template: &str, tenant: &str) -> Result<Url> {
    if tenant.is_empty() {
        return Err(AuthError::Config("tenant must not be empty".to_string()));
    }
    parse_endpoint(name, &template.replace("{tenant}", tenant))
}

fn parse_endpoint(name: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|err| AuthError::Config(format!("invalid {name} endpoint: {err}")))
}
