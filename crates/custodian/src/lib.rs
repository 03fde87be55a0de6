//! Client-side authentication orchestration.
//!
//! Given a pluggable authorization strategy (how to obtain and refresh a
//! user credential) and a persistent secure store, this crate guarantees
//! that at most one authentication flow runs at a time, that concurrent
//! callers observe a single shared result, that cached credentials are
//! reused until expired, and that a forced re-authentication correctly
//! supersedes an in-flight non-forced one.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Custodian    │  Single-flight orchestrator
//! └────────┬────────┘
//!          │
//!          ├──► SingletonOperation  (at-most-one concurrent flow)
//!          ├──► AuthStrategy        (OAuthFlow: grant-code / client-side)
//!          │         │
//!          │         ├──► TokenClient   (HTTP token exchange)
//!          │         ├──► LoginUi       (host-supplied login surface)
//!          │         └──► expiry        (cache-freshness policy)
//!          │
//!          └──► SecureStore         (memory / platform keychain)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use custodian::{Custodian, MemorySecureStore, TokenClient};
//! use custodian::{providers, LoginFields, LoginUi};
//! use url::Url;
//!
//! # struct BrowserLogin;
//! # #[async_trait::async_trait]
//! # impl LoginUi for BrowserLogin {
//! #     async fn present(&self, _url: &Url) -> custodian::Result<LoginFields> {
//! #         unimplemented!()
//! #     }
//! # }
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = providers::google("your_client_id", "http://localhost:8080/callback")?;
//!     let custodian = Custodian::oauth_grant_code(
//!         TokenClient::new(config),
//!         BrowserLogin,
//!         MemorySecureStore::new(),
//!     );
//!
//!     // Cached profile when still valid; refresh or interactive login
//!     // otherwise. Concurrent calls share one flow.
//!     let profile = custodian.authenticate(false).await?;
//!     println!("access token: {:?}", profile.access_token());
//!
//!     // Bypass the cache regardless of validity.
//!     let fresh = custodian.authenticate(true).await?;
//!     # let _ = fresh;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - **[`custodian`]**: the orchestrator (`authenticate(force)`, cached
//!   `info`, change subscription)
//! - **[`singleflight`]**: the deduplicating async-operation primitive
//! - **[`strategy`]**: the `AuthStrategy` trait and the OAuth flow variants
//! - **[`expiry`]**: cached-profile expiration policy
//! - **[`client`]**: token endpoint client (four grant kinds)
//! - **[`login`]**: host-implemented login surface trait
//! - **[`store`]**: secure store trait and backends
//! - **[`types`]**: `Profile`, `OAuthConfig`, well-known field keys
//! - **[`providers`]**: Google / Azure AD endpoint presets
//! - **[`error`]**: the `AuthError` taxonomy

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod client;
pub mod custodian;
pub mod error;
pub mod expiry;
pub mod login;
pub mod providers;
pub mod singleflight;
pub mod store;
pub mod strategy;
pub mod types;

// Re-export commonly used types for convenience
pub use client::TokenClient;
pub use custodian::{Custodian, DEFAULT_PROFILE_KEY};
pub use error::{AuthError, Result};
pub use login::{LoginFields, LoginUi};
pub use singleflight::SingletonOperation;
#[cfg(feature = "keyring")]
pub use store::KeyringSecureStore;
pub use store::{MemorySecureStore, SecureStore, StoreError};
pub use strategy::{AuthStrategy, FlowKind, OAuthFlow};
pub use types::{keys, OAuthConfig, Profile};
