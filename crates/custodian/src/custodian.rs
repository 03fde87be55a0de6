//! The single-flight authentication orchestrator.
//!
//! [`Custodian`] checks the user's cached credential and performs the login
//! or refresh flow as needed, guaranteeing that at most one network-facing
//! flow is in flight per instance and that concurrent callers share one
//! outcome. A forced call never gets silently satisfied by a stale
//! non-forced result: it waits the running non-forced flow out, then runs
//! fresh (the upgrade case).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};

use crate::client::TokenClient;
use crate::error::{AuthError, Result};
use crate::login::LoginUi;
use crate::singleflight::SingletonOperation;
use crate::store::SecureStore;
use crate::strategy::{AuthStrategy, OAuthFlow};
use crate::types::Profile;

/// Default secure-store key for the cached profile.
pub const DEFAULT_PROFILE_KEY: &str = "custodian.profile";

/// Shared state the flow producer closes over. The force flag lives here
/// (not per call) because the producer takes no arguments; it is only
/// mutated under the dispatch lock, and reset by the flow itself on
/// resolution.
struct FlowState<A, K> {
    strategy: A,
    store: K,
    profile_key: RwLock<String>,
    force: AtomicBool,
    info: watch::Sender<Option<Profile>>,
}

impl<A: AuthStrategy, K: SecureStore> FlowState<A, K> {
    /// One full authentication cycle: cache check, refresh, interactive
    /// login, persistence.
    async fn run_flow(&self) -> Result<Profile> {
        let key = self.profile_key.read().clone();
        let mut profile: Option<Profile> = None;

        if let Some(saved) = self.store.get(&key).await? {
            if self.force.load(Ordering::SeqCst) || self.strategy.profile_expired(&saved).await {
                match self.strategy.refresh(&saved).await {
                    Ok(refreshed) => profile = refreshed,
                    // Not fatal: fall through to an interactive login.
                    Err(err) => info!(%err, "refresh token failed"),
                }
            } else {
                debug!("cached profile still valid");
                return Ok(saved);
            }
        }

        let profile = match profile {
            Some(profile) => profile,
            None => match self.strategy.authorize().await {
                Ok(profile) => profile,
                Err(err) => {
                    info!(%err, "login failed");
                    return Err(err);
                }
            },
        };

        self.store.set(&key, &profile).await?;
        self.info.send_replace(Some(profile.clone()));

        Ok(profile)
    }
}

/// Single-flight authentication orchestrator.
///
/// Owns its collaborators outright (explicit dependency injection, no
/// process-wide defaults): an [`AuthStrategy`] describing how to obtain and
/// refresh the credential, and a [`SecureStore`] to persist it between runs.
pub struct Custodian<A: AuthStrategy + 'static, K: SecureStore + 'static> {
    state: Arc<FlowState<A, K>>,
    flow: SingletonOperation<Profile, AuthError>,
    dispatch: Mutex<()>,
}

impl<A: AuthStrategy + 'static, K: SecureStore + 'static> Custodian<A, K> {
    /// Create an orchestrator over the given strategy and store.
    #[must_use]
    pub fn new(strategy: A, store: K) -> Self {
        let (info, _) = watch::channel(None);
        let state = Arc::new(FlowState {
            strategy,
            store,
            profile_key: RwLock::new(DEFAULT_PROFILE_KEY.to_string()),
            force: AtomicBool::new(false),
            info,
        });

        let producer_state = Arc::clone(&state);
        let flow = SingletonOperation::new(move || {
            let state = Arc::clone(&producer_state);
            async move {
                let result = state.run_flow().await;
                // The next unrelated call defaults to non-forced, whether
                // this run succeeded or failed.
                state.force.store(false, Ordering::SeqCst);
                result
            }
            .boxed()
        });

        Self { state, flow, dispatch: Mutex::new(()) }
    }

    /// Authenticate the user, reusing the cached profile when it is still
    /// valid.
    ///
    /// With `force` set, any cached credential is bypassed and a fresh
    /// network flow is guaranteed. Concurrent callers share a single flow
    /// and outcome, with one exception: a forced call arriving while a
    /// *non-forced* flow runs first waits that flow out (discarding its
    /// outcome), then dispatches its own forced flow, so the forced caller
    /// always observes a flow dispatched after its request.
    ///
    /// # Errors
    /// The interactive login path is fatal for the run: its error is
    /// delivered to every joined caller. Refresh failures are recovered
    /// internally. Nothing is retried automatically.
    pub async fn authenticate(&self, force: bool) -> Result<Profile> {
        debug!(mode = if force { "forced" } else { "non-forced" }, "user authentication started");

        // Upgrade case: take a handle on the running non-forced flow (under
        // the dispatch lock, so the check and the join cannot race another
        // dispatch), wait it out, and discard whatever it produced.
        let superseded = {
            let _guard = self.dispatch.lock().await;
            let force_in_progress = self.state.force.load(Ordering::SeqCst);
            (force && !force_in_progress && self.flow.started()).then(|| self.flow.start())
        };
        if let Some(run) = superseded {
            debug!("waiting for non-forced operation to complete");
            if let Err(err) = run.await {
                debug!(%err, "superseded operation failed");
            }
        }

        let run = {
            let _guard = self.dispatch.lock().await;
            if self.flow.started() {
                debug!("joining already running authentication operation");
                self.flow.start()
            } else {
                self.state.force.store(force, Ordering::SeqCst);
                debug!("starting authentication operation");
                self.flow.start()
            }
        };

        let result = run.await;
        match &result {
            Ok(_) => debug!("authentication operation finished"),
            Err(err) => error!(%err, "authentication finished with error"),
        }
        result
    }

    /// Whether an authentication flow is currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.flow.started()
    }

    /// The most recent profile produced by a successful flow, if any.
    ///
    /// Not assigned on cache hits: it tracks flows this instance actually
    /// ran, not store contents.
    #[must_use]
    pub fn info(&self) -> Option<Profile> {
        self.state.info.borrow().clone()
    }

    /// Subscribe to profile changes.
    ///
    /// The watched value is assigned synchronously, after persistence, once
    /// per successful flow. The receiver observes the latest value;
    /// intermediate assignments may be coalesced if the host does not poll
    /// between flows.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Profile>> {
        self.state.info.subscribe()
    }

    /// The secure-store key the cached profile lives under.
    #[must_use]
    pub fn profile_key(&self) -> String {
        self.state.profile_key.read().clone()
    }

    /// Change the secure-store key for the cached profile.
    ///
    /// # Errors
    /// Returns [`AuthError::Config`] when the key is empty or an
    /// authentication flow is in flight (the key is immutable once a flow
    /// has started).
    pub fn set_profile_key(&self, key: impl Into<String>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(AuthError::Config("profile key must not be empty".to_string()));
        }
        if self.flow.started() {
            return Err(AuthError::Config(
                "cannot change profile key while an authentication flow is in flight".to_string(),
            ));
        }

        *self.state.profile_key.write() = key;
        Ok(())
    }

    /// The store this orchestrator persists through.
    #[must_use]
    pub fn store(&self) -> &K {
        &self.state.store
    }

    /// The strategy this orchestrator authenticates with.
    #[must_use]
    pub fn strategy(&self) -> &A {
        &self.state.strategy
    }
}

impl<L, K> Custodian<OAuthFlow<L>, K>
where
    L: LoginUi + 'static,
    K: SecureStore + 'static,
{
    /// Orchestrator for the OAuth grant-code flow.
    #[must_use]
    pub fn oauth_grant_code(client: TokenClient, login: L, store: K) -> Self {
        Self::new(OAuthFlow::grant_code(client, login), store)
    }

    /// Orchestrator for the OAuth client-side (implicit) flow.
    #[must_use]
    pub fn oauth_client_side(client: TokenClient, login: L, store: K) -> Self {
        Self::new(OAuthFlow::client_side(client, login), store)
    }
}

impl<A: AuthStrategy + 'static, K: SecureStore + 'static> fmt::Debug for Custodian<A, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custodian")
            .field("profile_key", &*self.state.profile_key.read())
            .field("in_flight", &self.flow.started())
            .finish()
    }
}
