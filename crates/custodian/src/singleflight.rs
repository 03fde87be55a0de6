//! Deduplicating async-operation primitive.
//!
//! [`SingletonOperation`] runs a zero-argument async producer at most once
//! concurrently. While a run is active, every [`SingletonOperation::start`]
//! call returns a handle to that same run; all joined callers resolve to an
//! identical result (the same success value, or the same error). Once the run
//! resolves, the active slot is cleared and the next `start` begins a fresh
//! run.
//!
//! There is no external cancellation: a dispatched producer is driven to
//! completion by whichever callers are awaiting its handle. If every handle
//! is dropped the run merely stalls until the next caller joins and resumes
//! polling it.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;

/// Handle to an in-flight run. Cloneable; every clone resolves to the same
/// result.
pub type SharedRun<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

type Producer<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type Slot<T, E> = Arc<Mutex<Option<SharedRun<T, E>>>>;

/// Runs an async producer at most once concurrently; concurrent callers
/// share the in-flight result.
pub struct SingletonOperation<T, E> {
    producer: Producer<T, E>,
    active: Slot<T, E>,
}

impl<T, E> SingletonOperation<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new operation around `producer`.
    ///
    /// The producer is invoked once per fresh run; it takes no arguments, so
    /// any per-run inputs must live in state the closure captures.
    pub fn new<P>(producer: P) -> Self
    where
        P: Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync + 'static,
    {
        Self { producer: Box::new(producer), active: Arc::new(Mutex::new(None)) }
    }

    /// Whether a run is active: true strictly between dispatch and
    /// resolution.
    ///
    /// Check-then-act over `started`/`start` must be serialized by the owner
    /// (the two calls are individually consistent, but another caller may
    /// dispatch in between otherwise).
    #[must_use]
    pub fn started(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Join the active run, or dispatch a fresh one if none is active.
    ///
    /// The returned handle must be awaited to drive the run; it resolves to
    /// the run's result. The active slot is cleared by the run itself
    /// immediately before it resolves, so a `start` call after resolution
    /// begins a brand-new run.
    pub fn start(&self) -> SharedRun<T, E> {
        let mut slot = self.active.lock();
        if let Some(run) = slot.as_ref() {
            return run.clone();
        }

        let active = Arc::clone(&self.active);
        let fut = (self.producer)();
        let run = async move {
            let result = fut.await;
            // Clear the slot before delivering the result so the next start
            // after resolution never joins a finished run.
            active.lock().take();
            result
        }
        .boxed()
        .shared();

        *slot = Some(run.clone());
        run
    }
}

impl<T, E> fmt::Debug for SingletonOperation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonOperation").field("started", &self.active.lock().is_some()).finish()
    }
}
