//! Load-once lifecycle for the embedded runtime.
//!
//! The runtime moves `Uninitialized -> Loading -> Ready` and is never torn
//! down. While loading, every caller awaits the same shared future, so N
//! concurrent `ensure_ready` calls trigger exactly one load. A failed load
//! returns the lifecycle to `Uninitialized`; the next call retries.
//!
//! The load itself runs on a spawned task. Callers that stop waiting do not
//! cancel it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info};

use super::{RuntimeHandle, RuntimeLoader};
use workbench_common::RuntimeLoadError;

type SharedLoad = Shared<BoxFuture<'static, Result<RuntimeHandle, RuntimeLoadError>>>;

enum Lifecycle {
    Uninitialized,
    Loading(SharedLoad),
    Ready(RuntimeHandle),
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeState {
    Uninitialized,
    Loading,
    Ready,
}

/// Process-wide owner of the embedded runtime.
pub struct RuntimeBootstrapper {
    loader: Arc<dyn RuntimeLoader>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    loads_started: Arc<AtomicU64>,
}

impl RuntimeBootstrapper {
    pub fn new(loader: Arc<dyn RuntimeLoader>) -> Self {
        Self {
            loader,
            lifecycle: Arc::new(Mutex::new(Lifecycle::Uninitialized)),
            loads_started: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the ready runtime, loading it first if needed.
    ///
    /// Safe to call concurrently. Every caller waiting on the same load
    /// receives the same handle or the same error.
    ///
    /// # Errors
    ///
    /// Returns the loader's error if the in-flight load fails.
    pub async fn ensure_ready(&self) -> Result<RuntimeHandle, RuntimeLoadError> {
        let pending = {
            let mut lifecycle = self.lifecycle.lock();
            match &*lifecycle {
                Lifecycle::Ready(handle) => return Ok(Arc::clone(handle)),
                Lifecycle::Loading(load) => {
                    debug!("Joining in-flight runtime load");
                    load.clone()
                }
                Lifecycle::Uninitialized => {
                    let load = self.start_load();
                    *lifecycle = Lifecycle::Loading(load.clone());
                    load
                }
            }
        };

        pending.await
    }

    /// Start loading in the background unless a load is running or done.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn preload(&self) -> RuntimeState {
        let mut lifecycle = self.lifecycle.lock();
        if let Lifecycle::Uninitialized = &*lifecycle {
            info!("Preloading embedded runtime");
            *lifecycle = Lifecycle::Loading(self.start_load());
        }
        state_of(&lifecycle)
    }

    pub fn state(&self) -> RuntimeState {
        state_of(&self.lifecycle.lock())
    }

    pub fn is_ready(&self) -> bool {
        self.state() == RuntimeState::Ready
    }

    /// Number of loads started over the bootstrapper's lifetime.
    pub fn load_count(&self) -> u64 {
        self.loads_started.load(Ordering::SeqCst)
    }

    /// Must be called with the lifecycle lock held.
    fn start_load(&self) -> SharedLoad {
        let attempt = self.loads_started.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, "Starting embedded runtime load");

        let loader = Arc::clone(&self.loader);
        let lifecycle = Arc::clone(&self.lifecycle);
        let task = tokio::spawn(async move {
            let result = loader.load().await;
            let mut state = lifecycle.lock();
            match &result {
                Ok(handle) => *state = Lifecycle::Ready(Arc::clone(handle)),
                Err(e) => {
                    error!(attempt, error = %e, "Embedded runtime load failed");
                    *state = Lifecycle::Uninitialized;
                }
            }
            result
        });

        let lifecycle = Arc::clone(&self.lifecycle);
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(attempt, error = %e, "Embedded runtime load task aborted");
                    *lifecycle.lock() = Lifecycle::Uninitialized;
                    Err(RuntimeLoadError::Invalid {
                        reason: format!("runtime load task failed: {e}"),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for RuntimeBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBootstrapper")
            .field("state", &self.state())
            .field("load_count", &self.load_count())
            .finish_non_exhaustive()
    }
}

fn state_of(lifecycle: &Lifecycle) -> RuntimeState {
    match lifecycle {
        Lifecycle::Uninitialized => RuntimeState::Uninitialized,
        Lifecycle::Loading(_) => RuntimeState::Loading,
        Lifecycle::Ready(_) => RuntimeState::Ready,
    }
}
