//! Shared application state.
//!
//! This module provides [`AppState`], which holds shared resources
//! across all HTTP request handlers.

use std::sync::Arc;

use workbench_common::{EngineError, WorkbenchConfig};
use workbench_core::{ExecutionEngine, InMemorySurface};
use workbench_host::assemble_engine;

/// Shared state across all request handlers.
///
/// This struct is cloned for each request, so it uses `Arc` for shared data.
#[derive(Clone)]
pub struct AppState {
    /// Execution engine (one per process).
    engine: Arc<ExecutionEngine>,

    /// Where HTML and CSS runs land; served at `/preview`.
    surface: Arc<InMemorySurface>,
}

impl AppState {
    /// Create new application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any engine collaborator fails to start.
    pub fn new(config: &WorkbenchConfig) -> Result<Self, EngineError> {
        let surface = Arc::new(InMemorySurface::new());
        let engine = assemble_engine(config, surface.clone(), None)?;
        Ok(Self::from_parts(Arc::new(engine), surface))
    }

    /// Wrap an already assembled engine.
    ///
    /// `surface` must be the surface the engine was built with, or the
    /// preview route will not see HTML and CSS runs.
    pub fn from_parts(engine: Arc<ExecutionEngine>, surface: Arc<InMemorySurface>) -> Self {
        Self { engine, surface }
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn surface(&self) -> &InMemorySurface {
        &self.surface
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
