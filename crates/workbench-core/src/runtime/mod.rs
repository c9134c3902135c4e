//! Embedded guest runtime.
//!
//! Languages without an in-process host run inside an interpreter that is
//! itself a WebAssembly module (for Python, CPython built for WASI). The
//! pieces are:
//!
//! - [`BundleSource`]: where the interpreter bytes come from
//! - [`RuntimeLoader`]: turns bytes into a ready [`GuestRuntime`]
//! - [`RuntimeBootstrapper`]: loads at most once, shared by all callers
//! - [`WasiInterpreter`]: the WASI-backed [`GuestRuntime`]

mod bootstrap;
mod engine;
mod guest;
mod module;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use workbench_common::{EngineError, RuntimeLoadError};

pub use bootstrap::{RuntimeBootstrapper, RuntimeState};
pub use engine::WasmEngine;
pub use guest::{DirMount, InterpreterSettings, WasiInterpreter, WasiRuntimeLoader};
pub use module::CompiledModule;
pub use store::{create_store, fuel_consumed, is_out_of_fuel, GuestState};

/// How a guest run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestExit {
    /// The guest returned or called `exit` with this code.
    Code(i32),
    /// The guest trapped.
    Trap(String),
    /// The fuel budget ran out.
    OutOfFuel,
}

/// Everything a guest run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit: GuestExit,
    pub fuel_consumed: Option<u64>,
}

impl GuestOutput {
    pub fn succeeded(&self) -> bool {
        self.exit == GuestExit::Code(0)
    }
}

/// A loaded interpreter that can run source text.
#[async_trait]
pub trait GuestRuntime: Send + Sync {
    /// Run `source` to completion.
    ///
    /// Guest failures (non-zero exit, traps) are reported in the returned
    /// [`GuestOutput`]. `Err` means the host could not run the guest at all.
    async fn run(&self, source: &str, stdin: Option<&str>) -> Result<GuestOutput, EngineError>;
}

pub type RuntimeHandle = Arc<dyn GuestRuntime>;

/// Produces a ready runtime. Called by the bootstrapper at most once per
/// successful load.
#[async_trait]
pub trait RuntimeLoader: Send + Sync {
    async fn load(&self) -> Result<RuntimeHandle, RuntimeLoadError>;
}

/// Origin of the interpreter bundle bytes.
#[async_trait]
pub trait BundleSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, RuntimeLoadError>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

/// Bundle read from a local file.
#[derive(Debug, Clone)]
pub struct FileBundleSource {
    path: PathBuf,
}

impl FileBundleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BundleSource for FileBundleSource {
    async fn fetch(&self) -> Result<Vec<u8>, RuntimeLoadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| RuntimeLoadError::Read {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Runtime bundle read");
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_bundle_source_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("python.wasm");
        std::fs::write(&path, b"\0asm\x01\0\0\0").unwrap();

        let source = FileBundleSource::new(&path);
        assert_eq!(source.fetch().await.unwrap(), b"\0asm\x01\0\0\0");
        assert!(source.describe().ends_with("python.wasm"));
    }

    #[tokio::test]
    async fn test_file_bundle_source_missing_file() {
        let source = FileBundleSource::new("/nonexistent/python.wasm");
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, RuntimeLoadError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/python.wasm"));
    }

    #[test]
    fn test_guest_output_succeeded() {
        let mut output = GuestOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit: GuestExit::Code(0),
            fuel_consumed: None,
        };
        assert!(output.succeeded());

        output.exit = GuestExit::Code(1);
        assert!(!output.succeeded());
        output.exit = GuestExit::OutOfFuel;
        assert!(!output.succeeded());
    }
}
