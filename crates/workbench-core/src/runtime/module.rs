//! Runtime bundle compilation and on-disk caching.
//!
//! The embedded interpreter ships as one large core module. Compiling it
//! takes seconds, so [`CompiledModule::from_bytes_cached`] keeps the native
//! artifact under the configured cache directory, keyed by the content hash
//! of the bundle and the engine's compatibility hash.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use wasmtime::{Engine, Module};

use workbench_common::EngineError;

/// A compiled WebAssembly module plus the hash of its source bytes.
#[derive(Clone)]
pub struct CompiledModule {
    module: Module,
    content_hash: String,
}

impl CompiledModule {
    /// Compile a core module from WebAssembly bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid module.
    #[instrument(skip(engine, bytes), fields(bytes_len = bytes.len()))]
    pub fn from_bytes(engine: &Engine, bytes: &[u8]) -> Result<Self, EngineError> {
        let start = Instant::now();

        Self::validate_wasm_header(bytes)?;

        let module = Module::new(engine, bytes).map_err(|e| {
            EngineError::compilation_failed(format!("Core module compilation failed: {e}"))
        })?;

        let content_hash = compute_hash(bytes);

        info!(
            content_hash = %content_hash,
            duration_ms = start.elapsed().as_millis(),
            "Core module compiled"
        );

        Ok(Self {
            module,
            content_hash,
        })
    }

    /// Compile `bytes`, reusing a native artifact from `cache_dir` when one
    /// exists for the same bundle and engine settings.
    ///
    /// Cache write failures are logged and otherwise ignored. A stale or
    /// corrupt artifact is discarded and recompiled.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bundle itself cannot be compiled.
    #[instrument(skip(engine, bytes), fields(bytes_len = bytes.len()))]
    pub fn from_bytes_cached(
        engine: &Engine,
        bytes: &[u8],
        cache_dir: &Path,
    ) -> Result<Self, EngineError> {
        Self::validate_wasm_header(bytes)?;

        let artifact = artifact_path(engine, bytes, cache_dir);
        if artifact.is_file() {
            match Self::from_precompiled(engine, &artifact) {
                Ok(module) => return Ok(module),
                Err(e) => {
                    warn!(path = %artifact.display(), error = %e, "Discarding cached artifact");
                    let _ = std::fs::remove_file(&artifact);
                }
            }
        }

        let compiled = Self::from_bytes(engine, bytes)?;
        if let Err(e) = compiled.write_artifact(&artifact) {
            warn!(path = %artifact.display(), error = %e, "Failed to cache compiled module");
        }
        Ok(compiled)
    }

    /// Load a pre-compiled module from disk.
    ///
    /// Only artifacts written by [`Self::from_bytes_cached`] with the same
    /// Wasmtime version and engine settings are loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be loaded or is incompatible.
    #[allow(unsafe_code)]
    #[instrument(skip(engine, path))]
    pub fn from_precompiled(engine: &Engine, path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let start = Instant::now();

        // SAFETY: artifacts are produced by `write_artifact` and the file name
        // embeds the engine compatibility hash.
        let module = unsafe { Module::deserialize_file(engine, path) }.map_err(|e| {
            EngineError::compilation_failed(format!(
                "Failed to load precompiled module from {}: {e}",
                path.display()
            ))
        })?;

        // {hash}.cwasm
        let content_hash = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        debug!(
            path = %path.display(),
            content_hash = %content_hash,
            duration_us = start.elapsed().as_micros(),
            "Precompiled module loaded"
        );

        Ok(Self {
            module,
            content_hash,
        })
    }

    /// Compile a core module from WAT (WebAssembly Text Format).
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails.
    #[instrument(skip(engine, wat))]
    pub fn from_wat(engine: &Engine, wat: &str) -> Result<Self, EngineError> {
        let module = Module::new(engine, wat).map_err(|e| {
            EngineError::compilation_failed(format!("WAT compilation failed: {e}"))
        })?;

        Ok(Self {
            module,
            content_hash: compute_hash(wat.as_bytes()),
        })
    }

    fn write_artifact(&self, path: &Path) -> Result<(), EngineError> {
        let serialized = self.module.serialize().map_err(|e| {
            EngineError::compilation_failed(format!("Module serialization failed: {e}"))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a concurrent reader never sees half a file.
        let partial = path.with_extension("cwasm.partial");
        std::fs::write(&partial, serialized)?;
        std::fs::rename(&partial, path)?;

        debug!(path = %path.display(), "Compiled module cached");
        Ok(())
    }

    /// Get the content hash of the original Wasm bytes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Get the inner Wasmtime module.
    pub fn inner(&self) -> &Module {
        &self.module
    }

    fn validate_wasm_header(bytes: &[u8]) -> Result<(), EngineError> {
        if bytes.len() < 8 {
            return Err(EngineError::compilation_failed(
                "Invalid Wasm: file too small",
            ));
        }

        if &bytes[0..4] != b"\0asm" {
            return Err(EngineError::compilation_failed(
                "Invalid Wasm: bad magic number",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("content_hash", &self.content_hash)
            .finish_non_exhaustive()
    }
}

fn artifact_path(engine: &Engine, bytes: &[u8], cache_dir: &Path) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    engine.precompile_compatibility_hash().hash(&mut hasher);
    cache_dir.join(format!("{:016x}.cwasm", hasher.finish()))
}

fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
