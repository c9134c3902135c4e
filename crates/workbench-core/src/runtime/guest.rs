//! WASI-hosted interpreter.
//!
//! [`WasiInterpreter`] runs source text through an interpreter compiled to
//! `wasm32-wasi`. Every run gets a fresh store whose stdin/stdout/stderr are
//! in-memory pipes, so no redirection outlives the run. Runs are queued
//! behind an async gate; the interpreter executes one program at a time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use wasmtime::{Linker, Trap};
use wasmtime_wasi::pipe::{MemoryInputPipe, MemoryOutputPipe};
use wasmtime_wasi::preview1::add_to_linker_async;
use wasmtime_wasi::{DirPerms, FilePerms, I32Exit, WasiCtxBuilder};

use super::store::{create_store, fuel_consumed, is_out_of_fuel, GuestState};
use super::{
    BundleSource, CompiledModule, GuestExit, GuestOutput, GuestRuntime, RuntimeHandle,
    RuntimeLoader, WasmEngine,
};
use workbench_common::{EngineError, RuntimeLoadError, WorkbenchConfig};

/// Runs the user's program as `__main__` and turns an uncaught exception
/// into one `Type: message` line on stderr plus exit status 1.
const PYTHON_LAUNCHER: &str = r#"import sys
_source = sys.argv.pop(1)
try:
    exec(compile(_source, "<workbench>", "exec"), {"__name__": "__main__"})
except SystemExit:
    raise
except BaseException as _exc:
    sys.stdout.flush()
    print(f"{type(_exc).__name__}: {_exc}", file=sys.stderr)
    sys.exit(1)
"#;

/// Host directory exposed read-only inside the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirMount {
    pub host: PathBuf,
    pub guest: String,
}

/// How the interpreter process is launched.
///
/// The source text is appended as the last argument.
#[derive(Debug, Clone)]
pub struct InterpreterSettings {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub mount: Option<DirMount>,
    /// Capacity of each of the stdout and stderr pipes.
    pub max_output_bytes: usize,
    /// Fuel given to each run when the engine meters fuel.
    pub fuel: Option<u64>,
}

impl InterpreterSettings {
    /// Launch settings for CPython built for WASI.
    pub fn python(config: &WorkbenchConfig) -> Self {
        let mount = config.runtime.stdlib_dir.as_ref().map(|dir| DirMount {
            host: PathBuf::from(dir),
            guest: config.runtime.stdlib_guest_path.clone(),
        });

        Self {
            argv: vec!["python".into(), "-c".into(), PYTHON_LAUNCHER.into()],
            env: vec![
                ("PYTHONDONTWRITEBYTECODE".into(), "1".into()),
                ("PYTHONIOENCODING".into(), "utf-8".into()),
            ],
            mount,
            max_output_bytes: config.execution.max_output_bytes(),
            fuel: config
                .engine
                .fuel_metering
                .then_some(config.execution.max_fuel),
        }
    }
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            argv: vec!["guest".into()],
            env: Vec::new(),
            mount: None,
            max_output_bytes: 1024 * 1024,
            fuel: None,
        }
    }
}

/// A compiled interpreter module ready to run programs.
pub struct WasiInterpreter {
    engine: WasmEngine,
    module: CompiledModule,
    linker: Linker<GuestState>,
    settings: InterpreterSettings,
    gate: tokio::sync::Mutex<()>,
}

impl WasiInterpreter {
    /// # Errors
    ///
    /// Returns an error if the WASI imports cannot be linked.
    pub fn new(
        engine: WasmEngine,
        module: CompiledModule,
        settings: InterpreterSettings,
    ) -> Result<Self, EngineError> {
        let mut linker = Linker::new(engine.inner());
        add_to_linker_async(&mut linker, |s: &mut GuestState| &mut s.wasi)
            .map_err(|e| EngineError::invalid_config(format!("Failed to link WASI: {e}")))?;

        Ok(Self {
            engine,
            module,
            linker,
            settings,
            gate: tokio::sync::Mutex::new(()),
        })
    }

    fn build_state(
        &self,
        source: &str,
        stdin: Option<&str>,
        stdout: &MemoryOutputPipe,
        stderr: &MemoryOutputPipe,
    ) -> Result<GuestState, EngineError> {
        let mut argv = self.settings.argv.clone();
        argv.push(source.to_string());

        let mut builder = WasiCtxBuilder::new();
        builder
            .args(argv.as_slice())
            .stdout(stdout.clone())
            .stderr(stderr.clone());

        if let Some(input) = stdin {
            builder.stdin(MemoryInputPipe::new(input.to_string()));
        }
        for (key, value) in &self.settings.env {
            builder.env(key, value);
        }
        if let Some(mount) = &self.settings.mount {
            builder
                .preopened_dir(&mount.host, &mount.guest, DirPerms::READ, FilePerms::READ)
                .map_err(|e| {
                    EngineError::invalid_config(format!(
                        "cannot mount {} at {}: {e}",
                        mount.host.display(),
                        mount.guest
                    ))
                })?;
        }

        Ok(GuestState::new(builder.build_p1()))
    }
}

#[async_trait]
impl GuestRuntime for WasiInterpreter {
    #[instrument(skip_all, fields(source_len = source.len(), has_stdin = stdin.is_some()))]
    async fn run(&self, source: &str, stdin: Option<&str>) -> Result<GuestOutput, EngineError> {
        let _turn = self.gate.lock().await;
        let start = Instant::now();

        let stdout = MemoryOutputPipe::new(self.settings.max_output_bytes);
        let stderr = MemoryOutputPipe::new(self.settings.max_output_bytes);
        let state = self.build_state(source, stdin, &stdout, &stderr)?;
        let mut store = create_store(&self.engine, state, self.settings.fuel)?;

        let instance = self
            .linker
            .instantiate_async(&mut store, self.module.inner())
            .await
            .map_err(|e| EngineError::trap(format!("Failed to instantiate interpreter: {e}")))?;

        let entry = instance
            .get_typed_func::<(), ()>(&mut store, "_start")
            .map_err(|e| EngineError::compilation_failed(format!("Missing _start export: {e}")))?;

        let exit = match entry.call_async(&mut store, ()).await {
            Ok(()) => GuestExit::Code(0),
            Err(e) => {
                if let Some(status) = e.downcast_ref::<I32Exit>() {
                    GuestExit::Code(status.0)
                } else if is_out_of_fuel(&e) {
                    warn!("Guest ran out of fuel");
                    GuestExit::OutOfFuel
                } else {
                    let message = trap_message(&e);
                    warn!(error = %message, "Guest trapped");
                    GuestExit::Trap(message)
                }
            }
        };

        let fuel_consumed = self
            .settings
            .fuel
            .and_then(|initial| fuel_consumed(initial, &store));
        drop(store);

        let output = GuestOutput {
            stdout: String::from_utf8_lossy(&stdout.contents()).into_owned(),
            stderr: String::from_utf8_lossy(&stderr.contents()).into_owned(),
            exit,
            fuel_consumed,
        };

        debug!(
            exit = ?output.exit,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            duration_ms = start.elapsed().as_millis(),
            "Guest run finished"
        );

        Ok(output)
    }
}

impl std::fmt::Debug for WasiInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasiInterpreter")
            .field("module", &self.module)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn trap_message(error: &wasmtime::Error) -> String {
    match error.downcast_ref::<Trap>() {
        Some(trap) => trap.to_string(),
        None => error.to_string(),
    }
}

/// Fetches the interpreter bundle, compiles it (through the artifact cache
/// when one is configured) and wraps it in a [`WasiInterpreter`].
pub struct WasiRuntimeLoader {
    engine: WasmEngine,
    source: Arc<dyn BundleSource>,
    settings: InterpreterSettings,
    cache_dir: Option<PathBuf>,
}

impl WasiRuntimeLoader {
    pub fn new(
        engine: WasmEngine,
        source: Arc<dyn BundleSource>,
        settings: InterpreterSettings,
    ) -> Self {
        let cache_dir = engine.config().cache_path();
        Self {
            engine,
            source,
            settings,
            cache_dir,
        }
    }
}

#[async_trait]
impl RuntimeLoader for WasiRuntimeLoader {
    async fn load(&self) -> Result<RuntimeHandle, RuntimeLoadError> {
        let start = Instant::now();
        let origin = self.source.describe();
        info!(origin = %origin, "Loading embedded runtime");

        let bytes = self.source.fetch().await?;

        let engine = self.engine.clone();
        let cache_dir = self.cache_dir.clone();
        let module = tokio::task::spawn_blocking(move || match cache_dir {
            Some(dir) => CompiledModule::from_bytes_cached(engine.inner(), &bytes, &dir),
            None => CompiledModule::from_bytes(engine.inner(), &bytes),
        })
        .await
        .map_err(|e| RuntimeLoadError::Invalid {
            reason: format!("compilation task failed: {e}"),
        })?
        .map_err(|e| RuntimeLoadError::Invalid {
            reason: e.to_string(),
        })?;

        let interpreter = WasiInterpreter::new(self.engine.clone(), module, self.settings.clone())
            .map_err(|e| RuntimeLoadError::Invalid {
                reason: e.to_string(),
            })?;

        info!(
            origin = %origin,
            duration_ms = start.elapsed().as_millis(),
            "Embedded runtime ready"
        );

        Ok(Arc::new(interpreter))
    }
}
