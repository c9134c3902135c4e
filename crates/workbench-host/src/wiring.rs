//! Assemble an [`ExecutionEngine`] from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::bundle::HttpBundleSource;
use crate::remote::RemoteClient;
use crate::script::JsHost;
use workbench_common::{EngineError, WorkbenchConfig};
use workbench_core::runtime::{
    BundleSource, FileBundleSource, InterpreterSettings, RuntimeBootstrapper, WasiRuntimeLoader,
    WasmEngine,
};
use workbench_core::{ExecutionEngine, InputProvider, LanguageId, PreviewSurface};

/// Build the engine with the host-side collaborators.
///
/// Must run inside a tokio runtime when `runtime.preload_on_start` is set,
/// since the preload is spawned immediately.
pub fn assemble_engine(
    config: &WorkbenchConfig,
    surface: Arc<dyn PreviewSurface>,
    input: Option<Arc<dyn InputProvider>>,
) -> Result<ExecutionEngine, EngineError> {
    let script = JsHost::start()?;

    let wasm = WasmEngine::new(&config.engine)?;
    let loader = WasiRuntimeLoader::new(
        wasm,
        bundle_source(config)?,
        InterpreterSettings::python(config),
    );
    let runtime = Arc::new(RuntimeBootstrapper::new(Arc::new(loader)));

    let mut engine = ExecutionEngine::new(Arc::new(script), runtime, surface)
        .with_config(config.execution.clone());

    match RemoteClient::from_config(&config.remote)? {
        Some(remote) => {
            info!(endpoint = %config.remote.endpoint, "Remote execution enabled");
            engine = engine.with_remote(Arc::new(remote));
        }
        None => info!("Remote execution disabled: no credentials configured"),
    }

    if let Some(input) = input {
        engine = engine.with_input_provider(input);
    }

    if config.runtime.preload_on_start {
        engine.preload(LanguageId::Python);
    }

    Ok(engine)
}

/// A local bundle file wins over the download URL.
fn bundle_source(config: &WorkbenchConfig) -> Result<Arc<dyn BundleSource>, EngineError> {
    if let Some(path) = &config.runtime.bundle_path {
        return Ok(Arc::new(FileBundleSource::new(PathBuf::from(path))));
    }
    let source = HttpBundleSource::new(
        config.runtime.bundle_url.clone(),
        config.runtime.fetch_timeout(),
        config.engine.cache_path(),
    )?;
    Ok(Arc::new(source))
}
