//! Configuration structures for the workbench.
//!
//! This module defines configuration options for various components:
//! - [`WorkbenchConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings (pooling, caching, fuel)
//! - [`ExecutionConfig`]: Per-run limits for guest programs
//! - [`EmbeddedRuntimeConfig`]: Where the embedded interpreter comes from
//! - [`RemoteConfig`]: Remote compile-and-run service settings

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level workbench configuration.
///
/// It can be loaded from a TOML file (see [`crate::ConfigFile`]) or built in
/// code; every section falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkbenchConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-run execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Embedded interpreter runtime configuration.
    #[serde(default)]
    pub runtime: EmbeddedRuntimeConfig,

    /// Remote execution service configuration.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Wasmtime engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Enable pooling allocator for instance creation.
    ///
    /// Off by default: the interpreter guest is a single large module and
    /// pooled slots must be sized for its whole linear memory.
    #[serde(default = "defaults::pooling_allocator")]
    pub pooling_allocator: bool,

    /// Maximum concurrent instances in the pool.
    ///
    /// Only effective when `pooling_allocator` is enabled.
    #[serde(default = "defaults::max_instances")]
    pub max_instances: u32,

    /// Memory per instance slot in megabytes.
    #[serde(default = "defaults::instance_memory_mb")]
    pub instance_memory_mb: u32,

    /// Cache compiled runtime artifacts and downloaded bundles on disk.
    #[serde(default = "defaults::cache_compiled_modules")]
    pub cache_compiled_modules: bool,

    /// Directory for the compiled module and bundle cache.
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Enable fuel metering for guest runs.
    ///
    /// When enabled, each run receives `execution.max_fuel` units.
    #[serde(default = "defaults::fuel_metering")]
    pub fuel_metering: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pooling_allocator: defaults::pooling_allocator(),
            max_instances: defaults::max_instances(),
            instance_memory_mb: defaults::instance_memory_mb(),
            cache_compiled_modules: defaults::cache_compiled_modules(),
            cache_dir: Some("./cache".into()),
            fuel_metering: defaults::fuel_metering(),
        }
    }
}

impl EngineConfig {
    /// The cache directory, if caching is enabled and a directory is set.
    pub fn cache_path(&self) -> Option<PathBuf> {
        if self.cache_compiled_modules {
            self.cache_dir.as_ref().map(PathBuf::from)
        } else {
            None
        }
    }
}

/// Per-run execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Maximum fuel per guest run.
    ///
    /// Only used when `engine.fuel_metering` is enabled.
    #[serde(default = "defaults::max_fuel")]
    pub max_fuel: u64,

    /// Capacity of each captured output stream in kilobytes.
    #[serde(default = "defaults::max_output_kb")]
    pub max_output_kb: usize,

    /// Ask the input provider for stdin when a program looks interactive.
    #[serde(default = "defaults::solicit_input")]
    pub solicit_input: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_fuel: defaults::max_fuel(),
            max_output_kb: defaults::max_output_kb(),
            solicit_input: defaults::solicit_input(),
        }
    }
}

impl ExecutionConfig {
    /// Output pipe capacity in bytes.
    pub fn max_output_bytes(&self) -> usize {
        self.max_output_kb.saturating_mul(1024)
    }
}

/// Embedded interpreter runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddedRuntimeConfig {
    /// URL of the WASI interpreter bundle.
    ///
    /// The default is the standalone CPython 3.12 build from
    /// webassembly-language-runtimes. Its standard library is packed into the
    /// module image with wasi-vfs, so it runs with no `stdlib_dir` mount.
    #[serde(default = "defaults::bundle_url")]
    pub bundle_url: String,

    /// Local bundle file; takes precedence over `bundle_url`.
    #[serde(default)]
    pub bundle_path: Option<String>,

    /// Host directory holding the interpreter standard library.
    ///
    /// Mounted read-only at `stdlib_guest_path` when set. Needed only for
    /// bare interpreter builds, such as `bin/python.wasm` from the release
    /// tarball with its `usr/local/lib` tree unpacked here.
    #[serde(default)]
    pub stdlib_dir: Option<String>,

    /// Guest path for the standard library mount.
    #[serde(default = "defaults::stdlib_guest_path")]
    pub stdlib_guest_path: String,

    /// Start loading the runtime in the background at startup.
    #[serde(default)]
    pub preload_on_start: bool,

    /// Bundle download timeout in seconds.
    #[serde(default = "defaults::fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for EmbeddedRuntimeConfig {
    fn default() -> Self {
        Self {
            bundle_url: defaults::bundle_url(),
            bundle_path: None,
            stdlib_dir: None,
            stdlib_guest_path: defaults::stdlib_guest_path(),
            preload_on_start: false,
            fetch_timeout_secs: defaults::fetch_timeout_secs(),
        }
    }
}

impl EmbeddedRuntimeConfig {
    /// Get the fetch timeout as a `Duration`.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Remote compile-and-run service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Execution endpoint.
    #[serde(default = "defaults::remote_endpoint")]
    pub endpoint: String,

    /// Service client id. Remote execution is disabled without it.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Service client secret. Remote execution is disabled without it.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Whole-request timeout in seconds.
    #[serde(default = "defaults::remote_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds.
    #[serde(default = "defaults::remote_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Language targets keyed by workbench language id.
    #[serde(default = "defaults::remote_targets")]
    pub targets: BTreeMap<String, RemoteTarget>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::remote_endpoint(),
            client_id: None,
            client_secret: None,
            timeout_secs: defaults::remote_timeout_secs(),
            connect_timeout_secs: defaults::remote_connect_timeout_secs(),
            targets: defaults::remote_targets(),
        }
    }
}

impl RemoteConfig {
    /// Returns `true` if both credentials are present and non-empty.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.client_id) && present(&self.client_secret)
    }

    /// Get the request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// How one workbench language is named on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteTarget {
    /// Service language name (e.g. `cpp`).
    pub language: String,

    /// Version tag appended to the language name (e.g. `17`).
    #[serde(default)]
    pub version_tag: String,

    /// Service version index.
    #[serde(default = "defaults::version_index")]
    pub version_index: String,
}

impl RemoteTarget {
    /// Create a target with the default version index.
    pub fn new(language: impl Into<String>, version_tag: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            version_tag: version_tag.into(),
            version_index: defaults::version_index(),
        }
    }

    /// The wire language identifier: name followed by version tag.
    pub fn wire_language(&self) -> String {
        format!("{}{}", self.language, self.version_tag)
    }
}

/// Default value functions for serde.
mod defaults {
    use std::collections::BTreeMap;

    use super::RemoteTarget;

    pub const fn pooling_allocator() -> bool {
        false
    }

    pub const fn max_instances() -> u32 {
        16
    }

    pub const fn instance_memory_mb() -> u32 {
        256
    }

    pub const fn cache_compiled_modules() -> bool {
        true
    }

    pub const fn fuel_metering() -> bool {
        false
    }

    pub const fn max_fuel() -> u64 {
        50_000_000_000
    }

    pub const fn max_output_kb() -> usize {
        1024
    }

    pub const fn solicit_input() -> bool {
        true
    }

    pub fn bundle_url() -> String {
        "https://github.com/vmware-labs/webassembly-language-runtimes/releases/download/python%2F3.12.0%2B20231211-040d5a6/python-3.12.0.wasm".to_string()
    }

    pub fn stdlib_guest_path() -> String {
        "/usr/local/lib".to_string()
    }

    pub const fn fetch_timeout_secs() -> u64 {
        300
    }

    pub fn remote_endpoint() -> String {
        "https://api.jdoodle.com/v1/execute".to_string()
    }

    pub const fn remote_timeout_secs() -> u64 {
        30
    }

    pub const fn remote_connect_timeout_secs() -> u64 {
        10
    }

    pub fn version_index() -> String {
        "0".to_string()
    }

    pub fn remote_targets() -> BTreeMap<String, RemoteTarget> {
        BTreeMap::from([
            ("java".to_string(), RemoteTarget::new("java", "93")),
            ("cpp".to_string(), RemoteTarget::new("cpp", "17")),
            ("python".to_string(), RemoteTarget::new("python", "3")),
        ])
    }
}
