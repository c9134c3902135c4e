//! Runtime bundle download.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use workbench_common::{EngineError, RuntimeLoadError};
use workbench_core::runtime::BundleSource;

/// Interpreter bundle fetched over HTTP.
///
/// With a cache directory, the first successful download is kept on disk
/// and later processes read it from there instead of the network.
#[derive(Debug, Clone)]
pub struct HttpBundleSource {
    client: Client,
    url: String,
    cache_dir: Option<PathBuf>,
}

impl HttpBundleSource {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, EngineError> {
        let url = url.into();
        url::Url::parse(&url)
            .map_err(|e| EngineError::invalid_config(format!("bundle url '{url}': {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("workbench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::invalid_config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            cache_dir,
        })
    }

    /// Where the downloaded bundle is kept, if caching is enabled.
    pub fn cache_file(&self) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(cache_file_name(&self.url)))
    }

    async fn download(&self) -> Result<Vec<u8>, RuntimeLoadError> {
        let fetch_error = |e: reqwest::Error| RuntimeLoadError::Fetch {
            url: self.url.clone(),
            reason: if e.is_timeout() {
                "request timed out".to_string()
            } else if e.is_connect() {
                "connection failed".to_string()
            } else {
                e.to_string()
            },
        };

        let response = self.client.get(&self.url).send().await.map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeLoadError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(fetch_error)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl BundleSource for HttpBundleSource {
    async fn fetch(&self) -> Result<Vec<u8>, RuntimeLoadError> {
        let cache_file = self.cache_file();

        if let Some(path) = &cache_file {
            match tokio::fs::read(path).await {
                Ok(bytes) if !bytes.is_empty() => {
                    debug!(path = %path.display(), bytes = bytes.len(), "Runtime bundle cache hit");
                    return Ok(bytes);
                }
                Ok(_) => warn!(path = %path.display(), "Ignoring empty cached bundle"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Cannot read cached bundle"),
            }
        }

        info!(url = %self.url, "Downloading runtime bundle");
        let bytes = self.download().await?;
        info!(url = %self.url, bytes = bytes.len(), "Runtime bundle downloaded");

        if let Some(path) = &cache_file {
            if let Err(e) = store(path, &bytes).await {
                warn!(error = %e, "Runtime bundle not cached");
            }
        }
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

fn cache_file_name(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    format!("bundle-{:016x}.wasm", hasher.finish())
}

/// Write through a temporary file so readers never see a partial bundle.
async fn store(path: &Path, bytes: &[u8]) -> Result<(), RuntimeLoadError> {
    let cache_error = |e: std::io::Error| RuntimeLoadError::Cache {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(cache_error)?;
    }
    let partial = path.with_extension("wasm.partial");
    tokio::fs::write(&partial, bytes).await.map_err(cache_error)?;
    tokio::fs::rename(&partial, path).await.map_err(cache_error)?;
    debug!(path = %path.display(), "Runtime bundle cached");
    Ok(())
}
