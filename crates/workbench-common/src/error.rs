//! Error types for the workbench.
//!
//! This module defines a hierarchy of error types using `thiserror`:
//! - [`EngineError`]: Top-level errors raised inside the execution engine
//! - [`RuntimeLoadError`]: Failures while bootstrapping the embedded runtime
//! - [`RemoteError`]: Failures talking to the remote execution service
//!
//! None of these cross the dispatcher boundary. Strategies turn every one of
//! them into an execution report.

use std::io;

use thiserror::Error;

/// Top-level engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A guest module failed to compile.
    #[error("Compilation failed: {reason}")]
    CompilationFailed {
        /// Description of the compilation failure.
        reason: String,
    },

    /// A WebAssembly trap occurred during execution.
    #[error("Wasm trap: {message}")]
    Trap {
        /// Description of the trap.
        message: String,
    },

    /// Execution exhausted the configured fuel limit.
    #[error("Fuel exhausted: CPU limit exceeded")]
    FuelExhausted,

    /// The embedded runtime could not be loaded.
    #[error("Runtime load failed: {0}")]
    RuntimeLoad(#[from] RuntimeLoadError),

    /// The remote execution service failed.
    #[error("Remote execution error: {0}")]
    Remote(#[from] RemoteError),

    /// The in-process script host is not available.
    #[error("Script host unavailable: {reason}")]
    ScriptHostUnavailable {
        /// Why the host cannot accept work.
        reason: String,
    },

    /// The preview surface rejected a document or stylesheet.
    #[error("Preview surface error: {reason}")]
    Surface {
        /// Description of the surface failure.
        reason: String,
    },

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

/// Errors raised while loading the embedded runtime bundle.
///
/// The type is `Clone` so a single load failure can be handed to every
/// caller that was waiting on the same in-flight load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeLoadError {
    /// The bundle could not be downloaded.
    #[error("failed to fetch runtime bundle from {url}: {reason}")]
    Fetch {
        /// Bundle URL.
        url: String,
        /// Transport failure description.
        reason: String,
    },

    /// The bundle server answered with a non-success status.
    #[error("runtime bundle server returned HTTP {status} for {url}")]
    Status {
        /// Bundle URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// A bundle file on local disk could not be read.
    #[error("cannot read runtime bundle '{path}': {reason}")]
    Read {
        /// Bundle path.
        path: String,
        /// I/O failure description.
        reason: String,
    },

    /// Reading or writing the local bundle cache failed.
    #[error("runtime bundle cache error at '{path}': {reason}")]
    Cache {
        /// Cache path involved.
        path: String,
        /// I/O failure description.
        reason: String,
    },

    /// The bundle was fetched but could not be compiled.
    #[error("runtime bundle is not a valid module: {reason}")]
    Invalid {
        /// Compilation failure description.
        reason: String,
    },
}

/// Errors from the remote execution service client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// No response was received (DNS, connect, timeout).
    #[error("cannot reach {endpoint}: {reason}")]
    Unreachable {
        /// Endpoint that was contacted.
        endpoint: String,
        /// Transport failure description.
        reason: String,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message supplied by the service.
        message: String,
    },

    /// The service answered with a body that is not the expected shape.
    #[error("unexpected response: {reason}")]
    InvalidResponse {
        /// Decoding failure description.
        reason: String,
    },

    /// No language mapping exists for the requested language.
    #[error("remote execution does not support {language}")]
    UnsupportedLanguage {
        /// Language identifier.
        language: String,
    },
}

impl EngineError {
    /// Create a new `CompilationFailed` error.
    pub fn compilation_failed(reason: impl Into<String>) -> Self {
        Self::CompilationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `Trap` error.
    pub fn trap(message: impl Into<String>) -> Self {
        Self::Trap {
            message: message.into(),
        }
    }

    /// Create a new `ScriptHostUnavailable` error.
    pub fn script_host_unavailable(reason: impl Into<String>) -> Self {
        Self::ScriptHostUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a new `Surface` error.
    pub fn surface(reason: impl Into<String>) -> Self {
        Self::Surface {
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the failure lies outside the guest program
    /// (runtime bootstrap, network, host plumbing).
    pub fn is_infrastructure(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_unreachable(),
            Self::RuntimeLoad(_) | Self::ScriptHostUnavailable { .. } | Self::Io(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if a resource limit stopped the guest.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, Self::FuelExhausted)
    }
}

impl RemoteError {
    /// Returns `true` if no response was received at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::compilation_failed("bad magic");
        assert_eq!(err.to_string(), "Compilation failed: bad magic");

        let err = EngineError::FuelExhausted;
        assert_eq!(err.to_string(), "Fuel exhausted: CPU limit exceeded");
    }

    #[test]
    fn test_error_from_runtime_load() {
        let load_err = RuntimeLoadError::Status {
            url: "https://example.test/python.wasm".into(),
            status: 404,
        };
        let err: EngineError = load_err.into();

        assert!(matches!(err, EngineError::RuntimeLoad(_)));
        assert!(err.is_infrastructure());
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_is_infrastructure() {
        let unreachable = EngineError::from(RemoteError::Unreachable {
            endpoint: "https://api.example.test".into(),
            reason: "connection refused".into(),
        });
        let rejected = EngineError::from(RemoteError::Rejected {
            status: 401,
            message: "Unauthorized".into(),
        });

        assert!(unreachable.is_infrastructure());
        assert!(!rejected.is_infrastructure());
        assert!(!EngineError::trap("unreachable").is_infrastructure());
    }

    #[test]
    fn test_is_resource_limit() {
        assert!(EngineError::FuelExhausted.is_resource_limit());
        assert!(!EngineError::trap("oops").is_resource_limit());
    }

    #[test]
    fn test_remote_error_wording_differs() {
        let unreachable = RemoteError::Unreachable {
            endpoint: "https://api.example.test".into(),
            reason: "timed out".into(),
        };
        let rejected = RemoteError::Rejected {
            status: 500,
            message: "boom".into(),
        };

        assert!(unreachable.is_unreachable());
        assert!(!rejected.is_unreachable());
        assert_ne!(unreachable.to_string(), rejected.to_string());
    }
}
