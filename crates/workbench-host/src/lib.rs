//! Host-side collaborators for the workbench execution engine.
//!
//! The core crate only knows traits for the things that touch the outside
//! world. This crate implements them:
//!
//! - [`script`]: the in-process JavaScript host ([`JsHost`])
//! - [`remote`]: the remote compile-and-run client ([`RemoteClient`])
//! - [`bundle`]: downloading and caching the interpreter bundle
//! - [`logging`]: forwarding guest console output into `tracing`
//! - [`wiring`]: building a ready [`workbench_core::ExecutionEngine`] from
//!   configuration

pub mod bundle;
pub mod logging;
pub mod remote;
pub mod script;
pub mod wiring;

pub use bundle::HttpBundleSource;
pub use logging::LoggingHost;
pub use remote::RemoteClient;
pub use script::JsHost;
pub use wiring::assemble_engine;
