//! HTTP server for the workbench.
//!
//! Exposes the execution engine over HTTP:
//!
//! - `POST /run` runs a program and returns its execution report
//! - language listing and starter templates
//! - the preview surface for HTML and CSS runs
//! - runtime warm-up, health and readiness checks
//!
//! Programs that read input are not prompted for it here. The report comes
//! back as a warning with `needs_input` in its metadata, and the client
//! resubmits with `stdin`.
//!
//! # Quick Start
//!
//! ```ignore
//! use workbench_common::WorkbenchConfig;
//! use workbench_server::{ServerConfig, WorkbenchServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = WorkbenchServer::new(&WorkbenchConfig::default(), ServerConfig::default())?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

pub use server::{ServerConfig, TestHandle, WorkbenchServer};
pub use state::AppState;
