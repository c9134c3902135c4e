//! Multi-language execution engine.
//!
//! This crate turns `(source, language, stdin?)` into one normalized
//! [`ExecutionReport`]:
//! - [`ExecutionEngine`]: resolves the language and drives a [`Strategy`]
//! - [`RuntimeBootstrapper`]: load-once lifecycle of the embedded interpreter
//! - [`validator`] / [`sql`] / [`detector`]: static analysis, no execution
//! - [`OutputSink`]: ordered capture of stdout/stderr/warning/return lines
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   ExecutionEngine                       │
//! │  - language resolution, empty-source guard              │
//! │  - input detection and solicitation                     │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Strategy                           │
//! │  Direct ─────────── ScriptHost (JavaScript)             │
//! │  Embedded ──────── RuntimeBootstrapper → WASI guest     │
//! │  HeuristicRemote ─ validator → RemoteExecutor           │
//! │  Passive ───────── PreviewSurface / JSON / SQL          │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ExecutionReport                        │
//! │  status + message + ordered diagnostics + metadata      │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod detector;
pub mod dispatcher;
pub mod language;
pub mod preview;
pub mod report;
pub mod runtime;
pub mod sql;
pub mod strategy;
pub mod validator;

pub use dispatcher::{ExecutionEngine, InputProvider};
pub use language::{LanguageId, UnknownLanguage};
pub use preview::{InMemorySurface, PreviewSnapshot, PreviewSurface};
pub use report::{Diagnostic, ExecutionReport, OutputSink, Severity, Status, Stream};
pub use runtime::{RuntimeBootstrapper, RuntimeState};
pub use strategy::{
    ExecutionRequest, RemoteExecutor, RemoteSubmission, ScriptHost, ScriptOutcome, Strategy,
};
pub use validator::{HeuristicIssue, IssueKind};
