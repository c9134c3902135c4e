//! Execution strategies.
//!
//! Every language maps to exactly one [`Strategy`]. All strategies share one
//! contract: take an [`ExecutionRequest`], return an [`ExecutionReport`].
//! Nothing fails past this boundary; every error becomes a report.

mod compiled;
mod direct;
mod embedded;
mod passive;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dispatcher::InputProvider;
use crate::language::LanguageId;
use crate::preview::PreviewSurface;
use crate::report::{ExecutionReport, Stream};
use crate::runtime::RuntimeBootstrapper;
use workbench_common::EngineError;

/// One execution request. Built per call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub source: String,
    pub language: LanguageId,
    #[serde(default)]
    pub stdin: Option<String>,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>, language: LanguageId) -> Self {
        Self {
            source: source.into(),
            language,
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

/// Language family execution behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Evaluated in the in-process script host.
    Direct,
    /// Run inside the embedded WebAssembly interpreter.
    Embedded,
    /// Checked locally, then compiled and run by the remote service.
    HeuristicRemote,
    /// Rendered, applied or analyzed; never executed.
    Passive,
}

impl Strategy {
    pub const fn for_language(language: LanguageId) -> Self {
        match language {
            LanguageId::JavaScript => Strategy::Direct,
            LanguageId::Python => Strategy::Embedded,
            LanguageId::Java | LanguageId::Cpp => Strategy::HeuristicRemote,
            LanguageId::Html | LanguageId::Css | LanguageId::Json | LanguageId::Sql => {
                Strategy::Passive
            }
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Embedded => "embedded",
            Strategy::HeuristicRemote => "heuristic-remote",
            Strategy::Passive => "passive",
        }
    }

    /// Run `request` and tag the report with the strategy name.
    pub async fn execute(
        self,
        collaborators: &Collaborators<'_>,
        request: &ExecutionRequest,
    ) -> ExecutionReport {
        let report = match self {
            Strategy::Direct => {
                direct::execute(collaborators.script, collaborators.input, request).await
            }
            Strategy::Embedded => {
                embedded::execute(collaborators.runtime, collaborators.remote, request).await
            }
            Strategy::HeuristicRemote => compiled::execute(collaborators.remote, request).await,
            Strategy::Passive => passive::execute(collaborators.surface, request),
        };
        report.with_metadata("strategy", self.as_str())
    }
}

/// Everything a strategy may call out to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub script: &'a dyn ScriptHost,
    pub runtime: &'a RuntimeBootstrapper,
    pub remote: Option<&'a dyn RemoteExecutor>,
    pub surface: &'a dyn PreviewSurface,
    /// Answers reads that outrun the supplied stdin.
    pub input: Option<&'a dyn InputProvider>,
}

/// What one script evaluation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    /// Console lines captured during the call, in order.
    pub logs: Vec<(Stream, String)>,
    /// Message of the uncaught exception, if the script threw.
    pub error: Option<String>,
    /// Rendered return value, absent for `undefined`.
    pub value: Option<String>,
}

/// In-process evaluator for the host scripting language.
///
/// Implementations must restore any console or input redirection before
/// returning, whether or not the script threw.
///
/// With `stdin`, each input read returns the next supplied line. Once the
/// lines run out, a read blocks on `prompt` and takes the first line of its
/// answer. Without a prompt, or when it is declined, the read yields an
/// empty string.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    async fn evaluate(
        &self,
        source: &str,
        stdin: Option<&str>,
        prompt: Option<&dyn InputProvider>,
    ) -> Result<ScriptOutcome, EngineError>;
}

/// Source handed to the remote compile-and-run service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSubmission<'a> {
    pub source: &'a str,
    pub language: LanguageId,
    pub stdin: Option<&'a str>,
}

/// Remote compile-and-run service.
///
/// Transport and service failures are folded into the returned report; the
/// wording distinguishes "cannot reach" from "rejected".
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn run(&self, submission: RemoteSubmission<'_>) -> ExecutionReport;

    /// Whether the service has a mapping for `language`.
    fn supports(&self, language: LanguageId) -> bool;
}
